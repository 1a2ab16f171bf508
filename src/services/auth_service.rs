use crate::{
    config::{FamilyConfig, NewsConfig},
    database::{MongoDB, USERS},
    models::User,
    utils::{is_duplicate_key, AppError},
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (hex ObjectId)
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
}

/// Plaintext admin credentials carried in the body of family-service calls.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Configuration(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    verify(password, hashed)
        .map_err(|e| AppError::Database(format!("Stored password hash is unreadable: {}", e)))
}

// Generate JWT token
pub fn generate_jwt(
    user_id: &str,
    email: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::Configuration(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Token rejected: {}", e);
        AppError::Unauthorized("Invalid token".to_string())
    })
}

// User registration
pub async fn signup(
    db: &MongoDB,
    config: &NewsConfig,
    request: &SignupRequest,
) -> Result<ObjectId, AppError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }

    let collection = db.collection::<User>(USERS);

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let categories: Vec<String> = request
        .categories
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let user = User {
        id: None,
        email,
        password: hash_password(&request.password, config.bcrypt_cost)?,
        categories,
        created_at: Utc::now().timestamp(),
    };

    // Two racing signups both pass the lookup above; the unique index decides
    let result = collection.insert_one(&user).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::BadRequest("User already exists".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Database("Inserted user has no ObjectId".to_string()))
}

// User login
pub async fn login(
    db: &MongoDB,
    config: &NewsConfig,
    request: &LoginRequest,
) -> Result<LoginResponse, AppError> {
    let email = request.email.trim().to_lowercase();
    let collection = db.collection::<User>(USERS);

    let user = collection
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !verify_password(&request.password, &user.password)? {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = user
        .id
        .ok_or_else(|| AppError::Database("Stored user has no ObjectId".to_string()))?;

    let ttl = Duration::hours(config.jwt_ttl_hours);
    let token = generate_jwt(&user_id.to_hex(), &user.email, &config.jwt_secret, ttl)?;

    Ok(LoginResponse {
        success: true,
        token,
        expires_in: ttl.num_seconds(),
    })
}

/// Loads the user a verified token points at.
pub async fn find_user(db: &MongoDB, user_id: &str) -> Result<User, AppError> {
    let object_id = ObjectId::parse_str(user_id)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    db.collection::<User>(USERS)
        .find_one(doc! { "_id": object_id })
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))
}

/// Direct comparison against the configured admin account.
pub fn ensure_admin(config: &FamilyConfig, credentials: &AdminCredentials) -> Result<(), AppError> {
    if credentials.email.trim() == config.admin_email && credentials.password == config.admin_password {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid admin credentials".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures;

    #[test]
    fn test_hash_is_not_plaintext_and_verifies() {
        let hashed = hash_password("correct horse", 4).unwrap();
        assert_ne!(hashed, "correct horse");
        assert!(hashed.starts_with("$2"));
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("wrong horse", &hashed).unwrap());
    }

    #[test]
    fn test_jwt_round_trip() {
        let token = generate_jwt("650000000000000000000001", "a@b.c", "s3cret", Duration::hours(1)).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "650000000000000000000001");
        assert_eq!(claims.email, "a@b.c");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let token = generate_jwt("u1", "a@b.c", "s3cret", Duration::hours(1)).unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_jwt_rejects_expired_token() {
        // Past the default 60s leeway
        let token = generate_jwt("u1", "a@b.c", "s3cret", Duration::hours(-2)).unwrap();
        assert!(verify_token(&token, "s3cret").is_err());
    }

    #[test]
    fn test_jwt_rejects_garbage() {
        assert!(verify_token("not.a.jwt", "s3cret").is_err());
    }

    #[test]
    fn test_ensure_admin() {
        let config = fixtures::family_config();
        let good = AdminCredentials { email: "admin@example.com".into(), password: "hunter2".into() };
        assert!(ensure_admin(&config, &good).is_ok());

        let wrong_password = AdminCredentials { email: "admin@example.com".into(), password: "hunter3".into() };
        assert!(matches!(ensure_admin(&config, &wrong_password), Err(AppError::Unauthorized(_))));

        let wrong_email = AdminCredentials { email: "root@example.com".into(), password: "hunter2".into() };
        assert!(ensure_admin(&config, &wrong_email).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_signup_then_login() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db = MongoDB::new(&uri, "news_family_test").await.unwrap();
        let config = fixtures::news_config();
        let email = format!("{}@example.com", Uuid::new_v4());

        let id = signup(&db, &config, &SignupRequest {
            email: email.clone(),
            password: "pw123456".into(),
            categories: vec!["rust".into(), " ".into()],
        })
        .await
        .unwrap();

        let stored = find_user(&db, &id.to_hex()).await.unwrap();
        assert_ne!(stored.password, "pw123456");
        assert_eq!(stored.categories, vec!["rust".to_string()]);

        let duplicate = signup(&db, &config, &SignupRequest {
            email: email.clone(),
            password: "pw123456".into(),
            categories: vec![],
        })
        .await;
        assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

        let bad = login(&db, &config, &LoginRequest { email: email.clone(), password: "nope".into() }).await;
        assert!(matches!(bad, Err(AppError::Unauthorized(_))));

        let ok = login(&db, &config, &LoginRequest { email, password: "pw123456".into() }).await.unwrap();
        let claims = verify_token(&ok.token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, id.to_hex());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_unique_email_index_is_reported_as_duplicate() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db = MongoDB::new(&uri, "news_family_test").await.unwrap();
        let users = db.collection::<User>(USERS);

        // Skips the lookup in `signup`, the way a losing concurrent signup does
        let user = User {
            id: None,
            email: format!("{}@example.com", Uuid::new_v4()),
            password: hash_password("pw123456", 4).unwrap(),
            categories: vec![],
            created_at: Utc::now().timestamp(),
        };
        users.insert_one(&user).await.unwrap();
        let err = users.insert_one(&user).await.unwrap_err();
        assert!(is_duplicate_key(&err));

        let other = users
            .find_one(doc! { "$where": "not valid js (" })
            .await
            .unwrap_err();
        assert!(!is_duplicate_key(&other));
    }
}
