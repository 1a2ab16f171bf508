use actix_web::{web, HttpResponse};
use crate::{
    config::NewsConfig,
    database::MongoDB,
    middleware::auth::Claims,
    models::Article,
    services::{
        auth_service::{self, LoginRequest, LoginResponse, SignupRequest},
        news_service::{self, SearchProvider},
    },
    utils::AppError,
};
use serde::Serialize;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/signup",
    tag = "News",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User registered", body = MessageResponse),
        (status = 400, description = "Invalid request or user already exists")
    )
)]
pub async fn signup(
    db: web::Data<MongoDB>,
    config: web::Data<NewsConfig>,
    request: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /signup - email: {}, categories: {}", request.email, request.categories.len());

    match auth_service::signup(&db, &config, &request).await {
        Ok(user_id) => {
            log::info!("✅ Registration successful: {} ({})", request.email, user_id);
            Ok(HttpResponse::Ok().json(MessageResponse {
                success: true,
                message: "User registered successfully".to_string(),
            }))
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "News",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<NewsConfig>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /login - email: {}", request.email);

    match auth_service::login(&db, &config, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/articles",
    tag = "News",
    responses(
        (status = 200, description = "Articles for every category of the user", body = [Article]),
        (status = 401, description = "Missing or invalid token, or unknown user")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_articles(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    config: web::Data<NewsConfig>,
    search: web::Data<dyn SearchProvider>,
) -> Result<HttpResponse, AppError> {
    log::info!("📰 GET /articles - user: {}", user.sub);

    let account = auth_service::find_user(&db, &user.sub).await?;

    let articles = news_service::aggregate_articles(
        search.get_ref(),
        &account.categories,
        config.articles_per_category,
    )
    .await;

    log::info!(
        "✅ {} articles across {} categories for {}",
        articles.len(),
        account.categories.len(),
        account.email
    );

    Ok(HttpResponse::Ok().json(articles))
}
