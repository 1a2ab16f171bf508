use actix_web::{web, HttpResponse};
use crate::{
    config::FamilyConfig,
    database::MongoDB,
    models::FamilyResponse,
    services::{
        auth_service::{self, AdminCredentials},
        family_service::{self, NewFamily, UpdatePayload},
        image_service::{self, ImageHost},
    },
    utils::AppError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitDetailsRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    #[serde(flatten)]
    pub family: NewFamily,
    /// Remote image URL or `data:image/...` URI, uploaded after the response
    pub image: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmitDetailsResponse {
    pub success: bool,
    pub message: String,
    pub id: String,
    pub image_pending: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateFamilyRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    pub family_id: String,
    #[serde(flatten)]
    pub payload: UpdatePayload,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DeleteFamilyRequest {
    #[serde(flatten)]
    pub credentials: AdminCredentials,
    pub id: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Text matched against names and residences
    pub query: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FamilyListResponse {
    pub success: bool,
    pub families: Vec<FamilyResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FamilyDetailResponse {
    pub success: bool,
    pub family: FamilyResponse,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FamilyMessageResponse {
    pub success: bool,
    pub message: String,
}

fn validate_image_source(source: &str) -> Result<(), AppError> {
    let source = source.trim();
    if source.starts_with("https://") || source.starts_with("http://") || source.starts_with("data:image/") {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "image must be an http(s) URL or a data:image URI".to_string(),
        ))
    }
}

#[utoipa::path(
    post,
    path = "/submit-details",
    tag = "Family",
    request_body = SubmitDetailsRequest,
    responses(
        (status = 201, description = "Family stored; image upload continues in the background", body = SubmitDetailsResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Invalid admin credentials")
    )
)]
pub async fn submit_details(
    db: web::Data<MongoDB>,
    config: web::Data<FamilyConfig>,
    images: web::Data<dyn ImageHost>,
    request: web::Json<SubmitDetailsRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    log::info!("📝 POST /submit-details - family: {}", request.family.head.full_name);

    auth_service::ensure_admin(&config, &request.credentials)?;

    let image = request
        .image
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(source) = &image {
        validate_image_source(source)?;
    }

    let family_id = family_service::create_family(&db, request.family).await?;
    log::info!("✅ Family created: {}", family_id);

    let image_pending = image.is_some();
    if let Some(source) = image {
        // Response goes out now; the upload patches the record when done
        image_service::spawn_image_enrichment(
            db.get_ref().clone(),
            images.into_inner(),
            family_id,
            source,
        );
    }

    Ok(HttpResponse::Created().json(SubmitDetailsResponse {
        success: true,
        message: "Family details submitted successfully".to_string(),
        id: family_id.to_hex(),
        image_pending,
    }))
}

#[utoipa::path(
    get,
    path = "/get-family-details",
    tag = "Family",
    responses(
        (status = 200, description = "All families ordered by name", body = FamilyListResponse)
    )
)]
pub async fn get_family_details(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /get-family-details");

    let families = family_service::list_families(&db).await?;

    Ok(HttpResponse::Ok().json(FamilyListResponse {
        success: true,
        total: families.len(),
        families: families.into_iter().map(FamilyResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/get-family-details/{id}",
    tag = "Family",
    params(
        ("id" = String, Path, description = "Family ObjectId (hex)")
    ),
    responses(
        (status = 200, description = "Family found", body = FamilyDetailResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Family not found")
    )
)]
pub async fn get_family_detail(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let raw_id = path.into_inner();
    log::info!("🔍 GET /get-family-details/{}", raw_id);

    let family_id = family_service::parse_id(&raw_id, "family")?;
    let family = family_service::get_family(&db, family_id).await?;

    Ok(HttpResponse::Ok().json(FamilyDetailResponse {
        success: true,
        family: FamilyResponse::from(family),
    }))
}

#[utoipa::path(
    get,
    path = "/search-family-details",
    tag = "Family",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching families", body = FamilyListResponse),
        (status = 400, description = "Missing query")
    )
)]
pub async fn search_family_details(
    db: web::Data<MongoDB>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let text = query.query.as_deref().unwrap_or("");
    log::info!("🔎 GET /search-family-details - query: '{}'", text);

    let families = family_service::search_families(&db, text).await?;

    Ok(HttpResponse::Ok().json(FamilyListResponse {
        success: true,
        total: families.len(),
        families: families.into_iter().map(FamilyResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Family",
    request_body = AdminCredentials,
    responses(
        (status = 200, description = "Credentials accepted", body = FamilyMessageResponse),
        (status = 401, description = "Invalid admin credentials")
    )
)]
pub async fn admin_login(
    config: web::Data<FamilyConfig>,
    request: web::Json<AdminCredentials>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /login - email: {}", request.email);

    if let Err(e) = auth_service::ensure_admin(&config, &request) {
        log::warn!("❌ Admin login failed: {}", request.email);
        return Err(e);
    }

    Ok(HttpResponse::Ok().json(FamilyMessageResponse {
        success: true,
        message: "Login successful".to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/update-family-member",
    tag = "Family",
    request_body = UpdateFamilyRequest,
    responses(
        (status = 200, description = "Family updated", body = FamilyDetailResponse),
        (status = 400, description = "Invalid ticket payload or id"),
        (status = 401, description = "Invalid admin credentials"),
        (status = 404, description = "Family or member not found")
    )
)]
pub async fn update_family_member(
    db: web::Data<MongoDB>,
    config: web::Data<FamilyConfig>,
    request: web::Json<UpdateFamilyRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    log::info!(
        "✏️  PUT /update-family-member - family: {}, ticket: {:?}",
        request.family_id,
        request.payload.ticket
    );

    auth_service::ensure_admin(&config, &request.credentials)?;

    let family_id = family_service::parse_id(&request.family_id, "family")?;
    let update = request.payload.into_update()?;
    let family = family_service::apply_update(&db, family_id, update).await?;

    log::info!("✅ Family {} updated", family_id);

    Ok(HttpResponse::Ok().json(FamilyDetailResponse {
        success: true,
        family: FamilyResponse::from(family),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/family/delete",
    tag = "Family",
    request_body = DeleteFamilyRequest,
    responses(
        (status = 200, description = "Family deleted", body = FamilyMessageResponse),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Invalid admin credentials"),
        (status = 404, description = "Family not found")
    )
)]
pub async fn delete_family(
    db: web::Data<MongoDB>,
    config: web::Data<FamilyConfig>,
    images: web::Data<dyn ImageHost>,
    request: web::Json<DeleteFamilyRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️ DELETE /api/family/delete - id: {}", request.id);

    auth_service::ensure_admin(&config, &request.credentials)?;

    let family_id = family_service::parse_id(&request.id, "family")?;
    let deleted = family_service::delete_family(&db, family_id).await?;

    if let Some(image_url) = image_service::cleanup_target(&deleted) {
        image_service::spawn_image_cleanup(images.into_inner(), image_url);
    }

    log::info!("✅ Family {} deleted", family_id);

    Ok(HttpResponse::Ok().json(FamilyMessageResponse {
        success: true,
        message: "Family deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_source_validation() {
        assert!(validate_image_source("https://cdn.example/a.jpg").is_ok());
        assert!(validate_image_source("data:image/png;base64,AAAA").is_ok());
        assert!(validate_image_source("ftp://x/y.png").is_err());
        assert!(validate_image_source("C:\\photos\\a.jpg").is_err());
    }

    #[test]
    fn test_submit_request_flattens_credentials_and_family() {
        let request: SubmitDetailsRequest = serde_json::from_value(serde_json::json!({
            "email": "admin@example.com",
            "password": "hunter2",
            "full_name": "Sharma Family",
            "current_residence": "Pune",
            "members": [{ "name": "Asha", "age": 40 }],
            "image": "https://cdn.example/a.jpg"
        }))
        .unwrap();

        assert_eq!(request.credentials.email, "admin@example.com");
        assert_eq!(request.family.head.full_name, "Sharma Family");
        assert_eq!(request.family.members[0].age, Some(40));
        assert!(request.image.is_some());
    }

    #[test]
    fn test_update_request_flattens_payload() {
        let request: UpdateFamilyRequest = serde_json::from_value(serde_json::json!({
            "email": "admin@example.com",
            "password": "hunter2",
            "family_id": "650000000000000000000001",
            "ticket": "new-member",
            "member": { "name": "Neha" }
        }))
        .unwrap();

        assert!(request.payload.into_update().is_ok());
    }
}
