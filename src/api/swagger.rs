use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "News Aggregation API",
        version = "1.0.0",
        description = "Sign up with a list of categories, log in for a JWT, and fetch the latest search results for each category.\n\n**Authentication:** `/articles` requires a Bearer token from `/login`."
    ),
    paths(
        crate::api::news::signup,
        crate::api::news::login,
        crate::api::news::get_articles,
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::services::auth_service::SignupRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::LoginResponse,
            crate::api::news::MessageResponse,
            crate::models::Article,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "News", description = "Accounts and article feed"),
        (name = "Health", description = "Service status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct NewsApiDoc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Family Directory API",
        version = "1.0.0",
        description = "Family directory with embedded members and a hosted family photo.\n\n**Authentication:** write endpoints and `/login` take the admin `email` and `password` in the request body."
    ),
    paths(
        crate::api::family::submit_details,
        crate::api::family::get_family_details,
        crate::api::family::get_family_detail,
        crate::api::family::search_family_details,
        crate::api::family::admin_login,
        crate::api::family::update_family_member,
        crate::api::family::delete_family,
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::services::auth_service::AdminCredentials,
            crate::services::family_service::NewFamily,
            crate::services::family_service::UpdatePayload,
            crate::models::HeadDetails,
            crate::models::MemberDetails,
            crate::models::UpdateTicket,
            crate::models::FamilyResponse,
            crate::models::FamilyMemberResponse,
            crate::api::family::SubmitDetailsRequest,
            crate::api::family::SubmitDetailsResponse,
            crate::api::family::UpdateFamilyRequest,
            crate::api::family::DeleteFamilyRequest,
            crate::api::family::FamilyListResponse,
            crate::api::family::FamilyDetailResponse,
            crate::api::family::FamilyMessageResponse,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Family", description = "Family directory"),
        (name = "Health", description = "Service status"),
    )
)]
pub struct FamilyApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /login"))
                        .build(),
                ),
            );
        }
    }
}
