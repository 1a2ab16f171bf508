pub mod family;
pub mod health;
pub mod news;
pub mod swagger;

use crate::{
    middleware,
    utils::{json_error_handler, query_error_handler},
};
use actix_web::web;

/// Routes of the news aggregation service. App data (`MongoDB`,
/// `NewsConfig`, `dyn SearchProvider`) is registered by the caller.
pub fn configure_news(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health::health_check))
        .route("/signup", web::post().to(news::signup))
        .route("/login", web::post().to(news::login))
        .service(
            web::resource("/articles")
                .wrap(middleware::AuthMiddleware)
                .route(web::get().to(news::get_articles)),
        );
}

/// Routes of the family directory service. App data (`MongoDB`,
/// `FamilyConfig`, `dyn ImageHost`) is registered by the caller.
pub fn configure_family(cfg: &mut web::ServiceConfig) {
    // Base64 data URIs for the family photo exceed the 2 MiB default
    let json_config = web::JsonConfig::default()
        .limit(16 * 1024 * 1024)
        .error_handler(json_error_handler);

    cfg.app_data(json_config)
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/health", web::get().to(health::health_check))
        .route("/submit-details", web::post().to(family::submit_details))
        .route("/get-family-details", web::get().to(family::get_family_details))
        .route("/get-family-details/{id}", web::get().to(family::get_family_detail))
        .route("/search-family-details", web::get().to(family::search_family_details))
        .route("/login", web::post().to(family::admin_login))
        .route("/update-family-member", web::put().to(family::update_family_member))
        .route("/update-family-member", web::post().to(family::update_family_member))
        .route("/api/family/delete", web::delete().to(family::delete_family));
}
