use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use news_family_api::{
    api::{self, swagger::FamilyApiDoc},
    config::FamilyConfig,
    database::MongoDB,
    middleware::SecurityHeaders,
    services::image_service::{CloudinaryClient, ImageHost},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = FamilyConfig::from_env().map_err(startup_error)?;

    log::info!("🚀 Starting Family Directory Service...");

    let db = MongoDB::new(&config.database_url, "family")
        .await
        .map_err(startup_error)?;
    log::info!("✅ MongoDB connected successfully");

    let images: Arc<dyn ImageHost> =
        Arc::new(CloudinaryClient::new(config.cloudinary.clone()).map_err(startup_error)?);
    log::info!("🖼️  Image host: Cloudinary ({})", config.cloudinary.cloud_name);

    let bind_address = config.server.bind_address();
    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);

    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);
    let images_data = web::Data::from(images);

    HttpServer::new(move || {
        let cors = Cors::permissive().max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(images_data.clone())
            .wrap(cors)
            .wrap(SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", FamilyApiDoc::openapi()),
            )
            .configure(api::configure_family)
    })
    .bind(bind_address)?
    .run()
    .await
}
