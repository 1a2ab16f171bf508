use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use news_family_api::{
    api::{self, swagger::NewsApiDoc},
    config::NewsConfig,
    database::MongoDB,
    middleware::SecurityHeaders,
    services::news_service::{SearchProvider, SerperClient},
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

    let config = NewsConfig::from_env().map_err(startup_error)?;

    log::info!("🚀 Starting News Service...");

    let db = MongoDB::new(&config.database_url, "news")
        .await
        .map_err(startup_error)?;
    log::info!("✅ MongoDB connected successfully");

    let search: Arc<dyn SearchProvider> = Arc::new(
        SerperClient::new(&config.serper_api_url, &config.serper_api_key).map_err(startup_error)?,
    );

    let bind_address = config.server.bind_address();
    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);

    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);
    let search_data = web::Data::from(search);

    HttpServer::new(move || {
        let cors = Cors::permissive().max_age(3600);

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(search_data.clone())
            .wrap(cors)
            .wrap(SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", NewsApiDoc::openapi()),
            )
            .configure(api::configure_news)
    })
    .bind(bind_address)?
    .run()
    .await
}
