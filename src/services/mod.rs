pub mod auth_service;
pub mod family_service;
pub mod image_service;
pub mod news_service;
