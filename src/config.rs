use crate::utils::AppError;
use std::env;

fn required(name: &str) -> Result<String, AppError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Configuration(format!("{} must be set", name))),
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env(default_port: u16) -> Result<Self, AppError> {
        Ok(Self {
            host: optional("HOST", "0.0.0.0"),
            port: parsed("PORT", default_port)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for the news aggregation service.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub serper_api_key: String,
    pub serper_api_url: String,
    pub articles_per_category: u32,
}

/// Tokens live at most a year.
const MAX_JWT_TTL_HOURS: i64 = 24 * 365;
/// Range bcrypt accepts.
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;
/// Serper returns at most 100 organic results per query.
const MAX_ARTICLES_PER_CATEGORY: u32 = 100;

impl NewsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self {
            server: ServerConfig::from_env(5000)?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_hours: parsed("JWT_TTL_HOURS", 1)?,
            bcrypt_cost: parsed("BCRYPT_COST", 10)?,
            serper_api_key: required("SERPER_API_KEY")?,
            serper_api_url: optional("SERPER_API_URL", "https://google.serper.dev/search"),
            articles_per_category: parsed("ARTICLES_PER_CATEGORY", 5)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=MAX_JWT_TTL_HOURS).contains(&self.jwt_ttl_hours) {
            return Err(AppError::Configuration(format!(
                "JWT_TTL_HOURS must be between 1 and {}, got {}",
                MAX_JWT_TTL_HOURS, self.jwt_ttl_hours
            )));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(AppError::Configuration(format!(
                "BCRYPT_COST must be between {} and {}, got {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST,
                self.bcrypt_cost
            )));
        }
        if !(1..=MAX_ARTICLES_PER_CATEGORY).contains(&self.articles_per_category) {
            return Err(AppError::Configuration(format!(
                "ARTICLES_PER_CATEGORY must be between 1 and {}, got {}",
                MAX_ARTICLES_PER_CATEGORY, self.articles_per_category
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: Option<String>,
}

/// Settings for the family directory service.
#[derive(Debug, Clone)]
pub struct FamilyConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub cloudinary: CloudinaryConfig,
}

impl FamilyConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            server: ServerConfig::from_env(5001)?,
            database_url: required("DATABASE_URL")?,
            admin_email: required("ADMIN_EMAIL")?,
            admin_password: required("ADMIN_PASSWORD")?,
            cloudinary: CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
                folder: env::var("CLOUDINARY_FOLDER").ok().filter(|f| !f.is_empty()),
            },
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let server = ServerConfig { host: "0.0.0.0".into(), port: 5000 };
        assert_eq!(server.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        let err = required("NEWS_FAMILY_API_SURELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("NEWS_FAMILY_API_SURELY_UNSET"));
    }

    #[test]
    fn test_numeric_settings_are_range_checked() {
        assert!(fixtures::news_config().validate().is_ok());

        let mut config = fixtures::news_config();
        config.jwt_ttl_hours = 0;
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
        config.jwt_ttl_hours = -1;
        assert!(config.validate().is_err());
        config.jwt_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = fixtures::news_config();
        config.bcrypt_cost = 3;
        assert!(config.validate().is_err());
        config.bcrypt_cost = 32;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BCRYPT_COST"));

        let mut config = fixtures::news_config();
        config.articles_per_category = 0;
        assert!(config.validate().is_err());
    }
}
