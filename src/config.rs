use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::env;
use thiserror::Error;
use validator::Validate;

const ENV_PREFIX: &str = "STOREFRONT";
const DEFAULT_PORT: u16 = 8083;

/// Runtime configuration.
///
/// Read from the process environment (after loading `.env`), with every key
/// prefixed by `STOREFRONT_`, e.g. `STOREFRONT_PORT=9000`. The bare
/// `DATABASE_URL` and `PORT` variables are honored as fallbacks.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(length(min = 1, message = "database_url is required"))]
    pub database_url: String,
    #[validate(range(min = 1, max = 200))]
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    #[validate(range(min = 1, max = 8760))]
    pub session_ttl_hours: i64,
    /// Adds `Secure` to the session cookie; enable behind TLS.
    pub cookie_secure: bool,
    /// Comma-separated list; unset means permissive CORS
    pub cors_allowed_origins: Option<String>,
    pub nats_url: Option<String>,
    pub stripe_secret_key: Option<String>,
    /// Image uploads are enabled when all three Cloudinary values are set
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    #[validate(email)]
    pub bootstrap_admin_email: Option<String>,
    #[validate(length(min = 8))]
    pub bootstrap_admin_password: Option<String>,
    /// Artificial latency of the simulated wallet gateways
    #[validate(range(max = 60000))]
    pub payment_delay_ms: u64,
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl AppConfig {
    pub fn load() -> Result<Self, AppConfigError> {
        dotenvy::dotenv().ok();
        let config = Config::builder()
            .set_default("database_url", env::var("DATABASE_URL").unwrap_or_default())?
            .set_default("db_max_connections", 10)?
            .set_default("host", "0.0.0.0")?
            .set_default("port", env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT))?
            .set_default("log_level", "info")?
            .set_default("log_json", false)?
            .set_default("session_ttl_hours", 24 * 7)?
            .set_default("cookie_secure", false)?
            .set_default("payment_delay_ms", 1500)?
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__").try_parsing(true))
            .build()?;
        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default()
    }

    /// Configuration for tests and tools that never open a real connection.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/storefront_test".into(),
            db_max_connections: 2,
            host: "127.0.0.1".into(),
            port: 0,
            log_level: "debug".into(),
            log_json: false,
            session_ttl_hours: 1,
            cookie_secure: false,
            cors_allowed_origins: None,
            nats_url: None,
            stripe_secret_key: None,
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
            payment_delay_ms: 1500,
        }
    }
}
