use std::env;
use std::net::SocketAddr;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://storefront.db?mode=rwc";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_JWT_EXPIRATION_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_AUTH_ISSUER: &str = "storefront-api";
const DEFAULT_AUTH_AUDIENCE: &str = "storefront-clients";
/// Flat delivery fee in minor currency units.
const DEFAULT_SHIPPING_FEE: i64 = 2000;
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Runtime environment name ("development", "production", ...)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Apply pending migrations at startup
    #[serde(default = "default_true")]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable lines
    #[serde(default)]
    pub log_json: bool,

    /// JWT signing secret (minimum 64 characters)
    #[validate(length(min = 64))]
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration_secs")]
    pub jwt_expiration_secs: u64,

    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Flat delivery fee charged on every order, in minor currency units.
    #[validate(range(min = 0))]
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: i64,

    /// Optional bootstrap admin account, created at startup when absent.
    #[serde(default)]
    pub admin_email: Option<String>,

    #[serde(default)]
    pub admin_password: Option<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_true() -> bool {
    true
}
fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_jwt_secret() -> String {
    DEV_DEFAULT_JWT_SECRET.to_string()
}
fn default_jwt_expiration_secs() -> u64 {
    DEFAULT_JWT_EXPIRATION_SECS
}
fn default_auth_issuer() -> String {
    DEFAULT_AUTH_ISSUER.to_string()
}
fn default_auth_audience() -> String {
    DEFAULT_AUTH_AUDIENCE.to_string()
}
fn default_shipping_fee() -> i64 {
    DEFAULT_SHIPPING_FEE
}

impl AppConfig {
    /// Socket address the HTTP server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Loads configuration from `config/default.toml`, an optional
/// `config/{RUN_ENV}.toml` overlay, and `APP_*` environment variables,
/// in increasing precedence.
pub fn load_config() -> Result<AppConfig, ConfigLoadError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let settings = Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP"))
        .build()?;

    let app_config: AppConfig = settings.try_deserialize()?;
    app_config.validate()?;

    if app_config.is_production() && app_config.jwt_secret == DEV_DEFAULT_JWT_SECRET {
        return Err(ConfigLoadError::Read(config::ConfigError::Message(
            "the development JWT secret must be overridden in production".to_string(),
        )));
    }

    info!(environment = %app_config.environment, "configuration loaded");
    Ok(app_config)
}

/// Installs the global tracing subscriber. Call once, before anything logs.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
