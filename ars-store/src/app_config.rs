use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Default hold length for blocked reservations.
    #[serde(default = "default_hold_minutes")]
    pub hold_minutes: i64,
    /// How often the worker looks for expired holds.
    #[serde(default = "default_hold_sweep_seconds")]
    pub hold_sweep_seconds: u64,
    #[serde(default = "default_first_class_multiplier")]
    pub first_class_multiplier: f64,
    /// Requests per client IP per minute; 0 disables the limiter.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_hold_minutes() -> i64 { 15 }
fn default_hold_sweep_seconds() -> u64 { 60 }
fn default_first_class_multiplier() -> f64 { 3.0 }
fn default_rate_limit() -> i64 { 120 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_minutes: default_hold_minutes(),
            hold_sweep_seconds: default_hold_sweep_seconds(),
            first_class_multiplier: default_first_class_multiplier(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Public base URL, used for gateway callback links.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Empty selects the in-memory store.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `ARS__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("ARS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
