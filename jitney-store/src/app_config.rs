use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Attempts per capacity compare-and-swap before reporting Busy.
    #[serde(default = "default_cas_retry_limit")]
    pub cas_retry_limit: u32,
}

fn default_cas_retry_limit() -> u32 {
    8
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            cas_retry_limit: default_cas_retry_limit(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. `JITNEY__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("JITNEY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
