use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Token validity in hours
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Delay between sequential broadcast sends, in milliseconds
    #[serde(default = "default_broadcast_delay_ms")]
    pub broadcast_delay_ms: u64,
    /// Country calling code used when normalizing local numbers
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// Message preview length stored in the message log
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://netbill.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_expiry_hours() -> i64 {
    24
}

fn default_broadcast_delay_ms() -> u64 {
    3000
}

fn default_country_code() -> String {
    "62".to_string()
}

fn default_preview_length() -> usize {
    120
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://netbill.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("jwt.expiry_hours", 24)?
            .set_default("messaging.broadcast_delay_ms", 3000)?
            .set_default("messaging.country_code", "62")?
            .set_default("messaging.preview_length", 120)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, JWT_SECRET, DATABASE_URL, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            broadcast_delay_ms: default_broadcast_delay_ms(),
            country_code: default_country_code(),
            preview_length: default_preview_length(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);

        let messaging = MessagingConfig::default();
        assert_eq!(messaging.broadcast_delay_ms, 3000);
        assert_eq!(messaging.country_code, "62");
    }
}
