use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use dotenvy::dotenv;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebConfig {
    pub addr: String,
    pub port: u16,
    pub cors_origin: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: 3000,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_token_expires_minutes")]
    pub token_expires_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

fn default_max_connections() -> u32 {
    5
}

fn default_token_expires_minutes() -> i64 {
    60
}

/// Only the web section has defaults; `database.url` and `jwt.secret` must be provided.
#[derive(Serialize)]
struct Defaults {
    web: WebConfig,
}

impl AppConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Defaults {
            web: WebConfig::default(),
        }))
        .merge(Toml::file("Config.toml")) // For non-sensitive defaults
        .merge(Env::prefixed("APP_").split("__")) // e.g., APP_DATABASE__URL
        .merge(
            // Plain DATABASE_URL / JWT_SECRET, as most deployments set them.
            Env::raw()
                .only(&["DATABASE_URL", "JWT_SECRET"])
                .map(|key| key.as_str().to_ascii_lowercase().replacen('_', ".", 1).into()),
        )
    }

    pub fn load() -> Result<Self, figment::Error> {
        dotenv().ok();

        let config: Self = Self::figment().extract()?;

        tracing::info!(
            addr = %config.web.addr,
            port = config.web.port,
            "Configuration loaded successfully"
        );

        Ok(config)
    }
}
