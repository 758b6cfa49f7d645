/// Configuration management for the kudos admin service
use crate::error::{KudosError, KudosResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub media_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the identity provider that mints bearer tokens
    pub jwt_secret: String,
    /// User ids promoted to SITE admin at startup (comma-separated)
    pub site_admin_ids: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when RUST_LOG is unset
    pub level: String,
}

pub const DEFAULT_LOG_LEVEL: &str = "kudos_admin=info,tower_http=info";

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> KudosResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("KUDOS_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("KUDOS_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| KudosError::Validation("Invalid port number".to_string()))?;
        let version = env::var("KUDOS_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("KUDOS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("KUDOS_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("kudos.sqlite"));
        let media_directory = env::var("KUDOS_MEDIA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("media"));

        let jwt_secret = env::var("KUDOS_JWT_SECRET")
            .map_err(|_| KudosError::Validation("JWT secret required".to_string()))?;

        let site_admin_ids = parse_list(&env::var("KUDOS_SITE_ADMIN_IDS").unwrap_or_default());

        let log_level = env::var("KUDOS_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                media_directory,
            },
            authentication: AuthConfig {
                jwt_secret,
                site_admin_ids,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> KudosResult<()> {
        if self.service.hostname.is_empty() {
            return Err(KudosError::Validation("Hostname cannot be empty".to_string()));
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(KudosError::Validation(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(KudosError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
