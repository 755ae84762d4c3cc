//! HTTP listener, deployment environment and logging.

use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound for `request_timeout_secs`; provider callbacks must answer fast.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Listener and environment settings. Every field has a default, so the
/// whole `server` section may be omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,

    pub request_timeout_secs: u64,

    /// Public origin of the marketplace; redirect URLs hang off it
    pub public_base_url: String,
}

/// Where the service is deployed.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Log aggregation expects JSON lines outside development.
    pub fn wants_json_logs(&self) -> bool {
        !matches!(self, Environment::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.socket_addr().map_err(|_| ValidationError::InvalidHost)?;

        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }

        url::Url::parse(&self.public_base_url)
            .map_err(|_| ValidationError::InvalidUrl("server.public_base_url"))?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::default(),
            log_level: "info,course_payments=debug,sqlx=warn,tower_http=debug".to_string(),
            request_timeout_secs: 30,
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}
