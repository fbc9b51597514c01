//! Runtime configuration, read once at startup from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set{reason}")]
    Missing { key: &'static str, reason: &'static str },

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `Some` when `USE_PERSISTENT_STORES=true`.
    pub database_url: Option<String>,
    pub receipts_dir: PathBuf,
    pub loan_period_days: i64,
    pub seed_demo_data: bool,
    pub primary_admin_email: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            database_url: None,
            receipts_dir: PathBuf::from("receipts"),
            loan_period_days: 15,
            seed_demo_data: true,
            primary_admin_email: "admin@biblioteca.local".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: addr.clone(),
                reason: e.to_string(),
            })?;
        }

        match get("JWT_SECRET") {
            Some(secret) => config.jwt_secret = secret,
            None => warn!("JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(flag) = get("USE_PERSISTENT_STORES") {
            if parse_bool("USE_PERSISTENT_STORES", &flag)? {
                config.database_url = Some(get("DATABASE_URL").ok_or(ConfigError::Missing {
                    key: "DATABASE_URL",
                    reason: " when USE_PERSISTENT_STORES=true",
                })?);
            }
        }

        if let Some(dir) = get("RECEIPTS_DIR") {
            config.receipts_dir = PathBuf::from(dir);
        }

        if let Some(days) = get("LOAN_PERIOD_DAYS") {
            config.loan_period_days = match days.parse::<i64>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        key: "LOAN_PERIOD_DAYS",
                        value: days,
                        reason: "must be positive".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: "LOAN_PERIOD_DAYS",
                        value: days,
                        reason: e.to_string(),
                    });
                }
            };
        }

        if let Some(flag) = get("SEED_DEMO_DATA") {
            config.seed_demo_data = parse_bool("SEED_DEMO_DATA", &flag)?;
        }

        if let Some(email) = get("PRIMARY_ADMIN_EMAIL") {
            config.primary_admin_email = email;
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
