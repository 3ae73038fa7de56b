//! Process configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured via `dotenvy` but never
//! overrides variables already set in the environment.

use std::net::SocketAddr;

use thiserror::Error;

use inventaris_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// `None` disables replication.
    pub firebase: Option<FirebaseConfig>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", format!("'{bind_raw}': {e}")))?;

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        "DATABASE_MAX_CONNECTIONS",
                        "must be at least 1",
                    ));
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::invalid(
                        "DATABASE_MAX_CONNECTIONS",
                        format!("'{raw}': {e}"),
                    ));
                }
            },
        };
        let database = get("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections,
        });

        let sync_enabled = match get("FIREBASE_SYNC_ENABLED") {
            None => true,
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::invalid("FIREBASE_SYNC_ENABLED", format!("'{raw}'")))?,
        };
        let firebase = match get("FIREBASE_DATABASE_URL") {
            Some(url) if sync_enabled => {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ConfigError::invalid(
                        "FIREBASE_DATABASE_URL",
                        "must be an http(s) URL",
                    ));
                }
                Some(FirebaseConfig {
                    database_url: url.trim_end_matches('/').to_string(),
                    auth_token: get("FIREBASE_AUTH_TOKEN"),
                })
            }
            _ => None,
        };

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => raw
                .parse()
                .map_err(|e: inventaris_observability::ParseLogFormatError| {
                    ConfigError::invalid("LOG_FORMAT", e.to_string())
                })?,
        };

        Ok(Self {
            bind_addr,
            database,
            firebase,
            log_format,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_to_in_memory_without_replication() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(cfg.database.is_none());
        assert!(cfg.firebase.is_none());
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn reads_database_and_firebase() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://localhost/inv"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("FIREBASE_DATABASE_URL", "https://demo.firebaseio.com/"),
            ("FIREBASE_AUTH_TOKEN", "secret"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();

        let db = cfg.database.unwrap();
        assert_eq!(db.max_connections, 12);
        let fb = cfg.firebase.unwrap();
        assert_eq!(fb.database_url, "https://demo.firebaseio.com");
        assert_eq!(fb.auth_token.as_deref(), Some("secret"));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn sync_can_be_disabled_explicitly() {
        let cfg = load(&[
            ("FIREBASE_DATABASE_URL", "https://demo.firebaseio.com"),
            ("FIREBASE_SYNC_ENABLED", "false"),
        ])
        .unwrap();
        assert!(cfg.firebase.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("BIND_ADDR", "nope")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            load(&[("DATABASE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::Invalid { key: "DATABASE_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(
            load(&[("FIREBASE_SYNC_ENABLED", "maybe")]),
            Err(ConfigError::Invalid { key: "FIREBASE_SYNC_ENABLED", .. })
        ));
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { key: "LOG_FORMAT", .. })
        ));
    }
}
