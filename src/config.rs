//! Server configuration, read from the environment.

use std::fmt;
use std::net::SocketAddr;

use crate::error::ConfigError;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    /// Process-local store; contents are lost on restart.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone)]
pub struct Config {
    pub http_addr: SocketAddr,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub jwt_secret: String,
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("http_addr", &self.http_addr)
            .field("store", &self.store)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("run_migrations", &self.run_migrations)
            .field("jwt_secret", &"[REDACTED]")
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store: StoreKind::Postgres,
            database_url: None,
            db_max_connections: default_max_connections(),
            run_migrations: true,
            jwt_secret: String::new(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Loads configuration from `CONTACTS_*` variables and `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(name).and_then(|v| {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let mut config = Self::default();

        if let Some(addr) = get("CONTACTS_HTTP_ADDR") {
            config.http_addr = addr.parse().map_err(|e| ConfigError::Invalid {
                name: "CONTACTS_HTTP_ADDR",
                message: format!("{e}"),
            })?;
        }
        if let Some(store) = get("CONTACTS_STORE") {
            config.store = match store.to_ascii_lowercase().as_str() {
                "postgres" => StoreKind::Postgres,
                "memory" => StoreKind::Memory,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "CONTACTS_STORE",
                        message: format!("expected postgres or memory, got {other}"),
                    })
                }
            };
        }
        config.database_url = get("DATABASE_URL");
        if config.store == StoreKind::Postgres && config.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if let Some(max) = get("CONTACTS_DB_MAX_CONNECTIONS") {
            config.db_max_connections = max.parse().map_err(|e| ConfigError::Invalid {
                name: "CONTACTS_DB_MAX_CONNECTIONS",
                message: format!("must be a u32: {e}"),
            })?;
        }
        if let Some(run) = get("CONTACTS_RUN_MIGRATIONS") {
            config.run_migrations = parse_bool("CONTACTS_RUN_MIGRATIONS", &run)?;
        }
        config.jwt_secret =
            get("CONTACTS_JWT_SECRET").ok_or(ConfigError::Missing("CONTACTS_JWT_SECRET"))?;
        if let Some(format) = get("CONTACTS_LOG_FORMAT") {
            config.log_format = match format.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "CONTACTS_LOG_FORMAT",
                        message: format!("expected pretty or json, got {other}"),
                    })
                }
            };
        }

        Ok(config)
    }
}

fn default_max_connections() -> u32 {
    u32::try_from(num_cpus::get() * 2).unwrap_or(u32::MAX)
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            message: "must be a boolean (true/false/1/0)".to_string(),
        }),
    }
}
