//! # Configuration for QueryMill
//!
//! Connection options for every supported dialect plus query logging settings.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{ConnectionOptions, Dialect, PoolOptions};
//!
//! let postgres = ConnectionOptions::new_network(
//!     Dialect::Postgres,
//!     "localhost".to_string(),
//!     None,
//!     "myapp".to_string(),
//!     "postgres".to_string(),
//!     "password".to_string(),
//! )
//! .with_pool(PoolOptions::new(1, 10, 30, 600, 3600));
//!
//! let sqlite = ConnectionOptions::new_sqlite(":memory:");
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! dialect = "mysql"
//! host = "localhost"
//! port = 3306
//! database = "myapp"
//! username = "root"
//! password = "password"
//!
//! [database.pool]
//! min_connections = 1
//! max_connections = 10
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [logging]
//! log_queries = true
//! log_parameters = false
//! ```
//!
//! SQLite swaps the network fields for a path:
//! ```toml
//! [database]
//! dialect = "sqlite"
//! path = "./data/app.db"
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from querymill.toml or the file named by QUERYMILL_CONFIG
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, fmt, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./querymill.toml";
const CONFIG_PATH_ENV: &str = "QUERYMILL_CONFIG";
const SQLITE_MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// SQL dialect spoken by a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Mysql,
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Default TCP port, `None` for file based dialects
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Dialect::Mysql => Some(3306),
            Dialect::Postgres => Some(5432),
            Dialect::Sqlite => None,
        }
    }

    pub fn is_file_based(&self) -> bool {
        matches!(self, Dialect::Sqlite)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: ConnectionOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolOptions {
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    /// Zero disables the lifetime cap
    pub max_lifetime_seconds: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new(1, 10, 30, 600, 3600)
    }
}

/// Database connection options
///
/// Network dialects use `host`, `port`, `username`, `password` and `database`.
/// SQLite only uses `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    pub dialect: Dialect,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub pool: PoolOptions,
}

/// Query logging switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_queries: bool,
    pub log_parameters: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_queries: true,
            log_parameters: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the file named by `QUERYMILL_CONFIG` (environment or
    /// `.env`), falling back to `./querymill.toml`
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine, the variable may come from the real environment
        dotenvy::dotenv().ok();

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH
            )))
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()
    }
}

impl PoolOptions {
    /// Create new pool options
    pub fn new(
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Pool max_connections must be greater than 0".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid(
                "Pool min_connections cannot be greater than max_connections".to_string(),
            ));
        }
        if self.connection_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Pool connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl ConnectionOptions {
    /// Options for a network dialect (MySQL, PostgreSQL)
    pub fn new_network(
        dialect: Dialect,
        host: String,
        port: Option<u16>,
        database: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            dialect,
            host,
            port,
            username,
            password,
            database,
            path: None,
            pool: PoolOptions::default(),
        }
    }

    /// Options for a SQLite database file, `:memory:` for a private in-memory database
    pub fn new_sqlite(path: impl Into<String>) -> Self {
        Self {
            dialect: Dialect::Sqlite,
            host: String::new(),
            port: None,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            path: Some(path.into()),
            pool: PoolOptions::default(),
        }
    }

    pub fn with_pool(mut self, pool: PoolOptions) -> Self {
        self.pool = pool;
        self
    }

    /// Port to connect to, falling back to the dialect default
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.dialect.default_port())
    }

    pub fn is_in_memory(&self) -> bool {
        self.dialect.is_file_based() && self.path.as_deref() == Some(SQLITE_MEMORY_PATH)
    }

    /// Human readable target, never includes the password
    pub fn display_string(&self) -> String {
        match self.dialect {
            Dialect::Sqlite => format!(
                "sqlite:{}",
                self.path.as_deref().unwrap_or(SQLITE_MEMORY_PATH)
            ),
            dialect => format!(
                "{}://{}@{}:{}/{}",
                dialect,
                self.username,
                self.host,
                self.effective_port().unwrap_or_default(),
                self.database
            ),
        }
    }

    /// Validate the mandatory fields for the dialect
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dialect.is_file_based() {
            match self.path.as_deref() {
                Some(path) if !path.is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "{} connections require a path",
                        self.dialect
                    )))
                }
            }
        } else {
            if self.host.is_empty() {
                return Err(ConfigError::Invalid(
                    "Database host cannot be empty".to_string(),
                ));
            }
            if self.port == Some(0) {
                return Err(ConfigError::Invalid(
                    "Database port cannot be zero".to_string(),
                ));
            }
            if self.database.is_empty() {
                return Err(ConfigError::Invalid(
                    "Database name cannot be empty".to_string(),
                ));
            }
            if self.username.is_empty() {
                return Err(ConfigError::Invalid(
                    "Database username cannot be empty".to_string(),
                ));
            }
        }

        self.pool.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network_config() {
        let config = AppConfig::from_toml_str(
            r#"
            [database]
            dialect = "postgres"
            host = "db.internal"
            database = "shop"
            username = "app"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.dialect, Dialect::Postgres);
        assert_eq!(config.database.effective_port(), Some(5432));
        assert_eq!(config.database.pool, PoolOptions::default());
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(
            config.database.display_string(),
            "postgres://app@db.internal:5432/shop"
        );
        assert!(!config.database.display_string().contains("secret"));
    }

    #[test]
    fn test_sqlite_display_string() {
        let memory = ConnectionOptions::new_sqlite(":memory:");
        assert!(memory.is_in_memory());
        assert_eq!(memory.display_string(), "sqlite::memory:");
        assert_eq!(
            ConnectionOptions::new_sqlite("data/app.db").display_string(),
            "sqlite:data/app.db"
        );
    }

    #[test]
    fn test_parse_sqlite_config() {
        let config = AppConfig::from_toml_str(
            r#"
            [database]
            dialect = "sqlite"
            path = ":memory:"

            [logging]
            log_queries = false
            log_parameters = true
            "#,
        )
        .unwrap();

        assert!(config.database.is_in_memory());
        assert_eq!(config.database.effective_port(), None);
        assert!(!config.logging.log_queries);
        assert!(config.logging.log_parameters);
    }

    #[test]
    fn test_network_dialect_requires_host() {
        let result = AppConfig::from_toml_str(
            r#"
            [database]
            dialect = "mysql"
            database = "shop"
            username = "root"
            "#,
        );

        match result {
            Err(ConfigError::Invalid(message)) => assert!(message.contains("host")),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }

    #[test]
    fn test_sqlite_requires_path() {
        let options = ConnectionOptions {
            path: None,
            ..ConnectionOptions::new_sqlite("unused.db")
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_pool_bounds_validated() {
        let options = ConnectionOptions::new_sqlite("app.db").with_pool(PoolOptions::new(
            5, 2, 30, 600, 3600,
        ));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_password_not_serialized() {
        let options = ConnectionOptions::new_network(
            Dialect::Mysql,
            "localhost".to_string(),
            Some(3307),
            "shop".to_string(),
            "root".to_string(),
            "hunter2".to_string(),
        );

        let rendered = toml::to_string(&options).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(options.display_string().ends_with("localhost:3307/shop"));
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [database]
            dialect = "oracle"
            path = "x"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
