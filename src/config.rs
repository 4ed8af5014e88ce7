use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database used for grants and health probes.
    pub database: String,
    pub ssl: SslMode,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    #[default]
    Off,
    /// Encrypted transport without certificate verification.
    On,
}

/// Only `on` enables TLS; any other value means plaintext.
impl FromStr for SslMode {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s == "on" { SslMode::On } else { SslMode::Off })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub api_user: String,
    pub api_password: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            database: default_database(),
            ssl: SslMode::Off,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_user: "logical-repl-user".to_string(),
            api_password: "logical-repl-password".to_string(),
        }
    }
}

impl Config {
    /// Loads a TOML/YAML/JSON file, then applies `PUBCTL__SECTION__KEY`
    /// environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PUBCTL")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.postgres.host.is_empty() {
            return Err(Error::Config("postgres host must not be empty".to_string()));
        }
        if self.postgres.port == 0 {
            return Err(Error::Config("postgres port must not be zero".to_string()));
        }
        if self.postgres.username.is_empty() {
            return Err(Error::Config(
                "postgres username must not be empty".to_string(),
            ));
        }
        if self.postgres.database.is_empty() {
            return Err(Error::Config(
                "postgres database must not be empty".to_string(),
            ));
        }
        if self.postgres.connect_timeout_secs == 0 {
            return Err(Error::Config(
                "connect timeout must be at least one second".to_string(),
            ));
        }
        if self.server.api_user.is_empty() {
            return Err(Error::Config("api user must not be empty".to_string()));
        }
        Ok(())
    }
}

impl PostgresConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_connect_timeout() -> u64 {
    20
}
