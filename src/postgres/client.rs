use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::sync::Arc;
use tokio_postgres::config::SslMode as PgSslMode;
use tokio_postgres::{Config, NoTls};
use tracing::{debug, error, info};

use super::connection::{PgSession, Session};
use super::health::{self, HealthStatus};
use super::ConnectionProvider;
use crate::config::{PostgresConfig, SslMode};
use crate::{Error, Result};

/// Connection factory for one PostgreSQL cluster.
///
/// Holds the cluster credentials and nothing else; each connect opens a
/// brand-new connection.
#[derive(Clone)]
pub struct ClusterClient {
    config: PostgresConfig,
    tls: Option<MakeTlsConnector>,
}

impl ClusterClient {
    pub fn new(config: PostgresConfig) -> Result<Self> {
        let tls = match config.ssl {
            SslMode::On => {
                // Matches libpq `sslmode=require`: encrypted, not verified.
                let connector = TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()?;
                Some(MakeTlsConnector::new(connector))
            }
            SslMode::Off => None,
        };
        Ok(Self { config, tls })
    }

    /// Builds the client and verifies the cluster answers within the
    /// connect timeout.
    pub async fn connect_checked(config: PostgresConfig) -> Result<Arc<Self>> {
        debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Checking connection"
        );
        let client = Arc::new(Self::new(config)?);
        let timeout = client.config.connect_timeout();
        match health::check(client.clone(), timeout).await? {
            HealthStatus::Up => {
                info!("PG client has been initialized");
                Ok(client)
            }
            HealthStatus::OutOfService => Err(Error::Connection(format!(
                "postgres at {}:{} is unavailable",
                client.config.host, client.config.port
            ))),
        }
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Opens a connection to `database` as an arbitrary role.
    pub async fn connect_as(
        &self,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<PgSession> {
        let database = if database.is_empty() {
            self.config.database.as_str()
        } else {
            database
        };
        let pg_config = self.pg_config(database, username, password);

        let client = match &self.tls {
            Some(tls) => {
                let (client, connection) = pg_config.connect(tls.clone()).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("Connection error: {}", e);
                    }
                });
                client
            }
            None => {
                let (client, connection) = pg_config.connect(NoTls).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("Connection error: {}", e);
                    }
                });
                client
            }
        };

        debug!(database = %database, username = %username, "Connected to PostgreSQL");
        Ok(PgSession::new(client, database.to_string()))
    }

    fn pg_config(&self, database: &str, username: &str, password: &str) -> Config {
        let mut pg_config = Config::new();
        pg_config
            .host(&self.config.host)
            .port(self.config.port)
            .user(username)
            .dbname(database)
            .application_name(env!("CARGO_PKG_NAME"))
            .connect_timeout(self.config.connect_timeout());
        if !password.is_empty() {
            pg_config.password(password);
        }
        pg_config.ssl_mode(match self.config.ssl {
            SslMode::On => PgSslMode::Require,
            SslMode::Off => PgSslMode::Disable,
        });
        pg_config
    }
}

#[async_trait]
impl ConnectionProvider for ClusterClient {
    async fn connect(&self, database: &str) -> Result<Box<dyn Session>> {
        let session = self
            .connect_as(database, &self.config.username, &self.config.password)
            .await
            .inspect_err(|e| error!(database = %database, "Error occurred during connect to DB: {}", e))?;
        Ok(Box::new(session))
    }

    fn default_database(&self) -> &str {
        &self.config.database
    }
}
