pub mod client;
pub mod connection;
pub mod health;
pub mod ident;

pub use client::ClusterClient;
pub use connection::{PgSession, Session, TextRow};
pub use health::{HealthReport, HealthStatus};

use crate::Result;
use async_trait::async_trait;

/// Opens short-lived sessions against databases of one cluster.
///
/// Every call yields a fresh connection; nothing is pooled. The session is
/// released when the returned box is dropped.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Connects to `database`, or to [`default_database`](Self::default_database)
    /// when `database` is empty.
    async fn connect(&self, database: &str) -> Result<Box<dyn Session>>;

    fn default_database(&self) -> &str;
}
