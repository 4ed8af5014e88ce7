//! Bounded-time liveness probe for the cluster.
//!
//! A probe task opens a connection to the default database and runs a
//! trivial catalog query while the caller waits on a timer. Whichever
//! finishes first decides the outcome. When the timer wins, the probe is
//! cancelled through a [`CancellationToken`] and awaited, so its connection
//! is closed before [`check`] returns. A caller that drops the [`check`]
//! future cancels the probe too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::ConnectionProvider;
use crate::{Error, Result};

const HEALTH_QUERY: &str = "SELECT 1 FROM pg_catalog.pg_tables";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Up,
    OutOfService,
}

/// Result of one liveness check, as served on `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            checked_at: Utc::now(),
        }
    }
}

/// Races one probe against `timeout`.
///
/// Returns the probe's status when it finishes first and
/// [`Error::Timeout`] otherwise.
pub async fn check(provider: Arc<dyn ConnectionProvider>, timeout: Duration) -> Result<HealthStatus> {
    let token = CancellationToken::new();
    let probe_token = token.child_token();
    // Dropping this future cancels the probe as well.
    let _guard = token.clone().drop_guard();

    let mut probe = tokio::spawn(async move {
        tokio::select! {
            _ = probe_token.cancelled() => None,
            status = probe_once(provider.as_ref()) => Some(status),
        }
    });

    tokio::select! {
        joined = &mut probe => match joined {
            Ok(Some(status)) => Ok(status),
            Ok(None) => Err(Error::Timeout {
                message: "health probe was cancelled".to_string(),
            }),
            Err(e) => Err(Error::Unexpected(format!("health probe task failed: {}", e))),
        },
        _ = tokio::time::sleep(timeout) => {
            token.cancel();
            // Wait for the probe to drop its connection.
            let _ = probe.await;
            warn!("Postgres health check timed out after {:?}", timeout);
            Err(Error::Timeout {
                message: format!("postgres did not answer within {:?}", timeout),
            })
        }
    }
}

async fn probe_once(provider: &dyn ConnectionProvider) -> HealthStatus {
    let session = match provider.connect(provider.default_database()).await {
        Ok(session) => session,
        Err(e) => {
            error!("Postgres is unavailable: {}", e);
            return HealthStatus::OutOfService;
        }
    };

    match session.execute(HEALTH_QUERY).await {
        Ok(_) => {
            debug!("Postgres health probe succeeded");
            HealthStatus::Up
        }
        Err(e) => {
            error!("Postgres is unavailable: {}", e);
            HealthStatus::OutOfService
        }
    }
}
