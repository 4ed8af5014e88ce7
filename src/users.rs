use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::context::RequestContext;
use crate::postgres::{ident, ConnectionProvider};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    #[serde(default)]
    pub username: String,
}

impl GrantRequest {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Grants the replication attribute to database roles.
pub struct UserGrantService {
    provider: Arc<dyn ConnectionProvider>,
}

impl UserGrantService {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    /// Runs the grant on the default database. Granting twice is harmless,
    /// so there is no pre-check.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, username = %request.username))]
    pub async fn grant_replication(&self, ctx: &RequestContext, request: &GrantRequest) -> Result<()> {
        let statement = build_grant_replication(&request.username).inspect_err(|e| error!("{}", e))?;

        let session = self.provider.connect(self.provider.default_database()).await?;
        debug!(%statement, "Executing statement");
        session.execute(&statement).await.inspect_err(|e| {
            error!("cannot grant user {} for Replication: {}", request.username, e)
        })?;

        info!("User {} has been granted for Replication", request.username);
        Ok(())
    }
}

pub fn build_grant_replication(username: &str) -> Result<String> {
    if username.is_empty() {
        return Err(Error::Validation("username must not be empty".to_string()));
    }
    ident::check("username", username)?;
    Ok(format!("ALTER ROLE {} WITH REPLICATION;", ident::quote(username)))
}
