use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::repository::PublicationRepository;
use super::sql;
use super::types::{validate_target, Publication, PublicationRequest};
use crate::context::RequestContext;
use crate::postgres::ConnectionProvider;
use crate::{Error, Result};

/// What a mutating operation did to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A statement was executed.
    Applied,
    /// The publication was already in the requested state.
    Unchanged,
}

/// Applies desired-state requests to publications.
///
/// Every operation re-reads the catalog before acting; nothing is cached
/// between calls.
pub struct PublicationReconciler {
    provider: Arc<dyn ConnectionProvider>,
    repository: PublicationRepository,
}

impl PublicationReconciler {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            repository: PublicationRepository::new(provider.clone()),
            provider,
        }
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id))]
    pub async fn get(
        &self,
        ctx: &RequestContext,
        database: &str,
        publication: &str,
        with_tables: bool,
    ) -> Result<Publication> {
        validate_target(publication, database).inspect_err(|e| error!("{}", e))?;
        self.repository
            .lookup(ctx, database, publication, with_tables)
            .await
    }

    /// Creates the publication unless one with the same name exists.
    ///
    /// Membership of an existing publication is left untouched.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, publication = %request.publication_name, database = %request.database))]
    pub async fn create(&self, ctx: &RequestContext, request: &PublicationRequest) -> Result<Outcome> {
        request.validate().inspect_err(|e| error!("{}", e))?;
        let (publication, database) = (&request.publication_name, &request.database);

        info!("Publication {} creation started for database {}", publication, database);
        if self.exists(ctx, database, publication).await? {
            info!("Publication {} already exists in database {}", publication, database);
            return Ok(Outcome::Unchanged);
        }

        let statement = sql::build_create(publication, &request.tables, &request.schemas)?;
        self.execute(database, &statement).await.inspect_err(|e| {
            error!("cannot create publication {} for database {}: {}", publication, database, e)
        })?;

        info!("Publication {} has been created for database {}", publication, database);
        Ok(Outcome::Applied)
    }

    /// Adds tables and schemas to an existing publication.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, publication = %request.publication_name, database = %request.database))]
    pub async fn alter_add(&self, ctx: &RequestContext, request: &PublicationRequest) -> Result<Outcome> {
        self.alter(ctx, request, AlterMode::Add).await
    }

    /// Replaces the membership of an existing publication.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, publication = %request.publication_name, database = %request.database))]
    pub async fn alter_set(&self, ctx: &RequestContext, request: &PublicationRequest) -> Result<Outcome> {
        self.alter(ctx, request, AlterMode::Set).await
    }

    /// Drops the publication; a missing one counts as dropped.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, publication = %request.publication_name, database = %request.database))]
    pub async fn drop_publication(
        &self,
        ctx: &RequestContext,
        request: &PublicationRequest,
    ) -> Result<Outcome> {
        request.validate().inspect_err(|e| error!("{}", e))?;
        let (publication, database) = (&request.publication_name, &request.database);

        info!("Publication {} drop started for database {}", publication, database);
        if !self.exists(ctx, database, publication).await? {
            info!("Publication {} doesn't exist in database {}", publication, database);
            return Ok(Outcome::Unchanged);
        }

        let statement = sql::build_drop(publication)?;
        self.execute(database, &statement).await.inspect_err(|e| {
            error!("cannot drop publication {} for database {}: {}", publication, database, e)
        })?;

        info!("Publication {} has been dropped for database {}", publication, database);
        Ok(Outcome::Applied)
    }

    async fn alter(
        &self,
        ctx: &RequestContext,
        request: &PublicationRequest,
        mode: AlterMode,
    ) -> Result<Outcome> {
        request.validate().inspect_err(|e| error!("{}", e))?;
        let (publication, database) = (&request.publication_name, &request.database);

        if request.is_membership_empty() {
            let message = format!(
                "Nothing to {} publication {} in database {}",
                mode.verb(),
                publication,
                database
            );
            error!("{}", message);
            return Err(Error::Validation(message));
        }

        info!("Publication {} alter {} started for database {}", publication, mode.verb(), database);
        if !self.exists(ctx, database, publication).await? {
            info!("Publication {} doesn't exist in database {}", publication, database);
            return Err(Error::NotFound(format!(
                "publication {} in database {}",
                publication, database
            )));
        }

        let statement = match mode {
            AlterMode::Add => sql::build_alter_add(publication, &request.tables, &request.schemas)?,
            AlterMode::Set => sql::build_alter_set(publication, &request.tables, &request.schemas)?,
        };

        match self.execute(database, &statement).await {
            Ok(()) => {
                info!("Publication {} has been altered for database {}", publication, database);
                Ok(Outcome::Applied)
            }
            Err(e) if e.is_duplicate_object() => {
                error!("cannot alter {} publication {} for database {}: {}", mode.verb(), publication, database, e);
                Err(Error::Conflict(e.to_string()))
            }
            Err(e) => {
                error!("cannot alter {} publication {} for database {}: {}", mode.verb(), publication, database, e);
                Err(e)
            }
        }
    }

    async fn exists(&self, ctx: &RequestContext, database: &str, publication: &str) -> Result<bool> {
        match self.repository.lookup(ctx, database, publication, false).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn execute(&self, database: &str, statement: &str) -> Result<()> {
        debug!(%statement, "Executing statement");
        let session = match self.provider.connect(database).await {
            Ok(session) => session,
            Err(e) if e.is_missing_database() => {
                return Err(Error::NotFound(format!("database {} does not exist", database)));
            }
            Err(e) => return Err(e),
        };
        session.execute(statement).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum AlterMode {
    Add,
    Set,
}

impl AlterMode {
    fn verb(self) -> &'static str {
        match self {
            AlterMode::Add => "add",
            AlterMode::Set => "set",
        }
    }
}
