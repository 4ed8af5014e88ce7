use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tracing::trace;

use crate::{Error, Result};

/// A single database connection owned by one logical operation.
#[async_trait]
pub trait Session: Send + Sync {
    /// Runs a statement that returns no rows; yields the affected row count.
    async fn execute(&self, statement: &str) -> Result<u64>;

    /// Runs a query with text parameters. Every selected column must be
    /// castable to `text`.
    async fn query(&self, statement: &str, params: &[&str]) -> Result<Vec<TextRow>>;
}

/// A result row with every column rendered as optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRow {
    columns: Vec<Option<String>>,
}

impl TextRow {
    pub fn new(columns: Vec<Option<String>>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns a non-null column, failing on a missing index or NULL.
    pub fn get(&self, idx: usize) -> Result<&str> {
        self.get_opt(idx)?.ok_or_else(|| {
            Error::Unexpected(format!("column {} is unexpectedly NULL", idx))
        })
    }

    /// Returns a nullable column, failing only on a missing index.
    pub fn get_opt(&self, idx: usize) -> Result<Option<&str>> {
        self.columns
            .get(idx)
            .map(|column| column.as_deref())
            .ok_or_else(|| {
                Error::Unexpected(format!(
                    "row has {} columns, column {} requested",
                    self.columns.len(),
                    idx
                ))
            })
    }
}

impl<S: Into<String>> From<Vec<Option<S>>> for TextRow {
    fn from(columns: Vec<Option<S>>) -> Self {
        Self::new(columns.into_iter().map(|c| c.map(Into::into)).collect())
    }
}

/// A `tokio-postgres` connection.
///
/// The driver task is spawned on connect and ends by itself once the client
/// is dropped, so dropping the session closes the connection on every exit
/// path.
pub struct PgSession {
    client: Client,
    database: String,
}

impl PgSession {
    pub(crate) fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl Session for PgSession {
    async fn execute(&self, statement: &str) -> Result<u64> {
        trace!(database = %self.database, "execute");
        // Simple protocol: DDL takes no parameters.
        let messages = self.client.simple_query(statement).await?;
        Ok(messages
            .iter()
            .filter_map(|message| match message {
                tokio_postgres::SimpleQueryMessage::CommandComplete(rows) => Some(*rows),
                _ => None,
            })
            .sum())
    }

    async fn query(&self, statement: &str, params: &[&str]) -> Result<Vec<TextRow>> {
        trace!(database = %self.database, "query");
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self.client.query(statement, &params).await?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|idx| row.try_get::<_, Option<String>>(idx))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(TextRow::new)
                    .map_err(Error::from)
            })
            .collect()
    }
}
