use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::sql::{PUBLICATION_QUERY, PUBLICATION_TABLES_QUERY};
use super::types::{Publication, Table};
use crate::context::RequestContext;
use crate::postgres::{ConnectionProvider, TextRow};
use crate::{Error, Result};

/// Reads publications from the system catalogs.
pub struct PublicationRepository {
    provider: Arc<dyn ConnectionProvider>,
}

impl PublicationRepository {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    /// Looks up `name` in `database`.
    ///
    /// A missing publication and a missing database both yield
    /// [`Error::NotFound`].
    pub async fn lookup(
        &self,
        ctx: &RequestContext,
        database: &str,
        name: &str,
        with_tables: bool,
    ) -> Result<Publication> {
        info!(request_id = %ctx.request_id, "Get publication {} for database {}", name, database);

        let session = match self.provider.connect(database).await {
            Ok(session) => session,
            Err(e) if e.is_missing_database() => {
                return Err(Error::NotFound(format!("database {} does not exist", database)));
            }
            Err(e) => return Err(e),
        };

        let rows = session
            .query(PUBLICATION_QUERY, &[name])
            .await
            .inspect_err(|e| {
                error!(request_id = %ctx.request_id, "cannot get publication {} for database {}: {}", name, database, e)
            })?;
        let row = rows.first().ok_or_else(|| {
            Error::NotFound(format!("publication {} in database {}", name, database))
        })?;

        let mut publication = Publication {
            name: row.get(0)?.to_string(),
            owner: row.get(1)?.to_string(),
            database: database.to_string(),
            tables: None,
        };

        if with_tables {
            let rows = session
                .query(PUBLICATION_TABLES_QUERY, &[name])
                .await
                .inspect_err(|e| {
                    error!(request_id = %ctx.request_id, "cannot get publication {} tables info for database {}: {}", name, database, e)
                })?;
            publication.tables = Some(group_tables(&rows)?);
        }

        debug!(request_id = %ctx.request_id, "Publication {} has been read for database {}", name, database);
        Ok(publication)
    }
}

/// Groups `(schema, table, attnames, rowfilter)` rows by schema, keeping
/// row order within each schema.
pub(crate) fn group_tables(rows: &[TextRow]) -> Result<BTreeMap<String, Vec<Table>>> {
    let mut tables: BTreeMap<String, Vec<Table>> = BTreeMap::new();
    for row in rows {
        let schema = row.get(0)?;
        let table = Table {
            name: row.get(1)?.to_string(),
            attr_names: parse_attr_names(row.get_opt(2)?.unwrap_or_default()),
            row_filter: row.get_opt(3)?.unwrap_or_default().to_string(),
        };
        tables.entry(schema.to_string()).or_default().push(table);
    }
    Ok(tables)
}

/// Parses the text form of a name array, e.g. `{id,name}`.
pub(crate) fn parse_attr_names(raw: &str) -> Vec<String> {
    let inner = raw.trim_start_matches('{').trim_end_matches('}');
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(schema: &str, table: &str, attrs: Option<&str>, filter: &str) -> TextRow {
        TextRow::from(vec![
            Some(schema.to_string()),
            Some(table.to_string()),
            attrs.map(str::to_string),
            Some(filter.to_string()),
        ])
    }

    #[test]
    fn test_parse_attr_names() {
        assert_eq!(parse_attr_names("{id,name}"), vec!["id", "name"]);
        assert_eq!(parse_attr_names("{id}"), vec!["id"]);
        assert!(parse_attr_names("{}").is_empty());
        assert!(parse_attr_names("").is_empty());
    }

    #[test]
    fn test_group_tables_by_schema() {
        let rows = vec![
            row("public", "orders", Some("{id,total}"), "(total > 0)"),
            row("sales", "leads", Some("{id}"), ""),
            row("public", "items", None, ""),
        ];

        let grouped = group_tables(&rows).unwrap();
        assert_eq!(grouped.len(), 2);

        let public = &grouped["public"];
        assert_eq!(public.len(), 2);
        assert_eq!(public[0].name, "orders");
        assert_eq!(public[0].attr_names, vec!["id", "total"]);
        assert_eq!(public[0].row_filter, "(total > 0)");
        assert_eq!(public[1].name, "items");
        assert!(public[1].attr_names.is_empty());

        assert_eq!(grouped["sales"][0].name, "leads");
    }

    #[test]
    fn test_group_tables_rejects_short_rows() {
        let rows = vec![TextRow::from(vec![Some("public")])];
        assert!(matches!(group_tables(&rows), Err(Error::Unexpected(_))));
    }
}
