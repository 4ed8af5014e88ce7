use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::postgres::ident;
use crate::{Error, Result};

/// A publication as stored in `pg_publication`.
///
/// Identified by `(database, name)`. `tables` is only filled when the
/// caller asked for membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub name: String,
    pub owner: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<BTreeMap<String, Vec<Table>>>,
}

/// One published table, keyed by schema in [`Publication::tables`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(rename = "attrNames")]
    pub attr_names: Vec<String>,
    #[serde(rename = "rowfilter", default, skip_serializing_if = "String::is_empty")]
    pub row_filter: String,
}

/// Desired state sent by clients for create, alter and drop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRequest {
    #[serde(default)]
    pub publication_name: String,
    #[serde(default)]
    pub database: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
}

impl PublicationRequest {
    pub fn new(publication_name: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            publication_name: publication_name.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    /// `true` when neither tables nor schemas were requested.
    pub fn is_membership_empty(&self) -> bool {
        self.tables.is_empty() && self.schemas.is_empty()
    }

    /// Checks identity and refuses identifiers carrying a statement
    /// terminator, before anything touches the cluster.
    pub fn validate(&self) -> Result<()> {
        validate_target(&self.publication_name, &self.database)?;
        ident::check("publication", &self.publication_name)?;
        for table in &self.tables {
            ident::check("table", table)?;
        }
        for schema in &self.schemas {
            ident::check("schema", schema)?;
        }
        Ok(())
    }
}

/// Both parts of a publication's identity must be present.
pub fn validate_target(publication: &str, database: &str) -> Result<()> {
    if database.is_empty() {
        return Err(Error::Validation("database must not be empty".to_string()));
    }
    if publication.is_empty() {
        return Err(Error::Validation(
            "publication name must not be empty".to_string(),
        ));
    }
    Ok(())
}
