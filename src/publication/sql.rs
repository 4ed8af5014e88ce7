//! DDL statement builders for publications.
//!
//! Pure functions: no I/O, no state. Every identifier passes through
//! [`ident::quote`](crate::postgres::ident::quote) and is rejected when it
//! contains a statement terminator.

use crate::postgres::ident;
use crate::{Error, Result};

pub const PUBLICATION_QUERY: &str = "SELECT pubname::text, pubowner::regrole::text \
     FROM pg_catalog.pg_publication WHERE pubname = $1";

pub const PUBLICATION_TABLES_QUERY: &str = "SELECT schemaname::text, tablename::text, \
     attnames::text, coalesce(rowfilter, '') \
     FROM pg_catalog.pg_publication_tables WHERE pubname = $1";

const SCHEMAS_APPEND: &str = "TABLES IN SCHEMA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Create,
    Add,
    Set,
}

impl Verb {
    fn prefix(self, publication: &str) -> String {
        let name = ident::quote(publication);
        match self {
            Verb::Create => format!("CREATE PUBLICATION {} FOR", name),
            Verb::Add => format!("ALTER PUBLICATION {} ADD", name),
            Verb::Set => format!("ALTER PUBLICATION {} SET", name),
        }
    }
}

/// `CREATE PUBLICATION`; an empty request publishes all tables.
pub fn build_create(publication: &str, tables: &[String], schemas: &[String]) -> Result<String> {
    ident::check("publication", publication)?;
    if tables.is_empty() && schemas.is_empty() {
        return Ok(format!(
            "CREATE PUBLICATION {} FOR ALL TABLES;",
            ident::quote(publication)
        ));
    }
    build_membership(Verb::Create, publication, tables, schemas)
}

/// `ALTER PUBLICATION … ADD`; at least one table or schema is required.
pub fn build_alter_add(publication: &str, tables: &[String], schemas: &[String]) -> Result<String> {
    ident::check("publication", publication)?;
    build_membership(Verb::Add, publication, tables, schemas)
}

/// `ALTER PUBLICATION … SET`; replaces the current membership.
pub fn build_alter_set(publication: &str, tables: &[String], schemas: &[String]) -> Result<String> {
    ident::check("publication", publication)?;
    build_membership(Verb::Set, publication, tables, schemas)
}

pub fn build_drop(publication: &str) -> Result<String> {
    ident::check("publication", publication)?;
    Ok(format!("DROP PUBLICATION {};", ident::quote(publication)))
}

fn build_membership(
    verb: Verb,
    publication: &str,
    tables: &[String],
    schemas: &[String],
) -> Result<String> {
    let prefix = verb.prefix(publication);
    match (tables.is_empty(), schemas.is_empty()) {
        (false, true) => Ok(format!("{} TABLE {}", prefix, quote_tables(tables)?)),
        (true, false) => Ok(format!(
            "{} {} {}",
            prefix,
            SCHEMAS_APPEND,
            quote_schemas(schemas)?
        )),
        (false, false) => Ok(format!(
            "{} TABLE {}, {} {};",
            prefix,
            quote_tables(tables)?,
            SCHEMAS_APPEND,
            quote_schemas(schemas)?
        )),
        (true, true) => Err(Error::Validation(format!(
            "no tables or schemas given for publication {}",
            publication
        ))),
    }
}

fn quote_tables(tables: &[String]) -> Result<String> {
    let quoted = tables
        .iter()
        .map(|table| {
            ident::check("table", table)?;
            Ok(quote_table(table))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(","))
}

fn quote_schemas(schemas: &[String]) -> Result<String> {
    let quoted = schemas
        .iter()
        .map(|schema| {
            ident::check("schema", schema)?;
            Ok(ident::quote(schema))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(","))
}

/// Quotes `schema.table(columns)` piecewise.
///
/// The schema separator is the first `.` ahead of any column list; the
/// column list is kept verbatim.
fn quote_table(token: &str) -> String {
    let name_end = token.find('(').unwrap_or(token.len());
    match token[..name_end].find('.') {
        Some(dot) => format!(
            "{}.{}",
            ident::quote(&token[..dot]),
            quote_with_columns(&token[dot + 1..])
        ),
        None => quote_with_columns(token),
    }
}

fn quote_with_columns(table: &str) -> String {
    match table.split_once('(') {
        Some((name, columns)) => format!("{}({}", ident::quote(name), columns),
        None => ident::quote(table),
    }
}
