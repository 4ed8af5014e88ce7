//! Error types and result handling for pg-publication-controller.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! Errors fall in two groups. [`Error::Validation`], [`Error::NotFound`] and
//! [`Error::Conflict`] describe a problem with the request itself and are
//! reported back to the caller as-is. Everything else is fatal to the
//! request: the HTTP layer logs the cause and answers with a 500-class
//! response, but the process keeps serving.
//!
//! # Example
//!
//! ```rust
//! use pg_publication_controller::{Error, Result};
//!
//! fn lookup() -> Result<()> {
//!     Err(Error::NotFound("publication sales_pub".to_string()))
//! }
//!
//! match lookup() {
//!     Ok(()) => println!("found"),
//!     Err(Error::NotFound(what)) => eprintln!("{} does not exist", what),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// The main error type for pg-publication-controller operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, typically from invalid flags or environment variables.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request is malformed or incomplete.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The publication or its database does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The database rejected a statement because the object already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Error reported by the PostgreSQL server, carrying its SQLSTATE.
    #[error("Database error [{code}]: {message}")]
    Database {
        /// Five-character SQLSTATE code
        code: String,
        /// Primary message reported by the server
        message: String,
    },

    /// Client-side PostgreSQL error without a server SQLSTATE
    /// (I/O failure, closed connection, type mismatch).
    #[error("PostgreSQL error: {0}")]
    Postgres(#[source] tokio_postgres::Error),

    /// TLS connector could not be built.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// I/O error, typically from binding the HTTP listener.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic connection error not covered by specific types.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation timeout.
    #[error("Timeout error: {message}")]
    Timeout {
        /// Description of what timed out
        message: String,
    },

    /// A row or response did not have the expected shape.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns the SQLSTATE code for errors reported by the server.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Error::Database { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// `true` when the server reported that the target database does not exist.
    pub fn is_missing_database(&self) -> bool {
        self.sql_state() == Some(SqlState::INVALID_CATALOG_NAME.code())
    }

    /// `true` when the server rejected a statement with "duplicate object".
    pub fn is_duplicate_object(&self) -> bool {
        self.sql_state() == Some(SqlState::DUPLICATE_OBJECT.code())
    }

    /// `true` for errors caused by the request rather than the cluster.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::NotFound(_) | Error::Conflict(_)
        )
    }
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => Error::Database {
                code: db.code().code().to_string(),
                message: db.message().to_string(),
            },
            None => Error::Postgres(err),
        }
    }
}

/// A convenient Result type alias for pg-publication-controller operations.
pub type Result<T> = std::result::Result<T, Error>;
