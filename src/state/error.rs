//! Error types for the sync state store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during state database operations.
#[derive(Error, Debug)]
pub enum StateError {
    /// Failed to open or create the database file.
    #[error("Failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A statement failed.
    #[error("Database query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An insert or update violated a table constraint (e.g. duplicate RemoteId).
    #[error("SQL constraint violated by row {row}: {source}")]
    Constraint {
        row: String,
        source: rusqlite::Error,
    },

    /// The database schema version is newer than supported.
    #[error("Database schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: f64, expected: f64 },

    /// Failed to move an out-of-date database aside.
    #[error("Failed to archive old database {path}: {source}")]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A field name is not part of the table's declared columns.
    #[error("{table} does not have column {column}")]
    NoSuchColumn { table: &'static str, column: String },

    /// A value does not match the declared column type.
    #[error("{table}.{column} expects a {expected} value")]
    ColumnType {
        table: &'static str,
        column: &'static str,
        expected: &'static str,
    },
}

impl StateError {
    /// Whether this error came from a violated table constraint.
    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint { .. })
    }
}
