//! Storage layer - SQLite
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use ticketsmith_core::storage::Database;
//!
//! // Create an in-memory database for testing
//! let db = Database::in_memory().await?;
//! ```

pub mod database;
pub mod migrations;

pub use database::{Database, DatabaseConfig};
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};

/// Encode a string list for a JSON text column
pub(crate) fn encode_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON text column; unreadable values become an empty list
pub(crate) fn decode_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Read a text column holding an enum value
///
/// Values the parser does not recognize fail with a column decode error.
pub(crate) fn decode_enum<T>(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> crate::Result<T> {
    use sqlx::Row;

    let raw: String = row.try_get(column)?;
    parse(&raw).ok_or_else(|| {
        crate::Error::DatabaseError(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: format!("unexpected value '{}'", raw).into(),
        })
    })
}
