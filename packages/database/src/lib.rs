#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Durable ward narrative cache and pollutant snapshot store.
//!
//! Backed by a local `SQLite` file so cached narratives survive server
//! restarts and are shared between the per-request path and the bulk
//! refresh job. Uses `switchy_database` for all database operations,
//! following the same patterns as the rest of the workspace.

pub mod store;

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;
use thiserror::Error;

pub use store::{DbNarrativeStore, NarrativeStore};

/// Default path for the narrative cache database.
pub const DEFAULT_DB_PATH: &str = "data/narratives.db";

/// Errors from durable store operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opens (or creates) the narrative cache `SQLite` database and ensures
/// the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or schema
/// creation fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Database(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Creates all tables if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS ward_narratives (
            ward_id      TEXT PRIMARY KEY,
            analysis     TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS ward_pollutants (
            ward_id     TEXT PRIMARY KEY,
            reading     TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_ward_narratives_updated
         ON ward_narratives (last_updated)",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(())
}
