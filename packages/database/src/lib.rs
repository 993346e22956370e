#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` result store for saved site analyses.
//!
//! Stores analyses in `data/results.db` (override with `RESULTS_DB_PATH`)
//! so they survive server restarts and can be browsed from the CLI. Uses
//! `switchy_database` for all database operations.
//!
//! Whole-number metrics are stored as `INTEGER` columns (64-bit in
//! `SQLite`), so revenue and population figures round-trip exactly.

pub mod queries;

use std::path::{Path, PathBuf};

use site_profit_database_models::RecordError;
use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;
use thiserror::Error;

pub use queries::{
    count_results, delete_result, get_result, list_results, save_result, update_result,
};

/// Default path for the results database.
pub const DEFAULT_DB_PATH: &str = "data/results.db";

/// Environment variable overriding [`DEFAULT_DB_PATH`].
pub const DB_PATH_ENV: &str = "RESULTS_DB_PATH";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from result store operations.
#[derive(Debug, Error)]
pub enum ResultStoreError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed (e.g., creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be converted into a record.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// A record or request failed validation.
    #[error(transparent)]
    Record(#[from] RecordError),
}

// ---------------------------------------------------------------------------
// Database lifecycle
// ---------------------------------------------------------------------------

/// Returns the database path from `RESULTS_DB_PATH`, or
/// [`DEFAULT_DB_PATH`].
#[must_use]
pub fn db_path_from_env() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Opens (or creates) the results `SQLite` database and ensures the
/// schema exists.
///
/// # Errors
///
/// Returns [`ResultStoreError`] if the database cannot be opened or
/// schema creation fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, ResultStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db =
        init_sqlite_rusqlite(Some(path)).map_err(|e| ResultStoreError::Database(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    log::debug!("Opened results database at {}", path.display());

    Ok(db)
}

/// Creates the results table and index if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), ResultStoreError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS analysis_results (
            id                           TEXT PRIMARY KEY,
            timestamp                    INTEGER NOT NULL,
            lat                          REAL NOT NULL,
            lng                          REAL NOT NULL,
            population_density_per_sq_km REAL NOT NULL,
            address                      TEXT,
            area_square_km               REAL NOT NULL,
            residential                  REAL NOT NULL,
            road                         REAL NOT NULL,
            open_space                   REAL NOT NULL,
            cglp                         INTEGER NOT NULL,
            pops                         INTEGER NOT NULL,
            road_area_sqm                INTEGER NOT NULL,
            pdr                          REAL NOT NULL,
            apc                          REAL NOT NULL,
            apt                          INTEGER NOT NULL,
            vcdt                         INTEGER NOT NULL,
            tppd                         INTEGER NOT NULL,
            daily_revenue                INTEGER NOT NULL,
            monthly_revenue              INTEGER NOT NULL,
            yearly_revenue               INTEGER NOT NULL,
            building_width               REAL NOT NULL,
            operating_hours              REAL NOT NULL,
            product_price                REAL NOT NULL,
            currency                     TEXT NOT NULL,
            title                        TEXT,
            notes                        TEXT
        )",
    )
    .await
    .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_analysis_results_timestamp
         ON analysis_results (timestamp DESC, id DESC)",
    )
    .await
    .map_err(|e| ResultStoreError::Database(e.to_string()))?;

    Ok(())
}
