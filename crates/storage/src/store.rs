// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State store connection management

use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::error::ArrowError;
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Database file created inside the checkpoint location
pub const DATABASE_FILE: &str = "state.db";

pub(crate) const WAL_TABLE: &str = "write_ahead_log";
pub(crate) const COMMIT_TABLE: &str = "wal_commits";
pub(crate) const SCHEMA_TABLE: &str = "state_schema";

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur in state store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("state not found: {0}")]
    NotFound(String),
    #[error("invalid state name: {0:?}")]
    InvalidStateName(String),
    #[error("unsupported type {data_type} for state column {column}")]
    UnsupportedColumnType { column: String, data_type: DataType },
    #[error("unknown declared type {declared:?} for state column {column}")]
    UnknownDeclaredType { column: String, declared: String },
}

/// Durable keyed storage for one streaming job.
///
/// All calls come from the job's single execution context; the mutex only
/// makes the store shareable across the await points of that context.
pub struct StateStore {
    pub(crate) conn: Mutex<Connection>,
    location: PathBuf,
}

impl StateStore {
    /// Open or create the store under `location`.
    ///
    /// Idempotent: reopening an existing location keeps its WAL, commits and
    /// snapshots, which is how a job resumes after a crash.
    pub fn open(location: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(location)?;

        let conn = Connection::open(location.join(DATABASE_FILE))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {WAL_TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {COMMIT_TABLE} (
                sequence INTEGER PRIMARY KEY AUTOINCREMENT,
                wal_id INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {SCHEMA_TABLE} (
                state TEXT NOT NULL,
                position INTEGER NOT NULL,
                data_type TEXT NOT NULL,
                PRIMARY KEY (state, position)
            );"
        ))?;

        info!(location = %location.display(), "opened state store");

        Ok(Self {
            conn: Mutex::new(conn),
            location: location.to_path_buf(),
        })
    }

    /// Directory the store lives in
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Run `op` against the connection, retrying transient busy/locked
    /// failures a bounded number of times.
    pub(crate) fn with_conn<T>(
        &self,
        mut op: impl FnMut(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut attempt = 1;
        loop {
            match op(&mut conn) {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < RETRY_ATTEMPTS => {
                    warn!(attempt, error = %e, "transient state store failure, retrying");
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn is_transient(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Quote an identifier for use in SQL text
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
