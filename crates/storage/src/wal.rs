// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of ingested input units and their commit records

use crate::store::{StateStore, StoreError, COMMIT_TABLE, WAL_TABLE};
use brook_core::WalId;
use rusqlite::params;
use tracing::debug;

/// One ingested input unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    pub id: WalId,
    pub key: String,
}

/// Acknowledgement that a WAL entry's micro-batch reached the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRecord {
    pub sequence: i64,
    pub wal_id: WalId,
}

impl StateStore {
    /// Durably record an input unit and return its id.
    ///
    /// Ids are never reused and start at 1 for a fresh store.
    pub fn wal_append(&self, key: &str) -> Result<WalId, StoreError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO {WAL_TABLE} (key) VALUES (?1)"),
                params![key],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(wal_id = id, key, "appended WAL entry");
        Ok(WalId(id))
    }

    /// Append a commit record for `wal_id`.
    ///
    /// Not deduplicated: committing twice stores two records.
    pub fn wal_commit(&self, wal_id: WalId) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO {COMMIT_TABLE} (wal_id) VALUES (?1)"),
                params![wal_id.0],
            )
        })?;
        debug!(wal_id = wal_id.0, "committed WAL entry");
        Ok(())
    }

    /// Highest committed WAL id, or 0 when nothing has been committed
    pub fn wal_watermark(&self) -> Result<WalId, StoreError> {
        let id = self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT COALESCE(MAX(wal_id), 0) FROM {COMMIT_TABLE}"),
                [],
                |row| row.get::<_, i64>(0),
            )
        })?;
        Ok(WalId(id))
    }

    /// Keys appended after the watermark, in id order.
    ///
    /// Entries below the watermark that were never committed are not
    /// returned; see [`StateStore::wal_pending_entries`] for those.
    pub fn wal_uncommitted_entries(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT key FROM {WAL_TABLE}
                 WHERE id > (SELECT COALESCE(MAX(wal_id), 0) FROM {COMMIT_TABLE})
                 ORDER BY id"
            ))?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>();
            keys
        })
    }

    /// Every entry without a commit record, including gaps below the watermark
    pub fn wal_pending_entries(&self) -> Result<Vec<WalEntry>, StoreError> {
        self.query_entries(&format!(
            "SELECT id, key FROM {WAL_TABLE} w
             WHERE NOT EXISTS (SELECT 1 FROM {COMMIT_TABLE} c WHERE c.wal_id = w.id)
             ORDER BY id"
        ))
    }

    /// All WAL entries in id order
    pub fn wal_entries(&self) -> Result<Vec<WalEntry>, StoreError> {
        self.query_entries(&format!("SELECT id, key FROM {WAL_TABLE} ORDER BY id"))
    }

    /// All commit records in sequence order
    pub fn wal_commits(&self) -> Result<Vec<CommitRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT sequence, wal_id FROM {COMMIT_TABLE} ORDER BY sequence"
            ))?;
            let commits = stmt
                .query_map([], |row| {
                    Ok(CommitRecord {
                        sequence: row.get(0)?,
                        wal_id: WalId(row.get(1)?),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>();
            commits
        })
    }

    fn query_entries(&self, sql: &str) -> Result<Vec<WalEntry>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let entries = stmt
                .query_map([], |row| {
                    Ok(WalEntry {
                        id: WalId(row.get(0)?),
                        key: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>();
            entries
        })
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
