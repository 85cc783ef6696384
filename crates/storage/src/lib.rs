// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! brook-storage: durable WAL and state snapshots for streaming jobs
//!
//! A single SQLite database under the checkpoint location holds the
//! write-ahead log, the commit log, and one table per named snapshot.
//! Reopening the same location resumes a job after a crash.

mod state;
mod store;
mod wal;

pub use state::StateTable;
pub use store::{StateStore, StoreError, DATABASE_FILE};
pub use wal::{CommitRecord, WalEntry};
