// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `brook wal <checkpoint>` - Show the write-ahead log

use anyhow::{bail, Result};
use brook_storage::{StateStore, DATABASE_FILE};
use clap::Args;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Args)]
pub struct WalArgs {
    /// Checkpoint directory of a job
    pub checkpoint: PathBuf,
}

pub fn wal(args: WalArgs) -> Result<()> {
    if !args.checkpoint.join(DATABASE_FILE).is_file() {
        bail!("no state store in {}", args.checkpoint.display());
    }
    let store = StateStore::open(&args.checkpoint)?;

    let entries = store.wal_entries()?;
    let committed: HashSet<_> = store.wal_commits()?.into_iter().map(|c| c.wal_id).collect();
    let watermark = store.wal_watermark()?;

    if entries.is_empty() {
        println!("No WAL entries");
        return Ok(());
    }

    println!("{:<8} {:<10} KEY", "ID", "STATUS");
    for entry in &entries {
        let status = if committed.contains(&entry.id) {
            "committed"
        } else {
            "pending"
        };
        println!("{:<8} {:<10} {}", entry.id.get(), status, entry.key);
    }
    println!();
    println!("Watermark: {watermark}");

    let gaps: Vec<String> = store
        .wal_pending_entries()?
        .into_iter()
        .filter(|e| e.id < watermark)
        .map(|e| e.id.to_string())
        .collect();
    if !gaps.is_empty() {
        println!("Pending below watermark: {}", gaps.join(", "));
    }
    Ok(())
}
