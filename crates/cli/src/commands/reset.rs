// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `brook reset <checkpoint>` - Drop operator state so the next run starts over

use anyhow::{bail, Result};
use brook_engine::{DROP_DUPLICATES_STATE, GROUP_BY_STATE};
use brook_storage::{StateStore, DATABASE_FILE};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct ResetArgs {
    /// Checkpoint directory of a job
    pub checkpoint: PathBuf,

    /// Snapshot to drop (repeatable; defaults to every operator snapshot)
    #[arg(long = "state", value_name = "NAME")]
    pub states: Vec<String>,
}

/// The WAL is kept: it records what was read, not what was aggregated
pub fn reset(args: ResetArgs) -> Result<()> {
    if !args.checkpoint.join(DATABASE_FILE).is_file() {
        bail!("no state store in {}", args.checkpoint.display());
    }
    let store = StateStore::open(&args.checkpoint)?;

    let states = if args.states.is_empty() {
        vec![GROUP_BY_STATE.to_string(), DROP_DUPLICATES_STATE.to_string()]
    } else {
        args.states
    };
    for name in &states {
        if store.drop_state(name)? {
            info!(name = %name, "state dropped");
            println!("Dropped state: {name}");
        } else {
            println!("No state named {name}");
        }
    }
    Ok(())
}
