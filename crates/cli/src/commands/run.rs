// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `brook run <job.toml>` - Run a streaming job

use crate::job::Job;
use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args)]
pub struct RunArgs {
    /// Job file (TOML)
    pub job: PathBuf,

    /// Checkpoint directory, overriding the job's checkpointLocation
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let mut job = Job::load(&args.job)?;
    if let Some(dir) = &args.checkpoint {
        job.set_checkpoint(dir);
    }
    let base = args
        .job
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    // Everything is validated here, before the query task starts
    let pipeline = job.pipeline(base)?;
    let (writer, sink_path) = job.writer(pipeline, base);
    let query = writer
        .build(sink_path)
        .with_context(|| format!("setting up job {}", args.job.display()))?;

    let handle = query.save();
    let cancel = handle.cancel_token().clone();
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested, stopping after the current batch");
        cancel.cancel();
    });

    let stats = handle.wait().await;
    signals.abort();
    let stats = stats?;

    println!(
        "Processed {} batches ({} rows, {} units committed)",
        stats.batches,
        stats.rows_written,
        stats.committed.len()
    );
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return;
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
