// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The driving loop: source to operators to sink, then commit

use crate::context::ExecContext;
use crate::error::EngineError;
use crate::pipeline::Pipeline;
use crate::sink::Sink;
use crate::source::BatchStream;
use brook_core::WalId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Progress of one query run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub batches: u64,
    pub rows_written: u64,
    pub committed: Vec<WalId>,
}

/// Drives one pipeline into one sink.
///
/// Batches are strictly sequential: each is written and its WAL ids are
/// committed before the next is pulled. A WAL id is never committed before
/// its batch was written, so a crash in between redelivers the batch.
pub struct QueryManager {
    pipeline: Pipeline,
    sink: Box<dyn Sink>,
    cx: ExecContext,
}

impl QueryManager {
    pub fn new(pipeline: Pipeline, sink: Box<dyn Sink>, cx: ExecContext) -> Self {
        Self { pipeline, sink, cx }
    }

    /// Run in the foreground until the source ends or the query is cancelled
    pub async fn run(mut self) -> Result<QueryStats, EngineError> {
        let mut stats = QueryStats::default();
        loop {
            if self.cx.cancel().is_cancelled() {
                info!(batches = stats.batches, "query cancelled");
                break;
            }
            let Some(batch) = self.pipeline.next_batch(&self.cx).await? else {
                break;
            };

            let rows = self.sink.write(&batch).await?;
            for wal_id in batch.wal_ids() {
                self.cx.store().wal_commit(*wal_id)?;
            }

            stats.batches += 1;
            stats.rows_written += rows;
            stats.committed.extend_from_slice(batch.wal_ids());
            info!(
                wal_ids = ?batch.wal_ids(),
                units = batch.metadata().source_units.len(),
                rows,
                "batch committed"
            );
        }
        info!(
            batches = stats.batches,
            rows = stats.rows_written,
            "query finished"
        );
        Ok(stats)
    }

    /// Start the driving loop as a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn save(self) -> QueryHandle {
        let cancel = self.cx.cancel().clone();
        let task = tokio::spawn(async move {
            let result = self.run().await;
            if let Err(e) = &result {
                error!(error = %e, "query failed");
            }
            result
        });
        QueryHandle { cancel, task }
    }
}

/// Handle to a query running in the background
pub struct QueryHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<QueryStats, EngineError>>,
}

impl QueryHandle {
    /// Signal the query to stop and wait for it to release its resources.
    ///
    /// The query stops at its next wait for input or between batches; a
    /// batch already being written completes and is committed.
    pub async fn stop(self) -> Result<QueryStats, EngineError> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the query to end on its own
    pub async fn wait(self) -> Result<QueryStats, EngineError> {
        self.task.await?
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
