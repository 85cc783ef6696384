// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery through the public API
//!
//! A job that fails between reading and committing leaves its units in the
//! WAL; reopening the same checkpoint location shows them as uncommitted,
//! and snapshots written before the failure are still there.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use brook_core::{OutputMode, WalId};
use brook_engine::testing::{context_at, int_batch, int_rows, MemorySink, MemorySource};
use brook_engine::{column, EngineError, Pipeline, QueryManager, GROUP_BY_STATE};
use brook_storage::StateStore;
use datafusion::functions_aggregate::expr_fn::sum;

fn units() -> MemorySource {
    MemorySource::new()
        .unit(
            "unit-1",
            int_batch(&[("id", vec![1, 2, 2]), ("col2", vec![4, 5, 5])]).unwrap(),
        )
        .unit(
            "unit-2",
            int_batch(&[("id", vec![2, 8, 9]), ("col2", vec![5, 11, 12])]).unwrap(),
        )
}

fn grouped(source: MemorySource) -> Pipeline {
    Pipeline::new(source)
        .group_by(["id"])
        .agg(vec![sum(column("col2")).into()])
}

#[tokio::test]
async fn failed_write_is_visible_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("checkpoint");
    let cx = context_at(&checkpoint, OutputMode::Complete).unwrap();

    let result = QueryManager::new(grouped(units()), Box::new(MemorySink::failing()), cx)
        .run()
        .await;
    assert!(matches!(result, Err(EngineError::Sink(_))));

    let store = StateStore::open(&checkpoint).unwrap();
    assert_eq!(store.wal_watermark().unwrap(), WalId(0));
    assert_eq!(store.wal_uncommitted_entries().unwrap(), vec!["unit-1".to_string()]);
    // The operator ran before the sink failed
    assert_eq!(store.read_state(GROUP_BY_STATE).unwrap().num_rows(), 3);
}

#[tokio::test]
async fn resumed_job_continues_from_its_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("checkpoint");

    let first = MemorySource::new().unit(
        "unit-1",
        int_batch(&[("id", vec![1, 2, 2]), ("col2", vec![4, 5, 5])]).unwrap(),
    );
    let cx = context_at(&checkpoint, OutputMode::Complete).unwrap();
    QueryManager::new(grouped(first), Box::new(MemorySink::new()), cx)
        .run()
        .await
        .unwrap();

    let second = MemorySource::new().unit(
        "unit-2",
        int_batch(&[("id", vec![2, 8, 9]), ("col2", vec![5, 11, 12])]).unwrap(),
    );
    let sink = MemorySink::new();
    let cx = context_at(&checkpoint, OutputMode::Complete).unwrap();
    let stats = QueryManager::new(grouped(second), Box::new(sink.clone()), cx)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.committed, vec![WalId(2)]);
    assert_eq!(
        int_rows(&sink.delivered()[0].batches).unwrap(),
        vec![
            vec![Some(1), Some(4)],
            vec![Some(2), Some(15)],
            vec![Some(8), Some(11)],
            vec![Some(9), Some(12)],
        ]
    );
}

#[tokio::test]
async fn commits_below_the_watermark_hide_gaps_from_the_watermark_query() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::open(dir.path()).unwrap();
    let first = store.wal_append("unit-1").unwrap();
    let second = store.wal_append("unit-2").unwrap();
    store.wal_commit(second).unwrap();

    assert!(store.wal_uncommitted_entries().unwrap().is_empty());
    let pending: Vec<_> = store
        .wal_pending_entries()
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(pending, vec![first]);
}
