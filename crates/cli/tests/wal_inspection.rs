// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for `brook wal`

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

mod common;

use common::{brook, JobDir, COMPLETE_CSV_JOB};
use predicates::prelude::*;

#[test]
fn test_wal_lists_committed_units() {
    let dir = JobDir::new();
    let job = dir.job(COMPLETE_CSV_JOB);
    brook().arg("run").arg(&job).assert().success();

    brook()
        .arg("wal")
        .arg(dir.checkpoint())
        .assert()
        .success()
        .stdout(predicate::str::contains("a.csv"))
        .stdout(predicate::str::contains("b.csv"))
        .stdout(predicate::str::contains("committed"))
        .stdout(predicate::str::contains("pending").not())
        .stdout(predicate::str::contains("Watermark: 2"));
}

#[test]
fn test_rerun_logs_units_again() {
    let dir = JobDir::new();
    let job = dir.job(COMPLETE_CSV_JOB);
    brook().arg("run").arg(&job).assert().success();
    brook().arg("run").arg(&job).assert().success();

    brook()
        .arg("wal")
        .arg(dir.checkpoint())
        .assert()
        .success()
        .stdout(predicate::str::contains("Watermark: 4"));
}

#[test]
fn test_wal_without_store_fails() {
    let dir = JobDir::new();

    brook()
        .arg("wal")
        .arg(dir.path().join("nothing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no state store"));
}
