// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The `brook` binary under test
pub fn brook() -> Command {
    let mut cmd = Command::cargo_bin("brook").expect("brook binary");
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// A job directory with an `input/` holding two CSV units
pub struct JobDir {
    pub temp: TempDir,
}

impl JobDir {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let input = temp.path().join("input");
        fs::create_dir_all(&input).expect("Failed to create input dir");
        fs::write(input.join("a.csv"), "id,col2\n1,4\n2,5\n").expect("Failed to write unit");
        fs::write(input.join("b.csv"), "id,col2\n2,5\n8,11\n").expect("Failed to write unit");
        Self { temp }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write `job.toml` and return its path
    pub fn job(&self, toml: &str) -> PathBuf {
        let path = self.path().join("job.toml");
        fs::write(&path, toml).expect("Failed to write job file");
        path
    }

    pub fn checkpoint(&self) -> PathBuf {
        self.path().join("checkpoint")
    }

    /// Files written by a file sink under `out/`
    pub fn outputs(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.path().join("out")) else {
            return Vec::new();
        };
        let mut files: Vec<_> = entries
            .map(|e| e.expect("Failed to read dir entry").path())
            .collect();
        files.sort();
        files
    }
}

/// Grouped sum over the input, written once as CSV
pub const COMPLETE_CSV_JOB: &str = r#"
[source]
format = "csv"
path = "input"

[[operator]]
kind = "group_by"
keys = ["id"]
aggregations = [{ expr = "sum(col2)", name = "total" }]

[sink]
format = "csv"
path = "out"
output_mode = "complete"
options = { checkpointLocation = "checkpoint" }
"#;
