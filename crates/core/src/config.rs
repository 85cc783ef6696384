// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job configuration shared by sources, operators and the driving loop

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Write option naming the directory that holds the state store
pub const CHECKPOINT_LOCATION: &str = "checkpointLocation";

/// Source option: combine pre-existing units into a single micro-batch
pub const RUN_INITIAL_BATCH: &str = "run_initial_batch";

/// Source option: milliseconds to wait before reading a newly created unit
pub const SETTLE_MS: &str = "settle_ms";

/// Errors raised while validating a job before it starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("expected a path when calling load()")]
    MissingPath,
    #[error("expected a path for {0} format")]
    MissingSinkPath(String),
    #[error("missing required option: {0}")]
    MissingOption(String),
    #[error("invalid value {value:?} for option {key}")]
    InvalidOption { key: String, value: String },
    #[error("{0} is not supported")]
    UnsupportedFormat(String),
    #[error("unsupported output mode: {0}")]
    UnsupportedOutputMode(String),
}

/// Which rows of a continuously updated aggregate are emitted per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Every group ever seen
    Complete,
    /// Only groups that are final (requires an append policy)
    #[default]
    Append,
    /// Only groups touched by the current batch
    Update,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Complete => write!(f, "complete"),
            OutputMode::Append => write!(f, "append"),
            OutputMode::Update => write!(f, "update"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(OutputMode::Complete),
            "append" => Ok(OutputMode::Append),
            "update" => Ok(OutputMode::Update),
            other => Err(ConfigError::UnsupportedOutputMode(other.to_string())),
        }
    }
}

/// Sink-side configuration handed to every stage of a running job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub write_options: HashMap<String, String>,
    pub output_mode: OutputMode,
}

impl Config {
    pub fn new(output_mode: OutputMode) -> Self {
        Self {
            write_options: HashMap::new(),
            output_mode,
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.write_options.insert(key.into(), value.into());
        self
    }

    /// Directory holding the WAL and state snapshots for this job
    pub fn checkpoint_location(&self) -> Result<PathBuf, ConfigError> {
        self.write_options
            .get(CHECKPOINT_LOCATION)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingOption(CHECKPOINT_LOCATION.to_string()))
    }
}

/// Options understood by file sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    pub run_initial_batch: bool,
    pub settle: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            run_initial_batch: true,
            settle: Duration::ZERO,
        }
    }
}

impl SourceOptions {
    /// Parse source options from the raw string map, rejecting bad values
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut parsed = Self::default();

        if let Some(value) = options.get(RUN_INITIAL_BATCH) {
            parsed.run_initial_batch = match value.as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(invalid(RUN_INITIAL_BATCH, value)),
            };
        }

        if let Some(value) = options.get(SETTLE_MS) {
            let millis: u64 = value.parse().map_err(|_| invalid(SETTLE_MS, value))?;
            parsed.settle = Duration::from_millis(millis);
        }

        Ok(parsed)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
