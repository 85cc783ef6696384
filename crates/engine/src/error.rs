// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the streaming engine

use brook_core::ConfigError;
use brook_storage::StoreError;
use datafusion::error::DataFusionError;
use thiserror::Error;

/// Errors that can occur while building or running a streaming query
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("state store error: {0}")]
    Store(#[from] StoreError),
    #[error("compute error: {0}")]
    DataFusion(#[from] DataFusionError),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink write failed: {0}")]
    Sink(String),
    #[error("query task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
