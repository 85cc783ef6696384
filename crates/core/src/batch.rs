// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Micro-batches and their provenance

use crate::id::WalId;
use chrono::{DateTime, Utc};
use datafusion::prelude::DataFrame;
use std::path::PathBuf;
use std::sync::Arc;

/// Provenance of a micro-batch: which input units and WAL entries produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub start_time: DateTime<Utc>,
    pub source_units: Vec<PathBuf>,
    pub wal_ids: Vec<WalId>,
}

impl Metadata {
    pub fn new(start_time: DateTime<Utc>, source_units: Vec<PathBuf>, wal_ids: Vec<WalId>) -> Self {
        Self {
            start_time,
            source_units,
            wal_ids,
        }
    }
}

/// A bounded, lazily evaluated table plus the metadata that produced it.
///
/// Transformations derive a new batch with [`MicroBatch::with_data`], which
/// shares the same metadata object instead of copying it.
#[derive(Clone)]
pub struct MicroBatch {
    data: DataFrame,
    metadata: Arc<Metadata>,
}

impl MicroBatch {
    pub fn new(data: DataFrame, metadata: Metadata) -> Self {
        Self {
            data,
            metadata: Arc::new(metadata),
        }
    }

    /// Pair new data with this batch's metadata
    pub fn with_data(&self, data: DataFrame) -> Self {
        Self {
            data,
            metadata: Arc::clone(&self.metadata),
        }
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn into_data(self) -> DataFrame {
        self.data
    }

    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    pub fn wal_ids(&self) -> &[WalId] {
        &self.metadata.wal_ids
    }
}

impl std::fmt::Debug for MicroBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MicroBatch")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
