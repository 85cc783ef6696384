// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sources and sinks for tests

use crate::context::ExecContext;
use crate::error::EngineError;
use crate::sink::Sink;
use crate::source::{BatchStream, SourceKind};
use async_trait::async_trait;
use brook_core::{Clock, Config, FakeClock, Metadata, MicroBatch, OutputMode, CHECKPOINT_LOCATION};
use datafusion::arrow::array::{Array, ArrayRef, AsArray, Int64Array, RecordBatch};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{DataType, Field, Int64Type, Schema};
use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use datafusion::prelude::{DataFrame, SessionContext};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Replays pre-built record batches, one micro-batch per unit.
///
/// Each unit is logged to the WAL under its key before it is handed out,
/// exactly like a file unit.
pub struct MemorySource {
    units: VecDeque<(String, RecordBatch)>,
    clock: FakeClock,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            units: VecDeque::new(),
            clock: FakeClock::new(),
        }
    }

    pub fn unit(mut self, key: impl Into<String>, batch: RecordBatch) -> Self {
        self.units.push_back((key.into(), batch));
        self
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchStream for MemorySource {
    async fn next_batch(&mut self, cx: &ExecContext) -> Result<Option<MicroBatch>, EngineError> {
        let Some((key, batch)) = self.units.pop_front() else {
            return Ok(None);
        };
        let wal_id = cx.store().wal_append(&key)?;
        let data = cx.session().read_batch(batch)?;
        let metadata = Metadata::new(self.clock.now(), vec![PathBuf::from(key)], vec![wal_id]);
        Ok(Some(MicroBatch::new(data, metadata)))
    }
}

/// A batch as seen by [`MemorySink`]
#[derive(Debug, Clone)]
pub struct Delivered {
    pub metadata: Arc<Metadata>,
    pub batches: Vec<RecordBatch>,
}

/// Collects written batches; clones share the same record
#[derive(Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Delivered>>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every write fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&mut self, batch: &MicroBatch) -> Result<u64, EngineError> {
        if self.fail {
            return Err(EngineError::Sink("memory sink refused the batch".to_string()));
        }
        let batches = batch.data().clone().collect().await?;
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Delivered {
                metadata: Arc::clone(batch.metadata()),
                batches,
            });
        Ok(rows as u64)
    }
}

/// Record batch of nullable `Int64` columns
pub fn int_batch(columns: &[(&str, Vec<i64>)]) -> Result<RecordBatch, ArrowError> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Int64, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(Int64Array::from(values.clone())) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// Every row of integer-valued `batches`, sorted, nulls as `None`
pub fn int_rows(batches: &[RecordBatch]) -> Result<Vec<Vec<Option<i64>>>, ArrowError> {
    let mut rows = Vec::new();
    for batch in batches {
        let columns = batch
            .columns()
            .iter()
            .map(|c| cast(c, &DataType::Int64))
            .collect::<Result<Vec<_>, _>>()?;
        for row in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter()
                    .map(|c| {
                        let values = c.as_primitive::<Int64Type>();
                        values.is_valid(row).then(|| values.value(row))
                    })
                    .collect(),
            );
        }
    }
    rows.sort();
    Ok(rows)
}

/// Execute `df` and return its sorted integer rows
pub async fn collect_int_rows(df: DataFrame) -> Result<Vec<Vec<Option<i64>>>, EngineError> {
    let batches = df.collect().await?;
    Ok(int_rows(&batches).map_err(DataFusionError::from)?)
}

/// Execution context with its state store under `checkpoint`
pub fn context_at(checkpoint: &Path, output_mode: OutputMode) -> Result<ExecContext, EngineError> {
    let config = Config::new(output_mode)
        .with_option(CHECKPOINT_LOCATION, checkpoint.to_string_lossy());
    ExecContext::open(SessionContext::new(), config)
}

/// Micro-batch over a CSV file written to `path`, schema inferred
pub async fn csv_micro_batch(
    cx: &ExecContext,
    path: &Path,
    contents: &str,
) -> Result<MicroBatch, EngineError> {
    std::fs::write(path, contents)?;
    let data = SourceKind::Csv.read(cx.session(), &[path.to_path_buf()]).await?;
    Ok(MicroBatch::new(
        data,
        Metadata::new(FakeClock::new().now(), vec![path.to_path_buf()], Vec::new()),
    ))
}

/// Micro-batch over `batch` with no WAL provenance
pub fn micro_batch(cx: &ExecContext, batch: RecordBatch) -> Result<MicroBatch, EngineError> {
    let data = cx.session().read_batch(batch)?;
    Ok(MicroBatch::new(
        data,
        Metadata::new(FakeClock::new().now(), Vec::new(), Vec::new()),
    ))
}
