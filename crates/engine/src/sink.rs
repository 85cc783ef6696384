// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sinks: where each micro-batch is delivered

use crate::error::EngineError;
use async_trait::async_trait;
use brook_core::{ConfigError, IdGen, MicroBatch, UuidIdGen};
use datafusion::arrow::array::{AsArray, RecordBatch};
use datafusion::arrow::datatypes::UInt64Type;
use datafusion::arrow::util::pretty::pretty_format_batches;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::error::DataFusionError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Destination of micro-batches.
///
/// `write` returns only after the batch is durably delivered; the driving
/// loop commits the batch's WAL ids on success.
#[async_trait]
pub trait Sink: Send {
    /// Deliver `batch`, returning the number of rows written
    async fn write(&mut self, batch: &MicroBatch) -> Result<u64, EngineError>;
}

/// File format written by [`FileSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
    /// Line-delimited JSON
    Json,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
            FileFormat::Json => "json",
        }
    }
}

impl FromStr for FileFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(FileFormat::Csv),
            "parquet" => Ok(FileFormat::Parquet),
            "json" => Ok(FileFormat::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Sink selected by a job's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File { format: FileFormat, path: PathBuf },
}

impl SinkKind {
    /// Resolve a format name and optional path, failing on anything unusable
    pub fn from_format(format: &str, path: Option<&Path>) -> Result<Self, ConfigError> {
        if format == "console" {
            return Ok(SinkKind::Console);
        }
        let format: FileFormat = format.parse()?;
        match path {
            Some(path) if !path.as_os_str().is_empty() => Ok(SinkKind::File {
                format,
                path: path.to_path_buf(),
            }),
            _ => Err(ConfigError::MissingSinkPath(format.extension().to_string())),
        }
    }

    /// Construct the sink, creating its output directory
    pub fn build(self) -> Result<Box<dyn Sink>, EngineError> {
        Ok(match self {
            SinkKind::Console => Box::new(ConsoleSink),
            SinkKind::File { format, path } => Box::new(FileSink::create(format, path)?),
        })
    }
}

/// Pretty-prints each batch to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl Sink for ConsoleSink {
    async fn write(&mut self, batch: &MicroBatch) -> Result<u64, EngineError> {
        let batches = batch.data().clone().collect().await?;
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        let table = pretty_format_batches(&batches).map_err(DataFusionError::from)?;
        println!("{table}");
        Ok(rows as u64)
    }
}

/// Writes each batch to a new file `<id>.<ext>` under a directory
pub struct FileSink<I: IdGen = UuidIdGen> {
    format: FileFormat,
    dir: PathBuf,
    ids: I,
}

impl FileSink<UuidIdGen> {
    pub fn create(format: FileFormat, dir: PathBuf) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            format,
            dir,
            ids: UuidIdGen,
        })
    }
}

impl<I: IdGen> FileSink<I> {
    pub fn with_id_gen<I2: IdGen>(self, ids: I2) -> FileSink<I2> {
        FileSink {
            format: self.format,
            dir: self.dir,
            ids,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl<I: IdGen + 'static> Sink for FileSink<I> {
    async fn write(&mut self, batch: &MicroBatch) -> Result<u64, EngineError> {
        let target = self
            .dir
            .join(format!("{}.{}", self.ids.next(), self.format.extension()));
        let path = target.to_string_lossy().into_owned();
        let options = DataFrameWriteOptions::new().with_single_file_output(true);
        let df = batch.data().clone();

        let result = match self.format {
            FileFormat::Csv => df.write_csv(&path, options, None).await?,
            FileFormat::Parquet => df.write_parquet(&path, options, None).await?,
            FileFormat::Json => df.write_json(&path, options, None).await?,
        };
        let rows = written_rows(&result);
        debug!(path = %target.display(), rows, "batch written");
        Ok(rows)
    }
}

// Writers report a single `count` row
fn written_rows(result: &[RecordBatch]) -> u64 {
    result
        .first()
        .filter(|batch| batch.num_columns() > 0 && batch.num_rows() > 0)
        .and_then(|batch| batch.column(0).as_primitive_opt::<UInt64Type>())
        .map(|count| count.value(0))
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
