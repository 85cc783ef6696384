// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sources: producers of micro-batches

use crate::context::ExecContext;
use crate::error::EngineError;
use crate::watch::{UnitEvent, UnitWatcher, REPORTS_CLOSE};
use async_trait::async_trait;
use brook_core::{
    Clock, ConfigError, Metadata, MicroBatch, OutputMode, SourceOptions, SystemClock,
};
use chrono::{DateTime, Utc};
use datafusion::prelude::{
    CsvReadOptions, DataFrame, NdJsonReadOptions, ParquetReadOptions, SessionContext,
};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SIZE_POLL: Duration = Duration::from_millis(100);

/// A single-pass, possibly infinite sequence of micro-batches.
///
/// `Ok(None)` ends the sequence: the source is exhausted or the query was
/// cancelled.
#[async_trait]
pub trait BatchStream: Send {
    async fn next_batch(&mut self, cx: &ExecContext) -> Result<Option<MicroBatch>, EngineError>;
}

/// Input file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    NdJson,
    Parquet,
    /// Line-delimited JSON under its short name
    Json,
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(SourceKind::Csv),
            "ndjson" => Ok(SourceKind::NdJson),
            "parquet" => Ok(SourceKind::Parquet),
            "json" => Ok(SourceKind::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl SourceKind {
    /// Lazily read `units` as one table
    pub async fn read(
        self,
        session: &SessionContext,
        units: &[PathBuf],
    ) -> Result<DataFrame, EngineError> {
        let paths: Vec<String> = units
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let df = match self {
            SourceKind::Csv => {
                session
                    .read_csv(paths, CsvReadOptions::new().file_extension(""))
                    .await?
            }
            SourceKind::NdJson | SourceKind::Json => {
                let mut options = NdJsonReadOptions::default();
                options.file_extension = "";
                session.read_json(paths, options).await?
            }
            SourceKind::Parquet => {
                let mut options = ParquetReadOptions::default();
                options.file_extension = "";
                session.read_parquet(paths, options).await?
            }
        };
        Ok(df)
    }
}

/// Watches a directory of input units (files).
///
/// Existing units are delivered first, together or one per batch depending
/// on `run_initial_batch`. Outside `COMPLETE` mode the source then waits for
/// new units until the query is cancelled. Every unit gets its WAL id
/// before its contents are read.
pub struct FileSource<C: Clock = SystemClock> {
    location: PathBuf,
    kind: SourceKind,
    options: SourceOptions,
    clock: C,
    started: bool,
    backlog: VecDeque<Vec<PathBuf>>,
    seen: HashSet<PathBuf>,
    watcher: Option<UnitWatcher>,
}

impl FileSource<SystemClock> {
    /// Record the input location; nothing is touched until the first batch
    pub fn load(
        location: impl Into<PathBuf>,
        kind: SourceKind,
        options: SourceOptions,
    ) -> Result<Self, ConfigError> {
        let location = location.into();
        if location.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath);
        }
        Ok(Self {
            location,
            kind,
            options,
            clock: SystemClock,
            started: false,
            backlog: VecDeque::new(),
            seen: HashSet::new(),
            watcher: None,
        })
    }
}

impl<C: Clock> FileSource<C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> FileSource<C2> {
        FileSource {
            location: self.location,
            kind: self.kind,
            options: self.options,
            clock,
            started: self.started,
            backlog: self.backlog,
            seen: self.seen,
            watcher: self.watcher,
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn start(&mut self, cx: &ExecContext) -> Result<(), EngineError> {
        self.location = self.location.canonicalize()?;

        // Subscribe before listing so a unit created in between is not missed
        if cx.config().output_mode != OutputMode::Complete {
            self.watcher = Some(UnitWatcher::subscribe(&self.location)?);
        }

        let units = list_units(&self.location)?;
        info!(
            location = %self.location.display(),
            units = units.len(),
            "source started"
        );
        self.seen.extend(units.iter().cloned());

        if units.is_empty() {
            return Ok(());
        }
        if self.options.run_initial_batch {
            self.backlog.push_back(units);
        } else {
            self.backlog.extend(units.into_iter().map(|unit| vec![unit]));
        }
        Ok(())
    }
}

async fn read_units(
    kind: SourceKind,
    start_time: DateTime<Utc>,
    cx: &ExecContext,
    units: Vec<PathBuf>,
) -> Result<MicroBatch, EngineError> {
    let mut wal_ids = Vec::with_capacity(units.len());
    for unit in &units {
        let wal_id = cx.store().wal_append(&unit.to_string_lossy())?;
        debug!(%wal_id, unit = %unit.display(), "unit logged");
        wal_ids.push(wal_id);
    }

    let data = kind.read(cx.session(), &units).await?;
    Ok(MicroBatch::new(data, Metadata::new(start_time, units, wal_ids)))
}

#[async_trait]
impl<C: Clock + 'static> BatchStream for FileSource<C> {
    async fn next_batch(&mut self, cx: &ExecContext) -> Result<Option<MicroBatch>, EngineError> {
        if !self.started {
            self.started = true;
            self.start(cx)?;
        }

        if let Some(units) = self.backlog.pop_front() {
            return read_units(self.kind, self.clock.now(), cx, units).await.map(Some);
        }

        loop {
            let Some(watcher) = self.watcher.as_mut() else {
                return Ok(None);
            };
            let event = tokio::select! {
                _ = cx.cancel().cancelled() => None,
                event = watcher.next_unit() => event,
            };
            let unit = match event {
                Some(Ok(UnitEvent::Ready(unit))) => unit,
                Some(Ok(UnitEvent::Created(unit))) if !REPORTS_CLOSE => {
                    let ready = tokio::select! {
                        _ = cx.cancel().cancelled() => false,
                        result = settled(&unit) => result?,
                    };
                    if !ready {
                        continue;
                    }
                    unit
                }
                // Ready follows once the writer closes the file
                Some(Ok(UnitEvent::Created(_))) => continue,
                Some(Err(e)) => return Err(e),
                None => {
                    info!(location = %self.location.display(), "source stopped watching");
                    self.watcher = None;
                    return Ok(None);
                }
            };
            if self.seen.contains(&unit) {
                continue;
            }
            // Left unseen so a later write can still deliver it
            if unit_len(&unit)?.unwrap_or(0) == 0 {
                debug!(unit = %unit.display(), "skipping empty unit");
                continue;
            }
            self.seen.insert(unit.clone());
            if !self.options.settle.is_zero() {
                tokio::time::sleep(self.options.settle).await;
            }
            return read_units(self.kind, self.clock.now(), cx, vec![unit])
                .await
                .map(Some);
        }
    }
}

/// Size of `unit`, `None` once it is gone
fn unit_len(unit: &Path) -> Result<Option<u64>, EngineError> {
    match std::fs::metadata(unit) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Wait until `unit` is non-empty and its size holds for one poll; false if
/// it disappeared
async fn settled(unit: &Path) -> Result<bool, EngineError> {
    let mut last = None;
    loop {
        let Some(len) = unit_len(unit)? else {
            return Ok(false);
        };
        if len > 0 && last == Some(len) {
            return Ok(true);
        }
        last = Some(len);
        tokio::time::sleep(SIZE_POLL).await;
    }
}

/// Non-directory entries directly under `location`, sorted by name
fn list_units(location: &Path) -> Result<Vec<PathBuf>, EngineError> {
    if location.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }
    let mut units = Vec::new();
    for entry in std::fs::read_dir(location)? {
        let path = entry?.path();
        if !path.is_dir() {
            units.push(path);
        }
    }
    units.sort();
    Ok(units)
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
