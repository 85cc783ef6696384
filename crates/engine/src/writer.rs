// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fluent setup of a streaming query: reader, pipeline, writer

use crate::context::ExecContext;
use crate::error::EngineError;
use crate::pipeline::Pipeline;
use crate::query::{QueryHandle, QueryManager};
use crate::sink::SinkKind;
use crate::source::{FileSource, SourceKind};
use brook_core::{Config, ConfigError, OutputMode, SourceOptions};
use datafusion::prelude::SessionContext;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

/// Configures a file source
#[derive(Debug, Clone)]
pub struct StreamReader {
    format: String,
    options: HashMap<String, String>,
}

impl Default for StreamReader {
    fn default() -> Self {
        Self {
            format: "csv".to_string(),
            options: HashMap::new(),
        }
    }
}

impl StreamReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Watch `path` for input units, validating format and options now
    pub fn load(self, path: impl Into<PathBuf>) -> Result<Pipeline, ConfigError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath);
        }
        let kind: SourceKind = self.format.parse()?;
        let options = SourceOptions::from_options(&self.options)?;
        Ok(Pipeline::new(FileSource::load(path, kind, options)?))
    }
}

/// Configures the sink and starts the query
pub struct StreamWriter {
    pipeline: Pipeline,
    format: String,
    options: HashMap<String, String>,
    output_mode: String,
    session: SessionContext,
}

impl StreamWriter {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            format: "console".to_string(),
            options: HashMap::new(),
            output_mode: OutputMode::default().to_string(),
            session: SessionContext::new(),
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn output_mode(mut self, mode: impl Into<String>) -> Self {
        self.output_mode = mode.into();
        self
    }

    /// Use an existing DataFusion session instead of a fresh one
    pub fn session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    /// Start a query whose sink needs no path (console)
    pub fn start(self) -> Result<QueryHandle, EngineError> {
        self.launch(None)
    }

    /// Start a query writing under `path`
    pub fn save(self, path: impl Into<PathBuf>) -> Result<QueryHandle, EngineError> {
        self.launch(Some(path.into()))
    }

    /// Validate everything and assemble the query without starting it
    pub fn build(self, path: Option<PathBuf>) -> Result<QueryManager, EngineError> {
        let output_mode: OutputMode = self.output_mode.parse()?;
        let sink = SinkKind::from_format(&self.format, path.as_deref())?;
        let config = Config {
            write_options: self.options,
            output_mode,
        };
        let cx = ExecContext::open(self.session, config)?;
        info!(
            location = %cx.store().location().display(),
            %output_mode,
            sink = ?sink,
            "query configured"
        );
        Ok(QueryManager::new(self.pipeline, sink.build()?, cx))
    }

    fn launch(self, path: Option<PathBuf>) -> Result<QueryHandle, EngineError> {
        Ok(self.build(path)?.save())
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
