// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job files: a TOML description of source, operators and sink
//!
//! ```toml
//! [source]
//! format = "csv"
//! path = "input"
//!
//! [[operator]]
//! kind = "group_by"
//! keys = ["id"]
//! aggregations = [{ expr = "sum(col2)", name = "total" }]
//!
//! [sink]
//! format = "csv"
//! path = "output"
//! output_mode = "complete"
//! options = { checkpointLocation = "checkpoint" }
//! ```
//!
//! Relative paths are resolved against the directory holding the job file.

use anyhow::{Context, Result};
use brook_core::{ConfigError, CHECKPOINT_LOCATION};
use brook_engine::{ColumnExpr, Pipeline, StreamReader, StreamWriter};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub source: SourceSpec,
    #[serde(default, rename = "operator")]
    pub operators: Vec<OperatorSpec>,
    pub sink: SinkSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    #[serde(default = "default_source_format")]
    pub format: String,
    pub path: PathBuf,
    #[serde(default)]
    pub options: HashMap<String, OptionValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorSpec {
    Filter {
        predicate: String,
    },
    WithColumn {
        name: String,
        expr: String,
    },
    Select {
        columns: Vec<String>,
    },
    GroupBy {
        keys: Vec<String>,
        aggregations: Vec<AggregationSpec>,
    },
    DropDuplicates {
        keys: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationSpec {
    pub expr: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkSpec {
    #[serde(default = "default_sink_format")]
    pub format: String,
    pub path: Option<PathBuf>,
    #[serde(default = "default_output_mode")]
    pub output_mode: String,
    #[serde(default)]
    pub options: HashMap<String, OptionValue>,
}

/// Option values may be written as TOML strings, booleans or integers
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Text(String),
    Flag(bool),
    Number(i64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::Flag(b) => write!(f, "{b}"),
            OptionValue::Number(n) => write!(f, "{n}"),
        }
    }
}

fn default_source_format() -> String {
    "csv".to_string()
}

fn default_sink_format() -> String {
    "console".to_string()
}

fn default_output_mode() -> String {
    "append".to_string()
}

impl Job {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading job file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing job file {}", path.display()))
    }

    /// Override the sink's checkpoint location
    pub fn set_checkpoint(&mut self, dir: &Path) {
        self.sink.options.insert(
            CHECKPOINT_LOCATION.to_string(),
            OptionValue::Text(dir.to_string_lossy().into_owned()),
        );
    }

    /// Source and operators, with the source path resolved against `base`
    pub fn pipeline(&self, base: &Path) -> Result<Pipeline, ConfigError> {
        let source = &self.source;
        if source.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath);
        }
        let mut pipeline = StreamReader::new()
            .format(&source.format)
            .options(stringify(&source.options))
            .load(resolve(base, &source.path))?;

        for operator in &self.operators {
            pipeline = match operator {
                OperatorSpec::Filter { predicate } => pipeline.filter(ColumnExpr::sql(predicate)),
                OperatorSpec::WithColumn { name, expr } => {
                    pipeline.with_column(name, ColumnExpr::sql(expr))
                }
                OperatorSpec::Select { columns } => {
                    pipeline.select(columns.iter().map(ColumnExpr::sql).collect())
                }
                OperatorSpec::GroupBy { keys, aggregations } => pipeline
                    .group_by(keys.iter().cloned())
                    .agg(aggregations.iter().map(AggregationSpec::to_expr).collect()),
                OperatorSpec::DropDuplicates { keys } => {
                    pipeline.drop_duplicates(keys.iter().cloned())
                }
            };
        }
        Ok(pipeline)
    }

    /// Writer for the sink, and the resolved sink path if any
    pub fn writer(&self, pipeline: Pipeline, base: &Path) -> (StreamWriter, Option<PathBuf>) {
        let mut options = stringify(&self.sink.options);
        if let Some(location) = options.get_mut(CHECKPOINT_LOCATION) {
            if !location.is_empty() {
                *location = resolve(base, Path::new(location.as_str()))
                    .to_string_lossy()
                    .into_owned();
            }
        }
        let writer = pipeline
            .write_stream()
            .format(&self.sink.format)
            .output_mode(&self.sink.output_mode)
            .options(options);
        let path = self.sink.path.as_deref().map(|p| resolve(base, p));
        (writer, path)
    }
}

impl AggregationSpec {
    fn to_expr(&self) -> ColumnExpr {
        let expr = ColumnExpr::sql(&self.expr);
        match &self.name {
            Some(name) => expr.alias(name),
            None => expr,
        }
    }
}

fn stringify(options: &HashMap<String, OptionValue>) -> HashMap<String, String> {
    options
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
