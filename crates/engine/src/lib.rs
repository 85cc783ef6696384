// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! brook-engine: the micro-batch streaming engine
//!
//! A [`Pipeline`] pulls micro-batches from a source and runs them through
//! operators; a [`QueryManager`] delivers each result to a sink and commits
//! the batch's WAL ids once the write succeeded.

mod aggregate;
mod context;
mod dedup;
mod error;
mod expr;
mod operator;
mod pipeline;
mod query;
mod sink;
mod source;
mod table;
mod watch;
mod writer;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregate::{AppendPolicy, EmitNothing, GroupBy, GROUP_BY_STATE};
pub use context::ExecContext;
pub use dedup::{DropDuplicates, DROP_DUPLICATES_STATE};
pub use error::EngineError;
pub use expr::{column, ColumnExpr};
pub use operator::Operator;
pub use pipeline::{GroupedPipeline, Pipeline};
pub use query::{QueryHandle, QueryManager, QueryStats};
pub use sink::{ConsoleSink, FileFormat, FileSink, Sink, SinkKind};
pub use source::{BatchStream, FileSource, SourceKind};
pub use writer::{StreamReader, StreamWriter};
