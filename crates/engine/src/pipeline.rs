// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A source composed with a chain of operators

use crate::aggregate::{AppendPolicy, GroupBy};
use crate::context::ExecContext;
use crate::dedup::DropDuplicates;
use crate::error::EngineError;
use crate::expr::ColumnExpr;
use crate::operator::Operator;
use crate::source::BatchStream;
use crate::writer::StreamWriter;
use async_trait::async_trait;
use brook_core::MicroBatch;
use tracing::debug;

/// Fluent description of a streaming computation.
///
/// Each builder call appends an operator; nothing runs until the pipeline is
/// driven by a query.
pub struct Pipeline {
    source: Box<dyn BatchStream>,
    operators: Vec<Operator>,
}

impl Pipeline {
    pub fn new(source: impl BatchStream + 'static) -> Self {
        Self {
            source: Box::new(source),
            operators: Vec::new(),
        }
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn then(mut self, operator: Operator) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn with_columns(self, exprs: Vec<ColumnExpr>) -> Self {
        self.then(Operator::WithColumns(exprs))
    }

    pub fn with_column(self, name: &str, expr: impl Into<ColumnExpr>) -> Self {
        self.with_columns(vec![expr.into().alias(name)])
    }

    pub fn select(self, exprs: Vec<ColumnExpr>) -> Self {
        self.then(Operator::Select(exprs))
    }

    pub fn filter(self, predicate: impl Into<ColumnExpr>) -> Self {
        self.then(Operator::Filter(predicate.into()))
    }

    pub fn group_by<S: Into<String>>(self, keys: impl IntoIterator<Item = S>) -> GroupedPipeline {
        GroupedPipeline {
            pipeline: self,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn drop_duplicates<S: Into<String>>(self, keys: impl IntoIterator<Item = S>) -> Self {
        let keys = keys.into_iter().map(Into::into).collect();
        self.then(Operator::DropDuplicates(DropDuplicates::new(keys)))
    }

    pub fn write_stream(self) -> StreamWriter {
        StreamWriter::new(self)
    }
}

#[async_trait]
impl BatchStream for Pipeline {
    async fn next_batch(&mut self, cx: &ExecContext) -> Result<Option<MicroBatch>, EngineError> {
        let Some(mut batch) = self.source.next_batch(cx).await? else {
            return Ok(None);
        };
        for operator in self.operators.iter_mut() {
            debug!(operator = operator.name(), "applying operator");
            batch = operator.apply(batch, cx).await?;
        }
        Ok(Some(batch))
    }
}

/// A pipeline waiting for the aggregations of a `group_by`
pub struct GroupedPipeline {
    pipeline: Pipeline,
    keys: Vec<String>,
}

impl GroupedPipeline {
    pub fn agg(self, aggregations: Vec<ColumnExpr>) -> Pipeline {
        let group_by = GroupBy::new(self.keys, aggregations);
        self.pipeline.then(Operator::GroupBy(group_by))
    }

    /// Aggregate, deciding `APPEND` output with `policy`
    pub fn agg_with_policy(
        self,
        aggregations: Vec<ColumnExpr>,
        policy: impl AppendPolicy + 'static,
    ) -> Pipeline {
        let group_by = GroupBy::new(self.keys, aggregations).with_append_policy(policy);
        self.pipeline.then(Operator::GroupBy(group_by))
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
