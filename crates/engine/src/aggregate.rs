// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grouped aggregation over the whole history of the stream

use crate::context::ExecContext;
use crate::error::EngineError;
use crate::expr::{column, same_key, ColumnExpr};
use crate::table::{frame, materialize};
use brook_core::{MicroBatch, OutputMode};
use datafusion::logical_expr::JoinType;
use datafusion::prelude::{DataFrame, Expr};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Snapshot holding every projected input row seen so far
pub const GROUP_BY_STATE: &str = "group_by";

/// Decides which groups are final in `APPEND` mode.
///
/// A policy sees the aggregate over the full history and the current batch
/// and returns the rows to emit. Emitting each final group once is the
/// policy's responsibility.
pub trait AppendPolicy: Send {
    fn emit(&mut self, aggregate: DataFrame, batch: &DataFrame) -> Result<DataFrame, EngineError>;
}

/// Without a watermark no group is ever final, so nothing is emitted
#[derive(Debug, Default)]
pub struct EmitNothing {
    warned: bool,
}

impl AppendPolicy for EmitNothing {
    fn emit(
        &mut self,
        aggregate: DataFrame,
        _batch: &DataFrame,
    ) -> Result<DataFrame, EngineError> {
        if !self.warned {
            self.warned = true;
            warn!("append mode has no append policy; grouped aggregation emits no rows");
        }
        Ok(aggregate.limit(0, Some(0))?)
    }
}

/// Group-by with aggregation, recomputed from the full history each batch
pub struct GroupBy {
    keys: Vec<String>,
    aggregations: Vec<ColumnExpr>,
    append: Box<dyn AppendPolicy>,
}

impl GroupBy {
    pub fn new(keys: Vec<String>, aggregations: Vec<ColumnExpr>) -> Self {
        Self {
            keys,
            aggregations,
            append: Box::new(EmitNothing::default()),
        }
    }

    pub fn with_append_policy(mut self, policy: impl AppendPolicy + 'static) -> Self {
        self.append = Box::new(policy);
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub(crate) async fn apply(
        &mut self,
        batch: MicroBatch,
        cx: &ExecContext,
    ) -> Result<MicroBatch, EngineError> {
        let session = cx.session();
        let store = cx.store();
        let input = batch.data().clone();

        let mut taken: HashSet<String> = self.keys.iter().cloned().collect();
        let mut aggregations = Vec::with_capacity(self.aggregations.len());
        for agg in &self.aggregations {
            let agg = name_after_input(agg.resolve(session, &input)?, &taken);
            taken.insert(agg.schema_name().to_string());
            aggregations.push(agg);
        }

        // Keys plus every column the aggregations read
        let mut needed = self.keys.clone();
        for agg in &aggregations {
            let mut refs: Vec<&str> = agg
                .column_refs()
                .into_iter()
                .map(|c| c.name.as_str())
                .collect();
            refs.sort_unstable();
            for name in refs {
                if !needed.iter().any(|n| n == name) {
                    needed.push(name.to_string());
                }
            }
        }
        let projection = input
            .clone()
            .select(needed.iter().map(|name| column(name)).collect::<Vec<_>>())?;

        let history = if store.state_exists(GROUP_BY_STATE)? {
            let previous = frame(session, store.read_state(GROUP_BY_STATE)?)?;
            previous.union(projection)?
        } else {
            projection
        };
        let history = materialize(history).await?;
        store.write_state(GROUP_BY_STATE, &history)?;
        debug!(rows = history.num_rows(), "group_by state written");

        let keys: Vec<Expr> = self.keys.iter().map(|k| column(k)).collect();
        let aggregate = frame(session, history)?.aggregate(keys, aggregations)?;

        let emitted = match cx.config().output_mode {
            OutputMode::Complete => aggregate,
            OutputMode::Update => touched_groups(aggregate, &input, &self.keys)?,
            OutputMode::Append => self.append.emit(aggregate, &input)?,
        };
        Ok(batch.with_data(emitted))
    }
}

impl std::fmt::Debug for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupBy")
            .field("keys", &self.keys)
            .field("aggregations", &self.aggregations)
            .finish_non_exhaustive()
    }
}

/// Rows of `aggregate` whose key appears in the current batch
fn touched_groups(
    aggregate: DataFrame,
    input: &DataFrame,
    keys: &[String],
) -> Result<DataFrame, EngineError> {
    let batch_keys = input
        .clone()
        .select(keys.iter().map(|k| column(k)).collect::<Vec<_>>())?
        .distinct()?
        .alias("batch_keys")?;
    let on = keys.iter().map(|k| same_key("aggregate", "batch_keys", k));
    Ok(aggregate
        .alias("aggregate")?
        .join_on(batch_keys, JoinType::LeftSemi, on)?)
}

// An unaliased aggregate over one column keeps that column's name, so
// `sum(col2)` comes out as `col2`. The default name stays when the column
// name is already an output, as in `count(id)` grouped by `id` or a second
// aggregate over the same column.
fn name_after_input(expr: Expr, taken: &HashSet<String>) -> Expr {
    if matches!(expr, Expr::Alias(_)) {
        return expr;
    }
    let single = {
        let refs = expr.column_refs();
        match refs.len() {
            1 => refs
                .into_iter()
                .next()
                .map(|c| c.name.clone())
                .filter(|name| !taken.contains(name)),
            _ => None,
        }
    };
    match single {
        Some(name) => expr.alias(name),
        None => expr,
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
