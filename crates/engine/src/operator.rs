// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operators applied to each micro-batch in pipeline order

use crate::aggregate::GroupBy;
use crate::context::ExecContext;
use crate::dedup::DropDuplicates;
use crate::error::EngineError;
use crate::expr::ColumnExpr;
use brook_core::MicroBatch;

/// One step of a pipeline.
///
/// `WithColumns`, `Select` and `Filter` are pure: their output depends only
/// on the incoming batch. `GroupBy` and `DropDuplicates` carry state across
/// batches through the state store.
pub enum Operator {
    WithColumns(Vec<ColumnExpr>),
    Select(Vec<ColumnExpr>),
    Filter(ColumnExpr),
    GroupBy(GroupBy),
    DropDuplicates(DropDuplicates),
}

impl Operator {
    pub fn name(&self) -> &'static str {
        match self {
            Operator::WithColumns(_) => "with_columns",
            Operator::Select(_) => "select",
            Operator::Filter(_) => "filter",
            Operator::GroupBy(_) => "group_by",
            Operator::DropDuplicates(_) => "drop_duplicates",
        }
    }

    pub async fn apply(
        &mut self,
        batch: MicroBatch,
        cx: &ExecContext,
    ) -> Result<MicroBatch, EngineError> {
        match self {
            Operator::WithColumns(exprs) => {
                let mut df = batch.data().clone();
                for expr in exprs.iter() {
                    let expr = expr.resolve(cx.session(), &df)?;
                    let name = expr.schema_name().to_string();
                    df = df.with_column(&name, expr.unalias())?;
                }
                Ok(batch.with_data(df))
            }
            Operator::Select(exprs) => {
                let df = batch.data().clone();
                let exprs = exprs
                    .iter()
                    .map(|expr| expr.resolve(cx.session(), &df))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(batch.with_data(df.select(exprs)?))
            }
            Operator::Filter(predicate) => {
                let df = batch.data().clone();
                let predicate = predicate.resolve(cx.session(), &df)?;
                Ok(batch.with_data(df.filter(predicate)?))
            }
            Operator::GroupBy(group_by) => group_by.apply(batch, cx).await,
            Operator::DropDuplicates(dedup) => dedup.apply(batch, cx).await,
        }
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "operator_tests.rs"]
mod tests;
