// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deduplication by key across the whole stream

use crate::context::ExecContext;
use crate::error::EngineError;
use crate::expr::{column, same_key};
use crate::table::{frame, materialize};
use brook_core::MicroBatch;
use datafusion::logical_expr::JoinType;
use datafusion::prelude::Expr;
use tracing::debug;

/// Snapshot holding every key seen so far
pub const DROP_DUPLICATES_STATE: &str = "drop_duplicates";

/// Drops rows whose key was already seen, in this batch or any earlier one.
///
/// Within one batch an arbitrary row survives per key.
#[derive(Debug, Clone)]
pub struct DropDuplicates {
    keys: Vec<String>,
}

impl DropDuplicates {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
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

        let key_exprs: Vec<Expr> = self.keys.iter().map(|k| column(k)).collect();
        let all_columns: Vec<Expr> = input
            .schema()
            .fields()
            .iter()
            .map(|f| column(f.name()))
            .collect();
        let unique = materialize(input.distinct_on(key_exprs.clone(), all_columns, None)?).await?;
        let unique = frame(session, unique)?;

        let (survivors, seen_keys) = if store.state_exists(DROP_DUPLICATES_STATE)? {
            let seen = frame(session, store.read_state(DROP_DUPLICATES_STATE)?)?;
            let on = self.keys.iter().map(|k| same_key("batch", "seen", k));
            let survivors = unique
                .clone()
                .alias("batch")?
                .join_on(seen.clone().alias("seen")?, JoinType::LeftAnti, on)?;
            let keys = seen.union(unique.select(key_exprs)?)?.distinct()?;
            (survivors, keys)
        } else {
            let keys = unique.clone().select(key_exprs)?.distinct()?;
            (unique, keys)
        };

        let seen_keys = materialize(seen_keys).await?;
        store.write_state(DROP_DUPLICATES_STATE, &seen_keys)?;
        debug!(keys = seen_keys.num_rows(), "drop_duplicates state written");

        Ok(batch.with_data(survivors))
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
