// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Moving tables between lazy frames and materialized snapshots

use brook_storage::StateTable;
use datafusion::datasource::MemTable;
use datafusion::error::Result;
use datafusion::prelude::{DataFrame, SessionContext};
use std::sync::Arc;

/// Execute `df` and keep its rows in memory
pub(crate) async fn materialize(df: DataFrame) -> Result<StateTable> {
    let planned = Arc::clone(df.schema().inner());
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or(planned);
    Ok(StateTable::new(schema, batches))
}

/// Lazy frame over a materialized table; empty tables keep their schema
pub(crate) fn frame(session: &SessionContext, table: StateTable) -> Result<DataFrame> {
    let (schema, batches) = table.into_parts();
    let provider = MemTable::try_new(schema, vec![batches])?;
    session.read_table(Arc::new(provider))
}
