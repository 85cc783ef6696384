// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::source::BatchStream;
use crate::testing::{collect_int_rows, context_at, csv_micro_batch, int_batch, MemorySource};
use datafusion::arrow::array::AsArray;
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{DataType, Int64Type};
use datafusion::functions_aggregate::expr_fn::{count, max, sum};
use std::sync::Arc;
use tempfile::TempDir;

type Rows = Vec<Vec<Option<i64>>>;

fn rows(values: &[(i64, i64)]) -> Rows {
    values.iter().map(|(k, v)| vec![Some(*k), Some(*v)]).collect()
}

fn setup(mode: OutputMode) -> (TempDir, ExecContext) {
    let dir = tempfile::tempdir().unwrap();
    let cx = context_at(&dir.path().join("checkpoint"), mode).unwrap();
    (dir, cx)
}

/// Both batches through a memory source, logged to the WAL like real units
async fn batches(cx: &ExecContext) -> (MicroBatch, MicroBatch) {
    let mut source = MemorySource::new()
        .unit(
            "batch-1",
            int_batch(&[("id", vec![1, 2, 2]), ("col2", vec![4, 5, 5])]).unwrap(),
        )
        .unit(
            "batch-2",
            int_batch(&[("id", vec![2, 8, 9]), ("col2", vec![5, 11, 12])]).unwrap(),
        );
    let first = source.next_batch(cx).await.unwrap().unwrap();
    let second = source.next_batch(cx).await.unwrap().unwrap();
    (first, second)
}

fn sum_by_id() -> GroupBy {
    GroupBy::new(vec!["id".to_string()], vec![sum(column("col2")).into()])
}

#[tokio::test]
async fn complete_mode_emits_every_group_ever_seen() {
    let (_dir, cx) = setup(OutputMode::Complete);
    let (first, second) = batches(&cx).await;
    let mut group_by = sum_by_id();

    let out = group_by.apply(first, &cx).await.unwrap();
    assert_eq!(collect_int_rows(out.into_data()).await.unwrap(), rows(&[(1, 4), (2, 10)]));

    let out = group_by.apply(second, &cx).await.unwrap();
    assert_eq!(
        collect_int_rows(out.into_data()).await.unwrap(),
        rows(&[(1, 4), (2, 15), (8, 11), (9, 12)])
    );
}

#[tokio::test]
async fn update_mode_emits_only_groups_in_the_current_batch() {
    let (_dir, cx) = setup(OutputMode::Update);
    let (first, second) = batches(&cx).await;
    let mut group_by = sum_by_id();

    let out = group_by.apply(first, &cx).await.unwrap();
    assert_eq!(collect_int_rows(out.into_data()).await.unwrap(), rows(&[(1, 4), (2, 10)]));

    let out = group_by.apply(second, &cx).await.unwrap();
    assert_eq!(
        collect_int_rows(out.into_data()).await.unwrap(),
        rows(&[(2, 15), (8, 11), (9, 12)])
    );
}

#[tokio::test]
async fn sql_aggregations_match_expression_aggregations() {
    let (_dir, cx) = setup(OutputMode::Update);
    let (first, second) = batches(&cx).await;
    let mut group_by = GroupBy::new(vec!["id".to_string()], vec![ColumnExpr::sql("sum(col2)")]);

    group_by.apply(first, &cx).await.unwrap();
    let out = group_by.apply(second, &cx).await.unwrap();

    assert_eq!(
        collect_int_rows(out.into_data()).await.unwrap(),
        rows(&[(2, 15), (8, 11), (9, 12)])
    );
}

#[tokio::test]
async fn output_columns_are_named_after_inputs_or_aliases() {
    let (_dir, cx) = setup(OutputMode::Complete);
    let (first, second) = batches(&cx).await;

    let out = sum_by_id().apply(first, &cx).await.unwrap();
    let names: Vec<_> = out.data().schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["id", "col2"]);

    let mut aliased = GroupBy::new(
        vec!["id".to_string()],
        vec![ColumnExpr::sql("sum(col2)").alias("total")],
    );
    let out = aliased.apply(second, &cx).await.unwrap();
    let names: Vec<_> = out.data().schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["id", "total"]);
}

#[tokio::test]
async fn state_holds_the_whole_history() {
    let (_dir, cx) = setup(OutputMode::Complete);
    let (first, second) = batches(&cx).await;
    let mut group_by = sum_by_id();

    assert!(!cx.store().state_exists(GROUP_BY_STATE).unwrap());
    group_by.apply(first, &cx).await.unwrap();
    assert_eq!(cx.store().read_state(GROUP_BY_STATE).unwrap().num_rows(), 3);
    group_by.apply(second, &cx).await.unwrap();
    assert_eq!(cx.store().read_state(GROUP_BY_STATE).unwrap().num_rows(), 6);
}

#[tokio::test]
async fn append_mode_without_policy_emits_nothing_but_keeps_state() {
    let (_dir, cx) = setup(OutputMode::Append);
    let (first, _) = batches(&cx).await;

    let out = sum_by_id().apply(first, &cx).await.unwrap();

    assert!(collect_int_rows(out.into_data()).await.unwrap().is_empty());
    assert_eq!(cx.store().read_state(GROUP_BY_STATE).unwrap().num_rows(), 3);
}

struct EmitGroupsAbove(i64);

impl AppendPolicy for EmitGroupsAbove {
    fn emit(&mut self, aggregate: DataFrame, _batch: &DataFrame) -> Result<DataFrame, EngineError> {
        use datafusion::prelude::lit;
        Ok(aggregate.filter(column("id").gt(lit(self.0)))?)
    }
}

#[tokio::test]
async fn append_mode_defers_to_the_policy() {
    let (_dir, cx) = setup(OutputMode::Append);
    let (first, second) = batches(&cx).await;
    let mut group_by = sum_by_id().with_append_policy(EmitGroupsAbove(5));

    let out = group_by.apply(first, &cx).await.unwrap();
    assert!(collect_int_rows(out.into_data()).await.unwrap().is_empty());

    let out = group_by.apply(second, &cx).await.unwrap();
    assert_eq!(collect_int_rows(out.into_data()).await.unwrap(), rows(&[(8, 11), (9, 12)]));
}

#[tokio::test]
async fn replayed_batch_is_counted_twice() {
    let (_dir, cx) = setup(OutputMode::Complete);
    let (first, _) = batches(&cx).await;
    let mut group_by = sum_by_id();

    group_by.apply(first.clone(), &cx).await.unwrap();
    let out = group_by.apply(first, &cx).await.unwrap();

    assert_eq!(collect_int_rows(out.into_data()).await.unwrap(), rows(&[(1, 8), (2, 20)]));
}

#[tokio::test]
async fn output_shares_the_input_metadata() {
    let (_dir, cx) = setup(OutputMode::Complete);
    let (first, _) = batches(&cx).await;
    let metadata = Arc::clone(first.metadata());

    let out = sum_by_id().apply(first, &cx).await.unwrap();

    assert!(Arc::ptr_eq(out.metadata(), &metadata));
}

#[tokio::test]
async fn state_survives_a_new_operator_on_the_same_store() {
    let (_dir, cx) = setup(OutputMode::Complete);
    let (first, second) = batches(&cx).await;

    sum_by_id().apply(first, &cx).await.unwrap();
    let out = sum_by_id().apply(second, &cx).await.unwrap();

    assert_eq!(
        collect_int_rows(out.into_data()).await.unwrap(),
        rows(&[(1, 4), (2, 15), (8, 11), (9, 12)])
    );
}

/// `(day as text, amount)` pairs, sorted
async fn day_totals(batch: MicroBatch) -> Vec<(String, i64)> {
    let batches = batch.into_data().collect().await.unwrap();
    let mut totals = Vec::new();
    for batch in &batches {
        let days = cast(batch.column(0), &DataType::Utf8).unwrap();
        let amounts = cast(batch.column(1), &DataType::Int64).unwrap();
        for row in 0..batch.num_rows() {
            totals.push((
                days.as_string::<i32>().value(row).to_string(),
                amounts.as_primitive::<Int64Type>().value(row),
            ));
        }
    }
    totals.sort();
    totals
}

#[tokio::test]
async fn date_keys_survive_the_snapshot() {
    let (dir, cx) = setup(OutputMode::Update);
    let first = csv_micro_batch(
        &cx,
        &dir.path().join("first.csv"),
        "day,amount\n2024-01-01,4\n2024-01-02,5\n2024-01-01,1\n",
    )
    .await
    .unwrap();
    let second = csv_micro_batch(
        &cx,
        &dir.path().join("second.csv"),
        "day,amount\n2024-01-02,7\n2024-01-03,2\n",
    )
    .await
    .unwrap();
    let mut group_by =
        GroupBy::new(vec!["day".to_string()], vec![sum(column("amount")).into()]);

    let out = group_by.apply(first, &cx).await.unwrap();
    assert_eq!(out.data().schema().field(0).data_type(), &DataType::Date32);
    assert_eq!(
        day_totals(out).await,
        vec![("2024-01-01".to_string(), 5), ("2024-01-02".to_string(), 5)]
    );

    let out = group_by.apply(second, &cx).await.unwrap();
    assert_eq!(
        day_totals(out).await,
        vec![("2024-01-02".to_string(), 12), ("2024-01-03".to_string(), 2)]
    );
    let state = cx.store().read_state(GROUP_BY_STATE).unwrap();
    assert_eq!(state.schema().field(0).data_type(), &DataType::Date32);
}

#[tokio::test]
async fn input_names_are_not_reused() {
    let (_dir, cx) = setup(OutputMode::Complete);
    let (first, second) = batches(&cx).await;

    let mut two_over_one_column = GroupBy::new(
        vec!["id".to_string()],
        vec![sum(column("col2")).into(), max(column("col2")).into()],
    );
    let out = two_over_one_column.apply(first, &cx).await.unwrap();
    let names: Vec<_> = out.data().schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["id", "col2", "max(col2)"]);
    assert_eq!(
        collect_int_rows(out.into_data()).await.unwrap(),
        vec![vec![Some(1), Some(4), Some(4)], vec![Some(2), Some(10), Some(5)]]
    );

    let mut count_keys = GroupBy::new(vec!["id".to_string()], vec![count(column("id")).into()]);
    let out = count_keys.apply(second, &cx).await.unwrap();
    let names: Vec<_> = out.data().schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["id", "count(id)"]);
}
