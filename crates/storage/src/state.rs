// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named state snapshots: whole tables replaced on every write

use crate::store::{quote, StateStore, StoreError, COMMIT_TABLE, SCHEMA_TABLE, WAL_TABLE};
use datafusion::arrow::array::{
    new_null_array, Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Float64Array, Int64Array,
    RecordBatch, StringArray,
};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use datafusion::arrow::error::ArrowError;
use rusqlite::{params, params_from_iter};
use rusqlite::types::Value;
use std::sync::Arc;
use tracing::debug;

/// A materialized table: the unit of state snapshots
#[derive(Debug, Clone)]
pub struct StateTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl StateTable {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_parts(self) -> (SchemaRef, Vec<RecordBatch>) {
        (self.schema, self.batches)
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

/// Storage class of a snapshot column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    BigInt,
    Double,
    Text,
    Boolean,
    Blob,
}

impl ColumnKind {
    /// Column kind holding values of `data_type`.
    ///
    /// Temporal types are stored as their integer representation. Values
    /// that may not fit a signed 64-bit integer or a double (`UInt64`,
    /// decimals) are stored as text. The exact Arrow type is recorded next
    /// to the snapshot and restored on read.
    fn for_arrow(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _)
            | DataType::Duration(_) => Some(ColumnKind::BigInt),
            DataType::Float16 | DataType::Float32 | DataType::Float64 => Some(ColumnKind::Double),
            DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Utf8View
            | DataType::UInt64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _)
            | DataType::Null => Some(ColumnKind::Text),
            DataType::Boolean => Some(ColumnKind::Boolean),
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => {
                Some(ColumnKind::Blob)
            }
            DataType::Dictionary(_, values) => Self::for_arrow(values),
            _ => None,
        }
    }

    /// Map a declared SQL type back to a column kind, following SQLite's
    /// affinity rules so tables created outside the store still read back.
    fn for_declared(declared: &str) -> Option<Self> {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("BOOL") {
            Some(ColumnKind::Boolean)
        } else if declared.contains("INT") {
            Some(ColumnKind::BigInt)
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
            Some(ColumnKind::Text)
        } else if declared.contains("BLOB") {
            Some(ColumnKind::Blob)
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| declared.contains(t)) {
            Some(ColumnKind::Double)
        } else {
            None
        }
    }

    fn declared(self) -> &'static str {
        match self {
            ColumnKind::BigInt => "BIGINT",
            ColumnKind::Double => "DOUBLE",
            ColumnKind::Text => "TEXT",
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::Blob => "BLOB",
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::BigInt => DataType::Int64,
            ColumnKind::Double => DataType::Float64,
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Boolean => DataType::Boolean,
            ColumnKind::Blob => DataType::Binary,
        }
    }

    /// Cast `array` of type `data_type` to this kind's storage type
    fn store(self, array: &ArrayRef, data_type: &DataType) -> Result<ArrayRef, ArrowError> {
        match data_type {
            DataType::Dictionary(_, values) => self.store(&cast(array, values)?, values),
            DataType::Date32 | DataType::Time32(_) => {
                cast(&cast(array, &DataType::Int32)?, &self.data_type())
            }
            _ => cast(array, &self.data_type()),
        }
    }

    /// Inverse of [`ColumnKind::store`]
    fn restore(array: &ArrayRef, data_type: &DataType) -> Result<ArrayRef, ArrowError> {
        match data_type {
            _ if array.data_type() == data_type => Ok(Arc::clone(array)),
            DataType::Null => Ok(new_null_array(data_type, array.len())),
            DataType::Dictionary(_, values) => cast(&Self::restore(array, values)?, data_type),
            DataType::Date32 | DataType::Time32(_) => {
                cast(&cast(array, &DataType::Int32)?, data_type)
            }
            _ => cast(array, data_type),
        }
    }

    fn encode(self, array: &ArrayRef, row: usize) -> Value {
        if array.is_null(row) {
            return Value::Null;
        }
        match self {
            ColumnKind::BigInt => Value::Integer(array.as_primitive::<Int64Type>().value(row)),
            ColumnKind::Double => Value::Real(array.as_primitive::<Float64Type>().value(row)),
            ColumnKind::Text => Value::Text(array.as_string::<i32>().value(row).to_string()),
            ColumnKind::Boolean => Value::Integer(i64::from(array.as_boolean().value(row))),
            ColumnKind::Blob => Value::Blob(array.as_binary::<i32>().value(row).to_vec()),
        }
    }

    fn decode(self, rows: &[Vec<Value>], index: usize) -> ArrayRef {
        let cells = rows.iter().map(|row| row.get(index));
        match self {
            ColumnKind::BigInt => Arc::new(
                cells
                    .map(|cell| match cell {
                        Some(Value::Integer(v)) => Some(*v),
                        Some(Value::Real(v)) => Some(*v as i64),
                        _ => None,
                    })
                    .collect::<Int64Array>(),
            ),
            ColumnKind::Double => Arc::new(
                cells
                    .map(|cell| match cell {
                        Some(Value::Integer(v)) => Some(*v as f64),
                        Some(Value::Real(v)) => Some(*v),
                        _ => None,
                    })
                    .collect::<Float64Array>(),
            ),
            ColumnKind::Text => Arc::new(
                cells
                    .map(|cell| match cell {
                        Some(Value::Text(v)) => Some(v.clone()),
                        Some(Value::Integer(v)) => Some(v.to_string()),
                        Some(Value::Real(v)) => Some(v.to_string()),
                        _ => None,
                    })
                    .collect::<StringArray>(),
            ),
            ColumnKind::Boolean => Arc::new(
                cells
                    .map(|cell| match cell {
                        Some(Value::Integer(v)) => Some(*v != 0),
                        _ => None,
                    })
                    .collect::<BooleanArray>(),
            ),
            ColumnKind::Blob => Arc::new(
                cells
                    .map(|cell| match cell {
                        Some(Value::Blob(v)) => Some(v.as_slice()),
                        Some(Value::Text(v)) => Some(v.as_bytes()),
                        _ => None,
                    })
                    .collect::<BinaryArray>(),
            ),
        }
    }
}

impl StateStore {
    /// Whether a snapshot table named `name` exists
    pub fn state_exists(&self, name: &str) -> Result<bool, StoreError> {
        validate_name(name)?;
        let count = self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get::<_, i64>(0),
            )
        })?;
        Ok(count > 0)
    }

    /// Read the snapshot named `name`
    pub fn read_state(&self, name: &str) -> Result<StateTable, StoreError> {
        if !self.state_exists(name)? {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let (columns, recorded, rows) = self.with_conn(|conn| {
            let mut info = conn.prepare(&format!("PRAGMA table_info({})", quote(name)))?;
            let columns = info
                .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut types = conn.prepare(&format!(
                "SELECT data_type FROM {SCHEMA_TABLE} WHERE state = ?1 ORDER BY position"
            ))?;
            let recorded = types
                .query_map([name], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let width = columns.len();
            let sql = format!("SELECT * FROM {} ORDER BY rowid", quote(name));
            let mut select = conn.prepare(&sql)?;
            let rows = select
                .query_map([], |row| {
                    (0..width)
                        .map(|i| row.get::<_, Value>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((columns, recorded, rows))
        })?;

        let kinds = columns
            .iter()
            .map(|(column, declared)| {
                ColumnKind::for_declared(declared).ok_or_else(|| StoreError::UnknownDeclaredType {
                    column: column.clone(),
                    declared: declared.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Tables written by the store carry their Arrow types; others are
        // read by declared type alone
        let data_types = if recorded.len() == columns.len() {
            recorded
                .iter()
                .map(|data_type| data_type.parse::<DataType>())
                .collect::<Result<Vec<_>, _>>()?
        } else {
            kinds.iter().map(|kind| kind.data_type()).collect()
        };

        let fields: Vec<Field> = columns
            .iter()
            .zip(&data_types)
            .map(|((column, _), data_type)| Field::new(column, data_type.clone(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));
        let arrays = kinds
            .iter()
            .zip(&data_types)
            .enumerate()
            .map(|(index, (kind, data_type))| {
                ColumnKind::restore(&kind.decode(&rows, index), data_type)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;

        debug!(name, rows = batch.num_rows(), "read state snapshot");
        Ok(StateTable::new(schema, vec![batch]))
    }

    /// Atomically replace the snapshot named `name` with `table`
    pub fn write_state(&self, name: &str, table: &StateTable) -> Result<(), StoreError> {
        validate_name(name)?;

        let columns = table
            .schema()
            .fields()
            .iter()
            .map(|field| {
                ColumnKind::for_arrow(field.data_type())
                    .map(|kind| (field.name().clone(), field.data_type().clone(), kind))
                    .ok_or_else(|| StoreError::UnsupportedColumnType {
                        column: field.name().clone(),
                        data_type: field.data_type().clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(table.num_rows());
        for batch in table.batches() {
            let arrays = columns
                .iter()
                .enumerate()
                .map(|(index, (_, data_type, kind))| kind.store(batch.column(index), data_type))
                .collect::<Result<Vec<_>, _>>()?;
            for row in 0..batch.num_rows() {
                rows.push(
                    arrays
                        .iter()
                        .zip(&columns)
                        .map(|(array, (_, _, kind))| kind.encode(array, row))
                        .collect(),
                );
            }
        }

        let definitions = columns
            .iter()
            .map(|(column, _, kind)| format!("{} {}", quote(column), kind.declared()))
            .collect::<Vec<_>>()
            .join(", ");
        let names = columns
            .iter()
            .map(|(column, _, _)| quote(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let table_name = quote(name);

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(&format!("DROP TABLE IF EXISTS {table_name}"), [])?;
            tx.execute(&format!("CREATE TABLE {table_name} ({definitions})"), [])?;
            tx.execute(&format!("DELETE FROM {SCHEMA_TABLE} WHERE state = ?1"), [name])?;
            {
                let mut record = tx.prepare(&format!(
                    "INSERT INTO {SCHEMA_TABLE} (state, position, data_type) VALUES (?1, ?2, ?3)"
                ))?;
                for (position, (_, data_type, _)) in columns.iter().enumerate() {
                    let position = position as i64;
                    record.execute(params![name, position, data_type.to_string()])?;
                }
                let mut insert = tx.prepare(&format!(
                    "INSERT INTO {table_name} ({names}) VALUES ({placeholders})"
                ))?;
                for row in &rows {
                    insert.execute(params_from_iter(row.iter()))?;
                }
            }
            tx.commit()
        })?;

        debug!(name, rows = rows.len(), "wrote state snapshot");
        Ok(())
    }

    /// Remove the snapshot named `name`; returns whether it existed
    pub fn drop_state(&self, name: &str) -> Result<bool, StoreError> {
        let existed = self.state_exists(name)?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(&format!("DROP TABLE IF EXISTS {}", quote(name)), [])?;
            tx.execute(&format!("DELETE FROM {SCHEMA_TABLE} WHERE state = ?1"), [name])?;
            tx.commit()
        })?;
        if existed {
            debug!(name, "dropped state snapshot");
        }
        Ok(existed)
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with("sqlite_")
        && name != WAL_TABLE
        && name != COMMIT_TABLE
        && name != SCHEMA_TABLE;
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidStateName(name.to_string()))
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
