// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Column expressions supplied by users of the pipeline

use datafusion::common::tree_node::{Transformed, TreeNode};
use datafusion::common::Column;
use datafusion::error::Result;
use datafusion::logical_expr::{binary_expr, Operator};
use datafusion::prelude::{DataFrame, Expr, SessionContext};

/// An expression over the columns of a micro-batch.
///
/// Built either directly from a DataFusion [`Expr`] or from SQL text. SQL
/// text is parsed against the schema of the batch it is applied to, so a
/// job file can name columns that only exist once earlier operators ran.
#[derive(Debug, Clone)]
pub enum ColumnExpr {
    Expr(Expr),
    Sql { sql: String, alias: Option<String> },
}

impl ColumnExpr {
    pub fn sql(sql: impl Into<String>) -> Self {
        ColumnExpr::Sql {
            sql: sql.into(),
            alias: None,
        }
    }

    /// Name the expression's output column
    pub fn alias(self, name: impl Into<String>) -> Self {
        match self {
            ColumnExpr::Expr(expr) => ColumnExpr::Expr(expr.alias(name.into())),
            ColumnExpr::Sql { sql, .. } => ColumnExpr::Sql {
                sql,
                alias: Some(name.into()),
            },
        }
    }

    /// Resolve to a DataFusion expression against `df`'s schema
    pub fn resolve(&self, session: &SessionContext, df: &DataFrame) -> Result<Expr> {
        match self {
            ColumnExpr::Expr(expr) => Ok(expr.clone()),
            ColumnExpr::Sql { sql, alias } => {
                let expr = unqualify(session.parse_sql_expr(sql, df.schema())?)?;
                Ok(match alias {
                    Some(name) => expr.alias(name.as_str()),
                    None => expr,
                })
            }
        }
    }
}

impl From<Expr> for ColumnExpr {
    fn from(expr: Expr) -> Self {
        ColumnExpr::Expr(expr)
    }
}

/// Unqualified column reference by name
pub fn column(name: &str) -> Expr {
    Expr::Column(Column::from_name(name))
}

/// Column reference qualified by a frame alias
fn qualified(relation: &str, name: &str) -> Expr {
    Expr::Column(Column::new(Some(relation), name))
}

/// Join condition on key `name` between two aliased frames; nulls match
pub(crate) fn same_key(left: &str, right: &str, name: &str) -> Expr {
    binary_expr(
        qualified(left, name),
        Operator::IsNotDistinctFrom,
        qualified(right, name),
    )
}

// Parsed SQL carries the qualifier of the frame it was parsed against; the
// same expression is later applied to unions and state frames.
fn unqualify(expr: Expr) -> Result<Expr> {
    let stripped = expr.transform(|e| match e {
        Expr::Column(c) if c.relation.is_some() => Ok(Transformed::yes(Expr::Column(
            Column::new_unqualified(c.name),
        ))),
        other => Ok(Transformed::no(other)),
    })?;
    Ok(stripped.data)
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
