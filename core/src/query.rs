//! Group aggregates over a stat table with DataFusion.
//!
//! The table is registered as an in-memory `player_stats` relation. Every
//! Float64 column is averaged per group, nulls ignored.

use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, LargeStringArray, StringArray, StringViewArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::error::DataFusionError;
use datafusion::prelude::*;
use thiserror::Error;

use crate::table::StatTable;
use fightstats_types::GroupBy;

const TABLE: &str = "player_stats";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),

    #[error("result column {index}: expected {expected}, got {actual}")]
    ColumnType {
        index: usize,
        expected: &'static str,
        actual: DataType,
    },
}

/// Mean of every stat column for one group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMean {
    pub group: String,
    pub rows: i64,
    /// `(column, mean)` in table column order. `None` when the group has
    /// no value for that column.
    pub means: Vec<(String, Option<f64>)>,
}

impl GroupMean {
    pub fn mean(&self, column: &str) -> Option<f64> {
        self.means
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, mean)| *mean)
    }
}

/// Quote a column name for SQL (`a"b` -> `"a""b"`)
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ─────────────────────────────────────────────────────────────────────────────
// Column Extractors
// ─────────────────────────────────────────────────────────────────────────────

fn col_strings(batch: &RecordBatch, index: usize) -> Result<Vec<String>, QueryError> {
    let col = batch.column(index);
    if let Some(a) = col.as_any().downcast_ref::<StringArray>() {
        return Ok(a.iter().map(|v| v.unwrap_or_default().to_string()).collect());
    }
    if let Some(a) = col.as_any().downcast_ref::<StringViewArray>() {
        return Ok(a.iter().map(|v| v.unwrap_or_default().to_string()).collect());
    }
    if let Some(a) = col.as_any().downcast_ref::<LargeStringArray>() {
        return Ok(a.iter().map(|v| v.unwrap_or_default().to_string()).collect());
    }
    Err(QueryError::ColumnType {
        index,
        expected: "string",
        actual: col.data_type().clone(),
    })
}

fn col_i64(batch: &RecordBatch, index: usize) -> Result<Vec<i64>, QueryError> {
    let col = batch.column(index);
    match col.as_any().downcast_ref::<Int64Array>() {
        Some(a) => Ok(a.iter().map(Option::unwrap_or_default).collect()),
        None => Err(QueryError::ColumnType {
            index,
            expected: "int64",
            actual: col.data_type().clone(),
        }),
    }
}

fn col_opt_f64(batch: &RecordBatch, index: usize) -> Result<Vec<Option<f64>>, QueryError> {
    let col = batch.column(index);
    match col.as_any().downcast_ref::<Float64Array>() {
        Some(a) => Ok(a.iter().collect()),
        None => Err(QueryError::ColumnType {
            index,
            expected: "float64",
            actual: col.data_type().clone(),
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Executor
// ─────────────────────────────────────────────────────────────────────────────

pub struct GroupQuery {
    ctx: SessionContext,
}

impl Default for GroupQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupQuery {
    pub fn new() -> Self {
        Self {
            ctx: SessionContext::new(),
        }
    }

    /// Replace the registered table with `table`
    pub fn register(&self, table: &StatTable) -> Result<(), QueryError> {
        let batch = table.batch().clone();
        let mem_table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        self.ctx.deregister_table(TABLE)?;
        self.ctx.register_table(TABLE, Arc::new(mem_table))?;
        Ok(())
    }

    async fn sql(&self, query: &str) -> Result<Vec<RecordBatch>, QueryError> {
        let df = self.ctx.sql(query).await?;
        Ok(df.collect().await?)
    }

    /// Per-group row count and column means, ordered by group key
    pub async fn group_means(&self, group_by: GroupBy) -> Result<Vec<GroupMean>, QueryError> {
        let schema = self.ctx.table_provider(TABLE).await?.schema();
        let stat_columns: Vec<String> = schema
            .fields()
            .iter()
            .filter(|f| f.data_type() == &DataType::Float64)
            .map(|f| f.name().clone())
            .collect();

        let group = quote_ident(group_by.column());
        let mut select = vec![format!("{group} AS grp"), "COUNT(*) AS row_count".to_string()];
        select.extend(
            stat_columns
                .iter()
                .enumerate()
                .map(|(i, name)| format!("AVG({}) AS m{i}", quote_ident(name))),
        );

        let batches = self
            .sql(&format!(
                "SELECT {} FROM {TABLE} GROUP BY {group} ORDER BY {group}",
                select.join(", ")
            ))
            .await?;

        let mut results = Vec::new();
        for batch in &batches {
            let groups = col_strings(batch, 0)?;
            let counts = col_i64(batch, 1)?;
            let means = (0..stat_columns.len())
                .map(|i| col_opt_f64(batch, i + 2))
                .collect::<Result<Vec<_>, _>>()?;

            for row in 0..batch.num_rows() {
                results.push(GroupMean {
                    group: groups[row].clone(),
                    rows: counts[row],
                    means: stat_columns
                        .iter()
                        .zip(&means)
                        .map(|(name, values)| (name.clone(), values[row]))
                        .collect(),
                });
            }
        }
        tracing::debug!(group_by = group_by.column(), groups = results.len(), "Computed group means");
        Ok(results)
    }
}
