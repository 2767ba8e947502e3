//! Warehouse access: the query seam, result rows, and the bounded executors
//!
//! - `Warehouse`: dry runs, queries and row appends (BigQuery in production)
//! - `QueryRows`: materialised tabular results with record/column views
//! - `count_matches` / `run_bounded_query`: fail-soft executors built on top

mod bigquery;
mod bounded;

pub use bigquery::{decode_query_response, BigQueryClient, BigQueryConfig};
pub use bounded::{
    count_matches, count_query_sql, preview_query_sql, run_bounded_query, BoundedQueryOutcome,
};

use crate::{AudienceError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// SQL warehouse operations the agent relies on
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Bytes the query would scan, without running it
    async fn dry_run(&self, sql: &str) -> Result<u64>;

    /// Run the query and materialise every row
    async fn query(&self, sql: &str) -> Result<QueryRows>;

    /// Append JSON rows to a table
    async fn append_rows(&self, table: &TableRef, rows: Vec<Value>) -> Result<()>;
}

/// `project.dataset.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_name: String,
}

impl TableRef {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_name: table_name.into(),
        }
    }

    /// Backtick-quoted identifier for use in Standard SQL
    pub fn sql_ref(&self) -> String {
        format!("`{}`", self)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_name)
    }
}

impl FromStr for TableRef {
    type Err = AudienceError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().trim_matches('`').split('.').collect();
        match parts.as_slice() {
            [p, d, t] if !p.is_empty() && !d.is_empty() && !t.is_empty() => {
                Ok(Self::new(*p, *d, *t))
            }
            _ => Err(AudienceError::Config(format!(
                "table reference must look like project.dataset.table, got '{s}'"
            ))),
        }
    }
}

/// Rows returned by a query, column names in select order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }

    /// Value of `column` in the first row
    pub fn first_value(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.first()?.get(idx)
    }

    /// One JSON object per row
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }

    /// Same rows with every cell rendered as a string (`null` as `None`)
    pub fn stringified(&self) -> QueryRows {
        let rows = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| Value::String(cell_to_string(v))).collect())
            .collect();
        QueryRows::new(self.columns.clone(), rows)
    }
}

fn cell_to_string(v: &Value) -> String {
    match v {
        Value::Null => "None".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
