use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{QueryRows, TableRef, Warehouse};

/// `SELECT COUNT(DISTINCT id) AS matching_users FROM t WHERE clause`
pub fn count_query_sql(id_column: &str, table: &TableRef, filter_clause: &str) -> String {
    format!(
        "SELECT COUNT(DISTINCT {}) AS matching_users FROM {} WHERE {}",
        id_column,
        table.sql_ref(),
        filter_clause
    )
}

/// `SELECT` of a few backticked columns, used to ground the judge prompt
pub fn preview_query_sql(columns: &[&str], table: &TableRef, limit: usize) -> String {
    let cols = columns
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {} LIMIT {}", cols, table.sql_ref(), limit)
}

/// Count distinct ids matching `filter_clause`.
///
/// Fail-soft: any execution error or unreadable result yields `None`, so a
/// bad clause degrades the result instead of failing the request.
pub async fn count_matches(
    warehouse: &dyn Warehouse,
    filter_clause: &str,
    id_column: &str,
    table: &TableRef,
) -> Option<u64> {
    let sql = count_query_sql(id_column, table, filter_clause);
    debug!(target: "warehouse", %sql, "Counting matching users");

    let rows = match warehouse.query(&sql).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(target: "warehouse", error = %e, "Count query failed");
            return None;
        }
    };
    let count = rows.first_value("matching_users").and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    });
    if count.is_none() {
        warn!(target: "warehouse", rows = rows.len(), "Count query returned no usable value");
    }
    count
}

/// Result of a query run under a byte ceiling.
///
/// Errors are data here: callers show whatever comes back to an end user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum BoundedQueryOutcome {
    Rows(QueryRows),
    OverBudget { max_bytes: u64, estimated_bytes: u64 },
    Failed(String),
}

impl BoundedQueryOutcome {
    pub fn rows(&self) -> Option<&QueryRows> {
        match self {
            BoundedQueryOutcome::Rows(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for BoundedQueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundedQueryOutcome::Rows(rows) => write!(f, "{} row(s)", rows.len()),
            BoundedQueryOutcome::OverBudget {
                max_bytes,
                estimated_bytes,
            } => write!(
                f,
                "Query exceeds the {} byte limit (estimated: {} bytes).",
                max_bytes, estimated_bytes
            ),
            BoundedQueryOutcome::Failed(msg) => write!(
                f,
                "There was a problem executing the generated SQL query. Error: {}",
                msg
            ),
        }
    }
}

/// Dry-run `sql`, then execute it only if it scans at most `max_bytes`
pub async fn run_bounded_query(warehouse: &dyn Warehouse, sql: &str, max_bytes: u64) -> BoundedQueryOutcome {
    let estimated_bytes = match warehouse.dry_run(sql).await {
        Ok(b) => b,
        Err(e) => {
            warn!(target: "warehouse", error = %e, "Dry run failed");
            return BoundedQueryOutcome::Failed(e.to_string());
        }
    };

    if estimated_bytes > max_bytes {
        info!(
            target: "warehouse",
            estimated_bytes,
            max_bytes,
            "Refusing query over byte ceiling"
        );
        return BoundedQueryOutcome::OverBudget {
            max_bytes,
            estimated_bytes,
        };
    }

    match warehouse.query(sql).await {
        Ok(rows) => BoundedQueryOutcome::Rows(rows),
        Err(e) => {
            warn!(target: "warehouse", error = %e, "Bounded query failed");
            BoundedQueryOutcome::Failed(e.to_string())
        }
    }
}
