use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{QueryRows, TableRef, Warehouse};
use crate::{AudienceError, Result};

/// Configuration for BigQueryClient
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// Project that is billed for, and runs, the query jobs
    pub project_id: String,
    pub access_token: Option<String>,
    pub request_timeout_ms: u64,
    /// How many times to poll an incomplete job before giving up
    pub max_polls: u32,
    pub base_url: String,
}

impl BigQueryConfig {
    pub fn new(project_id: impl Into<String>, access_token: Option<String>, request_timeout_ms: u64) -> Self {
        Self {
            project_id: project_id.into(),
            access_token,
            request_timeout_ms,
            max_polls: 30,
            base_url: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
        }
    }

    /// `timeoutMs` sent to BigQuery; stays below the HTTP timeout so an
    /// unfinished job comes back as `jobComplete: false` instead of a dropped request
    pub fn server_wait_ms(&self) -> u64 {
        (self.request_timeout_ms / 2).min(10_000)
    }
}

/// BigQuery over the v2 REST API (`jobs.query`, `jobs.getQueryResults`, `tabledata.insertAll`)
#[derive(Clone)]
pub struct BigQueryClient {
    http: Client,
    cfg: BigQueryConfig,
}

impl BigQueryClient {
    pub fn new(cfg: BigQueryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| AudienceError::Config(format!("Failed to build BigQuery client: {e}")))?;
        Ok(Self { http, cfg })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let req = match &self.cfg.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req
            .send()
            .await
            .map_err(|e| AudienceError::Query(format!("{what} HTTP error: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(target: "warehouse", %status, body = %body, "{} failed", what);
            return Err(AudienceError::Query(format!(
                "{what} error: status={status} body={body}"
            )));
        }
        let val: Value = resp
            .json()
            .await
            .map_err(|e| AudienceError::Query(format!("Failed to parse {what} JSON: {e}")))?;
        if let Some(err) = val.get("errors").and_then(|e| e.as_array()).filter(|e| !e.is_empty()) {
            return Err(AudienceError::Query(format!("{what} reported errors: {}", Value::Array(err.clone()))));
        }
        Ok(val)
    }

    async fn jobs_query(&self, sql: &str, dry_run: bool) -> Result<Value> {
        let url = self.url(&format!("projects/{}/queries", self.cfg.project_id));
        debug!(target: "warehouse", dry_run, "POST {}", url);
        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "dryRun": dry_run,
            "useQueryCache": !dry_run,
            "timeoutMs": self.cfg.server_wait_ms(),
        });
        self.send(self.http.post(&url).json(&body), "jobs.query").await
    }

    async fn get_query_results(&self, job: &Value, page_token: Option<&str>) -> Result<Value> {
        let job_id = job
            .get("jobId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AudienceError::Query("query response carries no jobId".into()))?;
        let url = self.url(&format!("projects/{}/queries/{}", self.cfg.project_id, job_id));
        let mut params: Vec<(&str, String)> = vec![("timeoutMs", self.cfg.server_wait_ms().to_string())];
        if let Some(loc) = job.get("location").and_then(|v| v.as_str()) {
            params.push(("location", loc.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.send(self.http.get(&url).query(&params), "jobs.getQueryResults").await
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn dry_run(&self, sql: &str) -> Result<u64> {
        let val = self.jobs_query(sql, true).await?;
        parse_i64_field(&val, "totalBytesProcessed")
            .map(|b| b.max(0) as u64)
            .ok_or_else(|| AudienceError::Query("dry run returned no totalBytesProcessed".into()))
    }

    async fn query(&self, sql: &str) -> Result<QueryRows> {
        let first = self.jobs_query(sql, false).await?;
        let job = first.get("jobReference").cloned().unwrap_or(Value::Null);
        collect_pages(first, self.cfg.max_polls, |token| {
            let job = &job;
            async move { self.get_query_results(job, token.as_deref()).await }
        })
        .await
    }

    async fn append_rows(&self, table: &TableRef, rows: Vec<Value>) -> Result<()> {
        let url = self.url(&format!(
            "projects/{}/datasets/{}/tables/{}/insertAll",
            table.project_id, table.dataset_id, table.table_name
        ));
        let body = json!({
            "rows": rows.into_iter().map(|r| json!({"json": r})).collect::<Vec<_>>(),
        });
        let val = self
            .send(self.http.post(&url).json(&body), "tabledata.insertAll")
            .await?;
        match val.get("insertErrors").and_then(|v| v.as_array()) {
            Some(errs) if !errs.is_empty() => {
                warn!(target: "warehouse", %table, errors = errs.len(), "insertAll rejected rows");
                Err(AudienceError::Query(format!(
                    "insertAll into {table} rejected rows: {}",
                    Value::Array(errs.clone())
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Poll an unfinished job until `jobComplete`, then follow `pageToken`s.
///
/// `fetch(None)` re-polls the job; `fetch(Some(token))` reads the next page.
async fn collect_pages<F, Fut>(mut page: Value, max_polls: u32, mut fetch: F) -> Result<QueryRows>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let mut polls = 0;
    while !page.get("jobComplete").and_then(|v| v.as_bool()).unwrap_or(false) {
        polls += 1;
        if polls > max_polls {
            return Err(AudienceError::Query(format!(
                "query job did not complete after {} polls",
                max_polls
            )));
        }
        debug!(target: "warehouse", polls, "Query job still running");
        page = fetch(None).await?;
    }

    let mut result = decode_query_response(&page)?;
    while let Some(token) = page.get("pageToken").and_then(|v| v.as_str()).map(str::to_string) {
        page = fetch(Some(token)).await?;
        result.rows.extend(decode_query_response(&page)?.rows);
    }
    Ok(result)
}

fn parse_i64_field(v: &Value, key: &str) -> Option<i64> {
    match v.get(key)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Decode a `jobs.query` / `getQueryResults` page into typed rows.
///
/// BigQuery encodes every scalar as a string; INTEGER, FLOAT and BOOLEAN
/// cells are converted back according to the result schema.
pub fn decode_query_response(v: &Value) -> Result<QueryRows> {
    let fields = v
        .get("schema")
        .and_then(|s| s.get("fields"))
        .and_then(|f| f.as_array())
        .cloned()
        .unwrap_or_default();
    let columns: Vec<String> = fields
        .iter()
        .map(|f| f.get("name").and_then(|n| n.as_str()).unwrap_or_default().to_string())
        .collect();
    let types: Vec<String> = fields
        .iter()
        .map(|f| {
            let mode = f.get("mode").and_then(|m| m.as_str()).unwrap_or("NULLABLE");
            if mode == "REPEATED" {
                "REPEATED".to_string()
            } else {
                f.get("type").and_then(|t| t.as_str()).unwrap_or("STRING").to_uppercase()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for row in v.get("rows").and_then(|r| r.as_array()).into_iter().flatten() {
        let cells = row
            .get("f")
            .and_then(|f| f.as_array())
            .ok_or_else(|| AudienceError::Query("result row without cells".into()))?;
        if cells.len() != columns.len() {
            return Err(AudienceError::Query(format!(
                "result row has {} cells for {} columns",
                cells.len(),
                columns.len()
            )));
        }
        let decoded = cells
            .iter()
            .zip(&types)
            .map(|(cell, ty)| decode_cell(cell.get("v").unwrap_or(&Value::Null), ty))
            .collect();
        rows.push(decoded);
    }
    Ok(QueryRows::new(columns, rows))
}

fn decode_cell(raw: &Value, ty: &str) -> Value {
    let Value::String(s) = raw else {
        return raw.clone();
    };
    match ty {
        "INTEGER" | "INT64" => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| raw.clone()),
        "FLOAT" | "FLOAT64" => s.parse::<f64>().map(Value::from).unwrap_or_else(|_| raw.clone()),
        "BOOLEAN" | "BOOL" => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => raw.clone(),
        },
        _ => raw.clone(),
    }
}
