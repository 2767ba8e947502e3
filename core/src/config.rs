//! Runtime configuration for the audience agent
//!
//! Every struct implements `Default` by reading environment variables, so a
//! process can run from env alone. Binaries may overlay a TOML file on top
//! of these defaults before calling [`AudienceConfig::validate`].

use crate::{AudienceError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete configuration consumed by [`crate::AudienceAgent`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudienceConfig {
    pub gcp: GcpConfig,
    pub agent: AgentSettings,
    pub generation: GenerationSettings,
}

/// Cloud resources the agent reads from and writes to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub table_name: String,
    pub bucket_name: String,
    pub schema_blob_name: String,
    pub col_values_blob_name: String,
    pub ai_model: String,
    /// Fully qualified `project.dataset.table`
    pub feedback_table: String,
    /// Vertex AI location, e.g. `global` or `us-central1`
    pub location: String,
    /// OAuth2 bearer token used for GCS, Vertex AI and BigQuery calls
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

/// Knobs for the pipeline itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Column counted with COUNT(DISTINCT ..) to size an audience
    pub id_column: String,
    /// Byte ceiling for ad-hoc queries, in GiB
    pub max_bytes_gb: u64,
    /// Columns shown to the model when judging a generated clause
    pub preview_columns: usize,
    /// Rows shown to the model when judging a generated clause
    pub preview_rows: usize,
    pub request_timeout_ms: u64,
    /// Directory overriding the built-in prompt templates
    pub prompts_dir: Option<PathBuf>,
}

/// Tunable decoding parameters. Temperature and top-p are fixed, see
/// [`crate::llm::TEMPERATURE`] and [`crate::llm::TOP_P`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub max_output_tokens: u32,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            project_id: env_or("GCP_PROJECT_ID", ""),
            dataset_id: env_or("DATASET_ID", ""),
            table_name: env_or("TABLE_ID", ""),
            bucket_name: env_or("GCS_BUCKET", ""),
            schema_blob_name: env_or("SCHEMA_BLOB_NAME", ""),
            col_values_blob_name: env_or("COL_VALUES_BLOB_NAME", ""),
            ai_model: env_or("AI_MODEL", ""),
            feedback_table: env_or("FEEDBACK_TABLE", ""),
            location: env_or("VERTEX_LOCATION", "global"),
            access_token: std::env::var("GOOGLE_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            id_column: env_or("AUDIENCE_ID_COLUMN", "mcvisid"),
            max_bytes_gb: std::env::var("MAX_BYTES_GB")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(500),
            preview_columns: 8,
            preview_rows: 5,
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60_000),
            prompts_dir: std::env::var("AUDIENCE_PROMPTS_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: 8192,
        }
    }
}

impl AgentSettings {
    /// Byte ceiling for ad-hoc queries
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes_gb.saturating_mul(1024 * 1024 * 1024)
    }
}

impl AudienceConfig {
    /// Defaults drawn from the environment only
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Ensure every field the pipeline cannot run without is present
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project_id", &self.gcp.project_id),
            ("dataset_id", &self.gcp.dataset_id),
            ("table_name", &self.gcp.table_name),
            ("bucket_name", &self.gcp.bucket_name),
            ("schema_blob_name", &self.gcp.schema_blob_name),
            ("col_values_blob_name", &self.gcp.col_values_blob_name),
            ("ai_model", &self.gcp.ai_model),
            ("feedback_table", &self.gcp.feedback_table),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(AudienceError::Config(format!(
                "missing required gcp settings: {}",
                missing.join(", ")
            )));
        }
        if self.agent.id_column.trim().is_empty() {
            return Err(AudienceError::Config("id_column must not be empty".into()));
        }
        Ok(())
    }
}
