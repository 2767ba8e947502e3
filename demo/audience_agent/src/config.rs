use std::fs;
use std::path::{Path, PathBuf};

use audience_core::{AgentSettings, AudienceConfig, GcpConfig, GenerationSettings};

/// Load configuration from a TOML file (path via AUDIENCE_AGENT_CONFIG or ./audience_agent.toml),
/// overlaying values onto env-driven defaults.
pub fn load() -> AudienceConfig {
    let default = AudienceConfig::from_env();
    let path =
        std::env::var("AUDIENCE_AGENT_CONFIG").unwrap_or_else(|_| "audience_agent.toml".into());
    let p = Path::new(&path);
    if !p.exists() {
        tracing::info!(target: "audience_agent", path = %path, "No TOML config found; using env");
        return default;
    }
    match fs::read_to_string(p) {
        Ok(s) => match overlay_str(&s, default.clone()) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "audience_agent", error = %e, "Failed to parse TOML; using env");
                default
            }
        },
        Err(e) => {
            tracing::warn!(target: "audience_agent", error = %e, "Failed to read TOML; using env");
            default
        }
    }
}

/// Apply a TOML document on top of `base`
pub fn overlay_str(s: &str, base: AudienceConfig) -> Result<AudienceConfig, toml::de::Error> {
    let t = toml::from_str::<AudienceToml>(s)?;
    Ok(t.overlay(base))
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AudienceToml {
    pub gcp: Option<GcpToml>,
    pub agent: Option<AgentToml>,
    pub generation: Option<GenerationToml>,
}

impl AudienceToml {
    fn overlay(self, mut base: AudienceConfig) -> AudienceConfig {
        if let Some(g) = self.gcp {
            g.apply(&mut base.gcp);
        }
        if let Some(a) = self.agent {
            a.apply(&mut base.agent);
        }
        if let Some(g) = self.generation {
            g.apply(&mut base.generation);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct GcpToml {
    pub project_id: Option<String>,
    pub dataset_id: Option<String>,
    pub table_name: Option<String>,
    pub bucket_name: Option<String>,
    pub schema_blob_name: Option<String>,
    pub col_values_blob_name: Option<String>,
    pub ai_model: Option<String>,
    pub feedback_table: Option<String>,
    pub location: Option<String>,
}
impl GcpToml {
    fn apply(self, g: &mut GcpConfig) {
        if let Some(x) = self.project_id {
            g.project_id = x;
        }
        if let Some(x) = self.dataset_id {
            g.dataset_id = x;
        }
        if let Some(x) = self.table_name {
            g.table_name = x;
        }
        if let Some(x) = self.bucket_name {
            g.bucket_name = x;
        }
        if let Some(x) = self.schema_blob_name {
            g.schema_blob_name = x;
        }
        if let Some(x) = self.col_values_blob_name {
            g.col_values_blob_name = x;
        }
        if let Some(x) = self.ai_model {
            g.ai_model = x;
        }
        if let Some(x) = self.feedback_table {
            g.feedback_table = x;
        }
        if let Some(x) = self.location {
            g.location = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AgentToml {
    pub id_column: Option<String>,
    pub max_bytes_gb: Option<u64>,
    pub preview_columns: Option<usize>,
    pub preview_rows: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub prompts_dir: Option<PathBuf>,
}
impl AgentToml {
    fn apply(self, a: &mut AgentSettings) {
        if let Some(x) = self.id_column {
            a.id_column = x;
        }
        if let Some(x) = self.max_bytes_gb {
            a.max_bytes_gb = x;
        }
        if let Some(x) = self.preview_columns {
            a.preview_columns = x.max(1);
        }
        if let Some(x) = self.preview_rows {
            a.preview_rows = x.max(1);
        }
        if let Some(x) = self.request_timeout_ms {
            a.request_timeout_ms = x;
        }
        if let Some(x) = self.prompts_dir {
            a.prompts_dir = Some(x);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct GenerationToml {
    pub max_output_tokens: Option<u32>,
}
impl GenerationToml {
    fn apply(self, g: &mut GenerationSettings) {
        if let Some(x) = self.max_output_tokens {
            g.max_output_tokens = x.max(1);
        }
    }
}
