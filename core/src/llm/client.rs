use crate::config::{GcpConfig, GenerationSettings};
use crate::{AudienceError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::adapter::{extract_candidate_text, extract_finish_reason, request_to_generate_body};

/// One prompt plus, optionally, the schema the answer must conform to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    /// Free-text generation
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    /// Structured generation; the model must return JSON matching `schema`
    pub fn structured(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: Some(schema),
        }
    }
}

/// A generative model that turns a prompt into raw text
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Contract:
    /// - Input: prompt text + optional response schema
    /// - Output: text of the first candidate's first part
    /// - Error: `GenerationUnavailable` when the call fails or yields no text
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Configuration for VertexClient
#[derive(Debug, Clone)]
pub struct VertexClientConfig {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub access_token: Option<String>,
    pub request_timeout_ms: u64,
    pub settings: GenerationSettings,
    /// Override for tests and private endpoints
    pub endpoint: Option<String>,
}

impl VertexClientConfig {
    pub fn from_gcp(gcp: &GcpConfig, settings: GenerationSettings, request_timeout_ms: u64) -> Self {
        Self {
            project_id: gcp.project_id.clone(),
            location: gcp.location.clone(),
            model: gcp.ai_model.clone(),
            access_token: gcp.access_token.clone(),
            request_timeout_ms,
            settings,
            endpoint: None,
        }
    }

    /// Full `:generateContent` URL for the configured model
    pub fn generate_url(&self) -> String {
        let host = match &self.endpoint {
            Some(e) => e.trim_end_matches('/').to_string(),
            None if self.location == "global" => "https://aiplatform.googleapis.com".to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            host, self.project_id, self.location, self.model
        )
    }
}

/// Gemini on Vertex AI over the REST `generateContent` endpoint
#[derive(Clone)]
pub struct VertexClient {
    pub(crate) http: Client,
    pub(crate) cfg: VertexClientConfig,
}

impl VertexClient {
    pub fn new(cfg: VertexClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| AudienceError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &VertexClientConfig {
        &self.cfg
    }
}

#[async_trait]
impl GenerativeModel for VertexClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = self.cfg.generate_url();
        debug!(
            target: "llm_client",
            model = %self.cfg.model,
            structured = request.response_schema.is_some(),
            "POST {}", url
        );

        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");
        if let Some(token) = &self.cfg.access_token {
            req = req.bearer_auth(token);
        }

        let body = request_to_generate_body(request, self.cfg.settings);
        let resp = req.json(&body).send().await.map_err(|e| {
            warn!(target: "llm_client", error = %e, "generateContent request failed");
            AudienceError::GenerationUnavailable(format!("generateContent HTTP error: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target: "llm_client", %status, body = %text, "generateContent error");
            return Err(AudienceError::GenerationUnavailable(format!(
                "generateContent error: status={} body={}",
                status, text
            )));
        }

        let val: Value = resp.json().await.map_err(|e| {
            AudienceError::GenerationUnavailable(format!("Failed to parse generateContent JSON: {e}"))
        })?;
        extract_candidate_text(&val).ok_or_else(|| {
            let reason = extract_finish_reason(&val).unwrap_or_else(|| "none".to_string());
            warn!(target: "llm_client", finish_reason = %reason, "No candidate text in response");
            AudienceError::GenerationUnavailable(format!(
                "Missing candidates[0].content.parts[0].text (finish_reason={reason})"
            ))
        })
    }
}
