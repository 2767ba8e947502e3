//! Audience agent orchestration
//!
//! `run_audience_agent` walks a fixed sequence of stages:
//!
//! ```text
//! LoadingContext -> BuildingPrompt -> Generating -> Parsing -> (Counting | SkipCount) -> Done
//! ```
//!
//! Only `LoadingContext` can fail the call. Everything downstream of the
//! model degrades locally: an unusable answer becomes empty fields, a failed
//! count becomes `matching_users: None`.

use crate::config::AudienceConfig;
use crate::context::{
    format_schema_text, format_values_text, load_schema, load_values, to_pretty_json,
    ColumnValueSample, SchemaContext,
};
use crate::feedback::{self, FeedbackRecord};
use crate::llm::{GenerationRequest, GenerativeModel, VertexClient, VertexClientConfig};
use crate::prompt::{build_prompt, PromptLibrary};
use crate::response::{parse_response, strip_code_fence, AudienceFields, ParsedResponse};
use crate::storage::{GcsObjectStore, ObjectStore};
use crate::warehouse::{
    count_matches, preview_query_sql, run_bounded_query, BigQueryClient, BigQueryConfig,
    BoundedQueryOutcome, TableRef, Warehouse,
};
use crate::{AudienceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the agent hands back for one goal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceResult {
    pub filter_clause: String,
    pub columns_used: Vec<String>,
    pub attribute_name: String,
    pub attribute_description: String,
    /// `None` when there is no clause or the count query failed
    pub matching_users: Option<u64>,
}

impl AudienceResult {
    pub fn from_parts(fields: AudienceFields, matching_users: Option<u64>) -> Self {
        Self {
            filter_clause: fields.filter_clause,
            columns_used: fields.columns_used,
            attribute_name: fields.attribute_name,
            attribute_description: fields.attribute_description,
            matching_users,
        }
    }
}

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStage {
    LoadingContext,
    BuildingPrompt,
    Generating,
    Parsing,
    Counting,
    SkipCount,
    Done,
}

impl fmt::Display for AgentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStage::LoadingContext => "LOADING_CONTEXT",
            AgentStage::BuildingPrompt => "BUILDING_PROMPT",
            AgentStage::Generating => "GENERATING",
            AgentStage::Parsing => "PARSING",
            AgentStage::Counting => "COUNTING",
            AgentStage::SkipCount => "SKIP_COUNT",
            AgentStage::Done => "DONE",
        };
        f.write_str(s)
    }
}

fn enter(stage: AgentStage) {
    debug!(target: "audience_agent", %stage, "stage");
}

/// External collaborators, built once per process and shared
#[derive(Clone)]
pub struct AudienceServices {
    pub store: Arc<dyn ObjectStore>,
    pub model: Arc<dyn GenerativeModel>,
    pub warehouse: Arc<dyn Warehouse>,
}

impl AudienceServices {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        model: Arc<dyn GenerativeModel>,
        warehouse: Arc<dyn Warehouse>,
    ) -> Self {
        Self {
            store,
            model,
            warehouse,
        }
    }

    /// GCS, Vertex AI and BigQuery clients for `config`
    pub fn from_config(config: &AudienceConfig) -> Result<Self> {
        let gcp = &config.gcp;
        let timeout = config.agent.request_timeout_ms;
        let store = GcsObjectStore::new(gcp.access_token.clone(), timeout)?;
        let model = VertexClient::new(VertexClientConfig::from_gcp(gcp, config.generation, timeout))?;
        let warehouse = BigQueryClient::new(BigQueryConfig::new(
            gcp.project_id.clone(),
            gcp.access_token.clone(),
            timeout,
        ))?;
        Ok(Self::new(Arc::new(store), Arc::new(model), Arc::new(warehouse)))
    }
}

/// Turns plain-language goals into counted audience definitions
pub struct AudienceAgent {
    config: AudienceConfig,
    services: AudienceServices,
    prompts: PromptLibrary,
    table: TableRef,
}

impl AudienceAgent {
    pub fn new(config: AudienceConfig, services: AudienceServices, prompts: PromptLibrary) -> Self {
        let table = TableRef::new(
            config.gcp.project_id.clone(),
            config.gcp.dataset_id.clone(),
            config.gcp.table_name.clone(),
        );
        Self {
            config,
            services,
            prompts,
            table,
        }
    }

    /// Validate `config`, build the production clients and load the prompts
    pub fn from_config(config: AudienceConfig) -> Result<Self> {
        config.validate()?;
        let services = AudienceServices::from_config(&config)?;
        let prompts = PromptLibrary::load(config.agent.prompts_dir.as_deref())?;
        Ok(Self::new(config, services, prompts))
    }

    pub fn config(&self) -> &AudienceConfig {
        &self.config
    }

    /// Table audiences are counted against
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Schema and sample values, fetched concurrently
    pub async fn load_grounding(&self) -> Result<(SchemaContext, ColumnValueSample)> {
        let gcp = &self.config.gcp;
        let store = self.services.store.as_ref();
        tokio::try_join!(
            load_schema(store, &gcp.bucket_name, &gcp.schema_blob_name),
            load_values(store, &gcp.bucket_name, &gcp.col_values_blob_name),
        )
    }

    /// Describe and size the audience for `attribute_goal`.
    ///
    /// Errors only for an empty goal or missing grounding context.
    pub async fn run_audience_agent(&self, attribute_goal: &str) -> Result<AudienceResult> {
        if attribute_goal.trim().is_empty() {
            return Err(AudienceError::InvalidInput(
                "attribute goal must not be empty".into(),
            ));
        }
        info!(target: "audience_agent", goal = %attribute_goal, "Building audience");

        enter(AgentStage::LoadingContext);
        let (schema, values) = self.load_grounding().await?;

        enter(AgentStage::BuildingPrompt);
        let schema_text = format_schema_text(&schema);
        let prompt = format_values_text(&values).and_then(|values_text| {
            build_prompt(&self.prompts.audience, attribute_goal, &schema_text, &values_text)
        });

        let parsed = match prompt {
            Ok(prompt) => self.generate_fields(prompt).await,
            Err(e) => {
                warn!(target: "audience_agent", error = %e, "Prompt could not be built");
                ParsedResponse::Empty
            }
        };
        let fields = parsed.into_fields();

        let matching_users = if fields.filter_clause.trim().is_empty() {
            enter(AgentStage::SkipCount);
            None
        } else {
            enter(AgentStage::Counting);
            count_matches(
                self.services.warehouse.as_ref(),
                &fields.filter_clause,
                &self.config.agent.id_column,
                &self.table,
            )
            .await
        };

        enter(AgentStage::Done);
        info!(
            target: "audience_agent",
            attribute = %fields.attribute_name,
            matching_users = ?matching_users,
            "Audience built"
        );
        Ok(AudienceResult::from_parts(fields, matching_users))
    }

    async fn generate_fields(&self, prompt: String) -> ParsedResponse {
        enter(AgentStage::Generating);
        let request = GenerationRequest {
            prompt,
            response_schema: self.prompts.audience.response_schema.clone(),
        };
        match self.services.model.generate(&request).await {
            Ok(raw) => {
                enter(AgentStage::Parsing);
                parse_response(&raw)
            }
            Err(e) => {
                warn!(target: "audience_agent", error = %e, "Generation failed; treating as empty response");
                ParsedResponse::Empty
            }
        }
    }

    /// Ask the model whether `filter_clause` selects the same rows as
    /// `ground_truth_clause` for `nl_query`. Used for offline benchmarks;
    /// every failure propagates.
    pub async fn validate_query(
        &self,
        nl_query: &str,
        filter_clause: &str,
        ground_truth_clause: &str,
    ) -> Result<Value> {
        let gcp = &self.config.gcp;
        let schema = load_schema(
            self.services.store.as_ref(),
            &gcp.bucket_name,
            &gcp.schema_blob_name,
        )
        .await?;
        let schema_text = format_schema_text(&schema);

        let preview: Vec<&str> = schema
            .column_names()
            .into_iter()
            .filter(|name| !name.is_empty())
            .take(self.config.agent.preview_columns)
            .collect();
        let sample_json = if preview.is_empty() {
            "[]".to_string()
        } else {
            let sql = preview_query_sql(&preview, &self.table, self.config.agent.preview_rows);
            let rows = self.services.warehouse.query(&sql).await?;
            to_pretty_json(&rows.stringified().records())?
        };

        let prompt = self.prompts.validation.render(&[
            ("nl_query", nl_query),
            ("filter_clause", filter_clause),
            ("ground_truth_clause", ground_truth_clause),
            ("schema_str", &schema_text),
            ("sample_json_str", &sample_json),
        ])?;
        let request = GenerationRequest {
            prompt,
            response_schema: self.prompts.validation.response_schema.clone(),
        };
        let raw = self.services.model.generate(&request).await?;
        let judgment: Value = serde_json::from_str(strip_code_fence(&raw))?;
        debug!(target: "audience_agent", %judgment, "Validation judgment");
        Ok(judgment)
    }

    /// Run ad-hoc SQL under the configured byte ceiling
    pub async fn run_bounded_query(&self, sql: &str) -> BoundedQueryOutcome {
        run_bounded_query(
            self.services.warehouse.as_ref(),
            sql,
            self.config.agent.max_bytes(),
        )
        .await
    }

    /// Append `record` to the configured feedback table
    pub async fn submit_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let table: TableRef = self.config.gcp.feedback_table.parse()?;
        feedback::submit_feedback(self.services.warehouse.as_ref(), &table, record).await
    }
}
