#![allow(dead_code)]

use async_trait::async_trait;
use audience_core::llm::{GenerationRequest, GenerativeModel};
use audience_core::prompt::PromptLibrary;
use audience_core::warehouse::{QueryRows, TableRef, Warehouse};
use audience_core::{
    AudienceAgent, AudienceConfig, AudienceServices, InMemoryObjectStore, Result,
};
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;

pub const BUCKET: &str = "syntasa-saas";
pub const SCHEMA_KEY: &str = "donorai_attr_aud/context_dictionary.json";
pub const VALUES_KEY: &str = "donorai_attr_aud/distinct_col_values.json";

mock! {
    pub Llm {}

    #[async_trait]
    impl GenerativeModel for Llm {
        async fn generate(&self, request: &GenerationRequest) -> Result<String>;
    }
}

mock! {
    pub Bq {}

    #[async_trait]
    impl Warehouse for Bq {
        async fn dry_run(&self, sql: &str) -> Result<u64>;
        async fn query(&self, sql: &str) -> Result<QueryRows>;
        async fn append_rows(&self, table: &TableRef, rows: Vec<Value>) -> Result<()>;
    }
}

pub fn test_config() -> AudienceConfig {
    let mut cfg = AudienceConfig::default();
    cfg.gcp.project_id = "syntasa-saas".into();
    cfg.gcp.dataset_id = "ccdp_demo".into();
    cfg.gcp.table_name = "web_tb_event".into();
    cfg.gcp.bucket_name = BUCKET.into();
    cfg.gcp.schema_blob_name = SCHEMA_KEY.into();
    cfg.gcp.col_values_blob_name = VALUES_KEY.into();
    cfg.gcp.ai_model = "gemini-2.0-flash".into();
    cfg.gcp.feedback_table = "syntasa-saas.ccdp_demo.audience_feedback".into();
    cfg.agent.id_column = "mcvisid".into();
    cfg.agent.max_bytes_gb = 500;
    cfg.agent.preview_columns = 8;
    cfg.agent.preview_rows = 5;
    cfg.agent.prompts_dir = None;
    cfg
}

pub fn sample_schema() -> Value {
    json!({
        "columns": [
            {"name": "age", "data_type": "INTEGER", "description": "User age"},
            {"name": "country", "data_type": "STRING", "description": "User country"}
        ]
    })
}

pub fn sample_col_values() -> Value {
    json!({"age": [20, 25, 30, 35], "country": ["US", "IN"]})
}

pub fn sample_model_response() -> String {
    r#"
    {
        "filter_clause": "age > 25",
        "columns_used": ["age"],
        "attribute_name": "Older users",
        "attribute_description": "Users older than 25"
    }
    "#
    .to_string()
}

pub fn grounded_store() -> InMemoryObjectStore {
    InMemoryObjectStore::new()
        .with_object(BUCKET, SCHEMA_KEY, sample_schema().to_string())
        .with_object(BUCKET, VALUES_KEY, sample_col_values().to_string())
}

pub fn count_rows(n: u64) -> QueryRows {
    QueryRows::new(vec!["matching_users".into()], vec![vec![json!(n)]])
}

pub fn agent_with(store: InMemoryObjectStore, model: MockLlm, warehouse: MockBq) -> AudienceAgent {
    let services = AudienceServices::new(Arc::new(store), Arc::new(model), Arc::new(warehouse));
    AudienceAgent::new(test_config(), services, PromptLibrary::builtin().unwrap())
}
