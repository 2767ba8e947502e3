use audience_core::{AudienceConfig, AudienceError};
use serial_test::serial;

const VARS: &[&str] = &[
    "GCP_PROJECT_ID",
    "DATASET_ID",
    "TABLE_ID",
    "GCS_BUCKET",
    "SCHEMA_BLOB_NAME",
    "COL_VALUES_BLOB_NAME",
    "AI_MODEL",
    "FEEDBACK_TABLE",
    "VERTEX_LOCATION",
    "GOOGLE_ACCESS_TOKEN",
    "AUDIENCE_ID_COLUMN",
    "MAX_BYTES_GB",
    "REQUEST_TIMEOUT_MS",
    "AUDIENCE_PROMPTS_DIR",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn config_loads_from_defaults() {
    clear_env();

    let cfg = AudienceConfig::from_env();
    assert_eq!(cfg.gcp.project_id, "");
    assert_eq!(cfg.gcp.location, "global");
    assert_eq!(cfg.gcp.access_token, None);
    assert_eq!(cfg.agent.id_column, "mcvisid");
    assert_eq!(cfg.agent.max_bytes_gb, 500);
    assert_eq!(cfg.agent.request_timeout_ms, 60_000);
    assert_eq!(cfg.agent.prompts_dir, None);
    assert_eq!(cfg.generation.max_output_tokens, 8192);
}

#[test]
#[serial]
fn config_loads_from_env() {
    clear_env();
    std::env::set_var("GCP_PROJECT_ID", "syntasa-saas");
    std::env::set_var("DATASET_ID", "ccdp_demo");
    std::env::set_var("TABLE_ID", "web_tb_event");
    std::env::set_var("GCS_BUCKET", "syntasa-saas");
    std::env::set_var("SCHEMA_BLOB_NAME", "donorai_attr_aud/context_dictionary.json");
    std::env::set_var("COL_VALUES_BLOB_NAME", "donorai_attr_aud/distinct_col_values.json");
    std::env::set_var("AI_MODEL", "gemini-2.0-flash");
    std::env::set_var("FEEDBACK_TABLE", "syntasa-saas.ccdp_demo.audience_feedback");
    std::env::set_var("VERTEX_LOCATION", "us-central1");
    std::env::set_var("MAX_BYTES_GB", "50");
    std::env::set_var("AUDIENCE_ID_COLUMN", "visitor_id");

    let cfg = AudienceConfig::from_env();
    assert_eq!(cfg.gcp.project_id, "syntasa-saas");
    assert_eq!(cfg.gcp.table_name, "web_tb_event");
    assert_eq!(cfg.gcp.location, "us-central1");
    assert_eq!(cfg.agent.id_column, "visitor_id");
    assert_eq!(cfg.agent.max_bytes(), 50 * 1024 * 1024 * 1024);
    assert!(cfg.validate().is_ok());

    clear_env();
}

#[test]
#[serial]
fn unparseable_number_falls_back_to_default() {
    clear_env();
    std::env::set_var("MAX_BYTES_GB", "lots");

    let cfg = AudienceConfig::from_env();
    assert_eq!(cfg.agent.max_bytes_gb, 500);

    clear_env();
}

#[test]
#[serial]
fn validate_names_every_missing_field() {
    clear_env();
    let mut cfg = AudienceConfig::from_env();
    cfg.gcp.project_id = "p".into();

    let err = cfg.validate().unwrap_err();
    assert!(matches!(err, AudienceError::Config(_)));
    let msg = err.to_string();
    assert!(msg.contains("dataset_id"));
    assert!(msg.contains("feedback_table"));
    assert!(!msg.contains("project_id"));
}

#[test]
fn max_bytes_saturates() {
    let mut cfg = AudienceConfig::default();
    cfg.agent.max_bytes_gb = u64::MAX;
    assert_eq!(cfg.agent.max_bytes(), u64::MAX);
}
