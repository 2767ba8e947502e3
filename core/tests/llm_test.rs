use audience_core::llm::{
    extract_candidate_text, extract_finish_reason, request_to_generate_body, GenerationRequest,
    VertexClient, VertexClientConfig, RELAXED_HARM_CATEGORIES,
};
use audience_core::{GcpConfig, GenerationSettings, Result};
use serde_json::json;

fn vertex_config(location: &str) -> VertexClientConfig {
    VertexClientConfig {
        project_id: "syntasa-saas".to_string(),
        location: location.to_string(),
        model: "gemini-2.0-flash".to_string(),
        access_token: None,
        request_timeout_ms: 10_000,
        settings: GenerationSettings::default(),
        endpoint: None,
    }
}

#[test]
fn client_creation_succeeds() -> Result<()> {
    let client = VertexClient::new(vertex_config("global"))?;
    assert_eq!(client.config().model, "gemini-2.0-flash");
    Ok(())
}

#[test]
fn global_location_uses_unprefixed_host() {
    assert_eq!(
        vertex_config("global").generate_url(),
        "https://aiplatform.googleapis.com/v1/projects/syntasa-saas/locations/global/publishers/google/models/gemini-2.0-flash:generateContent"
    );
}

#[test]
fn regional_location_prefixes_host() {
    let url = vertex_config("us-central1").generate_url();
    assert!(url.starts_with("https://us-central1-aiplatform.googleapis.com/v1/projects/syntasa-saas/locations/us-central1/"));
}

#[test]
fn endpoint_override_replaces_host() {
    let mut cfg = vertex_config("global");
    cfg.endpoint = Some("http://localhost:8085/".to_string());
    assert!(cfg
        .generate_url()
        .starts_with("http://localhost:8085/v1/projects/syntasa-saas/"));
}

#[test]
fn config_is_derived_from_gcp_settings() {
    let gcp = GcpConfig {
        project_id: "p".into(),
        dataset_id: "d".into(),
        table_name: "t".into(),
        bucket_name: "b".into(),
        schema_blob_name: "s.json".into(),
        col_values_blob_name: "v.json".into(),
        ai_model: "gemini-2.5-pro".into(),
        feedback_table: "p.d.f".into(),
        location: "europe-west4".into(),
        access_token: Some("token".into()),
    };
    let cfg = VertexClientConfig::from_gcp(&gcp, GenerationSettings::default(), 1_000);
    assert_eq!(cfg.model, "gemini-2.5-pro");
    assert_eq!(cfg.location, "europe-west4");
    assert_eq!(cfg.access_token.as_deref(), Some("token"));
    assert_eq!(cfg.request_timeout_ms, 1_000);
}

#[test]
fn structured_request_body_carries_schema_and_deterministic_decoding() {
    let schema = json!({"type": "OBJECT", "required": ["filter_clause"]});
    let req = GenerationRequest::structured("Find users", schema.clone());
    let body = request_to_generate_body(&req, GenerationSettings::default());

    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Find users");
    let gc = &body["generationConfig"];
    assert_eq!(gc["temperature"], json!(0.0));
    assert_eq!(gc["topP"], json!(1.0));
    assert_eq!(gc["maxOutputTokens"], json!(8192));
    assert_eq!(gc["responseMimeType"], "application/json");
    assert_eq!(gc["responseSchema"], schema);
}

#[test]
fn sampling_is_fixed_whatever_the_settings() {
    let settings = GenerationSettings {
        max_output_tokens: 10,
    };
    let body = request_to_generate_body(&GenerationRequest::text("x"), settings);
    assert_eq!(
        body["generationConfig"],
        json!({"temperature": 0.0, "topP": 1.0, "maxOutputTokens": 10})
    );
}

#[test]
fn plain_request_body_has_no_schema() {
    let body = request_to_generate_body(&GenerationRequest::text("hi"), GenerationSettings::default());
    assert!(body["generationConfig"].get("responseSchema").is_none());
    assert!(body["generationConfig"].get("responseMimeType").is_none());
}

#[test]
fn every_harm_category_is_relaxed() {
    let body = request_to_generate_body(&GenerationRequest::text("hi"), GenerationSettings::default());
    let settings = body["safetySettings"].as_array().unwrap();
    assert_eq!(settings.len(), RELAXED_HARM_CATEGORIES.len());
    for (setting, category) in settings.iter().zip(RELAXED_HARM_CATEGORIES) {
        assert_eq!(setting["category"], category);
        assert_eq!(setting["threshold"], "BLOCK_NONE");
    }
}

#[test]
fn candidate_text_is_read_from_first_part() {
    let resp = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "{\"a\": 1}"}, {"text": "ignored"}]},
            "finishReason": "STOP"
        }]
    });
    assert_eq!(extract_candidate_text(&resp).as_deref(), Some("{\"a\": 1}"));
    assert_eq!(extract_finish_reason(&resp).as_deref(), Some("STOP"));
}

#[test]
fn blocked_response_has_no_text() {
    let resp = json!({"candidates": [{"finishReason": "SAFETY"}]});
    assert_eq!(extract_candidate_text(&resp), None);
    assert_eq!(extract_finish_reason(&resp).as_deref(), Some("SAFETY"));
    assert_eq!(extract_candidate_text(&json!({})), None);
}
