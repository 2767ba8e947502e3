mod common;

use audience_core::{AudienceError, AudienceServices, AudienceAgent, FeedbackRecord, PromptLibrary, Verdict};
use common::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn feedback_is_appended_to_configured_table() {
    let mut warehouse = MockBq::new();
    warehouse
        .expect_append_rows()
        .times(1)
        .withf(|table, rows| {
            table.to_string() == "syntasa-saas.ccdp_demo.audience_feedback"
                && rows.len() == 1
                && rows[0]["attribute_goal"] == json!("Users older than 25")
                && rows[0]["filter_clause"] == json!("age > 25")
                && rows[0]["columns_used"] == json!(["age"])
                && rows[0]["approved"] == json!("thumbs_up")
                && rows[0]["feedback_text"] == json!("spot on")
        })
        .returning(|_, _| Ok(()));

    let agent = agent_with(grounded_store(), MockLlm::new(), warehouse);
    let record = FeedbackRecord::new("Users older than 25", "age > 25")
        .with_columns(vec!["age".into()])
        .with_verdict(Verdict::ThumbsUp)
        .with_text("spot on");
    agent.submit_feedback(&record).await.unwrap();
}

#[test]
fn row_carries_exactly_the_table_columns() {
    let row = serde_json::to_value(FeedbackRecord::new("g", "a > 1")).unwrap();
    let keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["attribute_goal", "filter_clause", "columns_used", "approved", "feedback_text"]
    );
}

#[tokio::test]
async fn comment_without_verdict_is_recorded_as_null() {
    let mut warehouse = MockBq::new();
    warehouse
        .expect_append_rows()
        .times(1)
        .withf(|_, rows| rows[0]["approved"].is_null())
        .returning(|_, _| Ok(()));

    let agent = agent_with(grounded_store(), MockLlm::new(), warehouse);
    let record = FeedbackRecord::new("Users older than 25", "age > 25").with_text("close");
    agent.submit_feedback(&record).await.unwrap();
}

#[tokio::test]
async fn incomplete_feedback_is_rejected_without_writing() {
    let mut warehouse = MockBq::new();
    warehouse.expect_append_rows().never();

    let agent = agent_with(grounded_store(), MockLlm::new(), warehouse);
    let record = FeedbackRecord::new("Users older than 25", "  ").with_verdict(Verdict::ThumbsDown);
    let err = agent.submit_feedback(&record).await.unwrap_err();
    assert!(matches!(err, AudienceError::InvalidInput(_)));
}

#[tokio::test]
async fn malformed_feedback_table_is_a_config_error() {
    let mut warehouse = MockBq::new();
    warehouse.expect_append_rows().never();

    let mut config = test_config();
    config.gcp.feedback_table = "audience_feedback".into();
    let services = AudienceServices::new(
        Arc::new(grounded_store()),
        Arc::new(MockLlm::new()),
        Arc::new(warehouse),
    );
    let agent = AudienceAgent::new(config, services, PromptLibrary::builtin().unwrap());

    let record = FeedbackRecord::new("Users older than 25", "age > 25");
    let err = agent.submit_feedback(&record).await.unwrap_err();
    assert!(matches!(err, AudienceError::Config(_)));
}

#[tokio::test]
async fn append_failure_is_propagated() {
    let mut warehouse = MockBq::new();
    warehouse
        .expect_append_rows()
        .returning(|_, _| Err(AudienceError::Query("insertAll rejected 1 row".into())));

    let agent = agent_with(grounded_store(), MockLlm::new(), warehouse);
    let record = FeedbackRecord::new("Users older than 25", "age > 25");
    assert!(matches!(
        agent.submit_feedback(&record).await,
        Err(AudienceError::Query(_))
    ));
}
