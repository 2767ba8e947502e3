//! User feedback on generated audiences, appended to a warehouse table

use crate::warehouse::{TableRef, Warehouse};
use crate::{AudienceError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    ThumbsUp,
    ThumbsDown,
}

impl Verdict {
    pub fn is_approved(self) -> bool {
        matches!(self, Verdict::ThumbsUp)
    }
}

/// One row of the feedback table; fields map one-to-one onto its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub attribute_goal: String,
    pub filter_clause: String,
    #[serde(default)]
    pub columns_used: Vec<String>,
    /// `None` when the user left a comment without a thumbs up/down
    #[serde(rename = "approved")]
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub feedback_text: String,
}

impl FeedbackRecord {
    pub fn new(attribute_goal: impl Into<String>, filter_clause: impl Into<String>) -> Self {
        Self {
            attribute_goal: attribute_goal.into(),
            filter_clause: filter_clause.into(),
            columns_used: Vec::new(),
            verdict: None,
            feedback_text: String::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns_used = columns;
        self
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.feedback_text = text.into();
        self
    }

    /// Goal and clause are required; nothing is written without them
    pub fn validate(&self) -> Result<()> {
        if self.attribute_goal.trim().is_empty() || self.filter_clause.trim().is_empty() {
            return Err(AudienceError::InvalidInput(
                "feedback requires attribute_goal and filter_clause".into(),
            ));
        }
        Ok(())
    }
}

/// Validate `record` and append it to `table`
pub async fn submit_feedback(
    warehouse: &dyn Warehouse,
    table: &TableRef,
    record: &FeedbackRecord,
) -> Result<()> {
    record.validate()?;
    let row = serde_json::to_value(record)?;
    warehouse.append_rows(table, vec![row]).await?;
    info!(
        target: "feedback",
        %table,
        approved = ?record.verdict.map(Verdict::is_approved),
        "Feedback recorded"
    );
    Ok(())
}
