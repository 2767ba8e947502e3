//! Parsing of the model's structured answer
//!
//! The model is untrusted input. Its answer is accepted only when it is a JSON
//! object carrying all four fields with the right types; anything else
//! collapses to [`ParsedResponse::Empty`]. Partial answers are never trusted.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The four fields the model must return
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceFields {
    pub filter_clause: String,
    pub columns_used: Vec<String>,
    pub attribute_name: String,
    pub attribute_description: String,
}

/// Outcome of validating a model answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Valid(AudienceFields),
    Empty,
}

impl ParsedResponse {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedResponse::Valid(_))
    }

    /// The validated fields, or `("", [], "", "")`
    pub fn into_fields(self) -> AudienceFields {
        match self {
            ParsedResponse::Valid(fields) => fields,
            ParsedResponse::Empty => AudienceFields::default(),
        }
    }
}

/// Remove a surrounding ```` ```json ```` / ```` ``` ```` fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Validate raw model text. Total: never panics, never errors.
pub fn parse_response(raw_text: &str) -> ParsedResponse {
    match serde_json::from_str::<AudienceFields>(strip_code_fence(raw_text)) {
        Ok(fields) => {
            debug!(
                target: "response_parser",
                columns = fields.columns_used.len(),
                "Model response accepted"
            );
            ParsedResponse::Valid(fields)
        }
        Err(e) => {
            warn!(
                target: "response_parser",
                error = %e,
                raw_len = raw_text.len(),
                "Discarding model response that does not match the expected shape"
            );
            ParsedResponse::Empty
        }
    }
}
