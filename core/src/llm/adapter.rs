use crate::config::GenerationSettings;
use serde_json::{json, Value};

use super::client::GenerationRequest;

/// Sampling temperature; answers must be reproducible for the same inputs
pub const TEMPERATURE: f32 = 0.0;

pub const TOP_P: f32 = 1.0;

/// Harm categories relaxed to BLOCK_NONE on every request
pub const RELAXED_HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
];

/// Convert a GenerationRequest into a `generateContent` request body
pub fn request_to_generate_body(request: &GenerationRequest, settings: GenerationSettings) -> Value {
    let mut generation_config = json!({
        "temperature": TEMPERATURE,
        "topP": TOP_P,
        "maxOutputTokens": settings.max_output_tokens,
    });
    if let Some(schema) = &request.response_schema {
        generation_config["responseMimeType"] = json!("application/json");
        generation_config["responseSchema"] = schema.clone();
    }

    let safety_settings: Vec<Value> = RELAXED_HARM_CATEGORIES
        .iter()
        .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
        .collect();

    json!({
        "contents": [
            {"role": "user", "parts": [{"text": request.prompt}]}
        ],
        "generationConfig": generation_config,
        "safetySettings": safety_settings,
    })
}

/// `candidates[0].content.parts[0].text`, the only part the pipeline reads
pub fn extract_candidate_text(v: &Value) -> Option<String> {
    v.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

/// Why the first candidate stopped, if the service said so
pub fn extract_finish_reason(v: &Value) -> Option<String> {
    v.get("candidates")?
        .get(0)?
        .get("finishReason")?
        .as_str()
        .map(|s| s.to_string())
}
