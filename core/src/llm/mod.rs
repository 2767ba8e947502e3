//! LLM module: generation contract, Vertex AI client, and request adapter
//!
//! This module provides:
//! - `GenerativeModel`, the seam the agent calls through (mocked in tests)
//! - `VertexClient` / `VertexClientConfig` for Gemini on Vertex AI
//! - `request_to_generate_body` / `extract_candidate_text` for building payloads
//!   and reading answers

mod adapter;
mod client;

pub use adapter::{
    extract_candidate_text, extract_finish_reason, request_to_generate_body,
    RELAXED_HARM_CATEGORIES, TEMPERATURE, TOP_P,
};
pub use client::{GenerationRequest, GenerativeModel, VertexClient, VertexClientConfig};
