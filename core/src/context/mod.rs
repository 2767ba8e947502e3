//! Grounding context loader
//!
//! Fetches the column schema and the sample column values from object
//! storage and renders both into compact text blocks for the prompt.
//!
//! Loading failures are fatal for a request: without a schema there is
//! nothing to ground the model on, so every error here surfaces as
//! [`AudienceError::ContextUnavailable`].

pub mod types;

pub use types::{ColumnDescriptor, ColumnValueSample, SchemaContext};

use crate::storage::ObjectStore;
use crate::{AudienceError, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Fetch `bucket/key` and parse it as JSON
pub async fn load_context(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<Value> {
    debug!(target: "context_loader", %bucket, %key, "Loading context document");
    let bytes = store.get_object(bucket, key).await.map_err(|e| match e {
        e @ AudienceError::ContextUnavailable(_) => e,
        other => AudienceError::ContextUnavailable(format!("{bucket}/{key}: {other}")),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AudienceError::ContextUnavailable(format!("{bucket}/{key}: invalid JSON: {e}"))
    })
}

pub async fn load_schema(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<SchemaContext> {
    SchemaContext::from_value(load_context(store, bucket, key).await?)
}

pub async fn load_values(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<ColumnValueSample> {
    ColumnValueSample::from_value(load_context(store, bucket, key).await?)
}

/// One `- name (TYPE): description` line per column, in schema order
pub fn format_schema_text(schema: &SchemaContext) -> String {
    schema
        .columns()
        .iter()
        .map(|col| {
            let dtype = col.data_type.to_uppercase();
            match col.description.as_deref().map(str::trim) {
                Some(desc) if !desc.is_empty() => format!("- {} ({}): {}", col.name, dtype, desc),
                _ => format!("- {} ({})", col.name, dtype),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty-printed JSON of the sample values, order and values untouched
pub fn format_values_text(values: &ColumnValueSample) -> Result<String> {
    to_pretty_json(values)
}

/// Two-space indented JSON; non-ASCII characters are kept verbatim
pub(crate) fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
