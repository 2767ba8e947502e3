//! Grounding data handed to the model.
//!
//! - SchemaContext: ordered column descriptors of the audience table
//! - ColumnValueSample: representative values per column

use crate::{AudienceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One column of the audience table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordered column descriptors; non-empty names are unique.
///
/// Loaded fresh for every invocation and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaContext {
    columns: Vec<ColumnDescriptor>,
}

#[derive(Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    columns: Vec<ColumnDescriptor>,
}

impl SchemaContext {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for col in columns.iter().filter(|c| !c.name.is_empty()) {
            if !seen.insert(col.name.as_str()) {
                return Err(AudienceError::ContextUnavailable(format!(
                    "duplicate column name in schema: {}",
                    col.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Parse a `{"columns": [...]}` document
    pub fn from_value(value: Value) -> Result<Self> {
        let doc: SchemaDocument = serde_json::from_value(value).map_err(|e| {
            AudienceError::ContextUnavailable(format!("malformed schema document: {e}"))
        })?;
        Self::new(doc.columns)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Column name → bounded list of representative values, in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnValueSample {
    values: Map<String, Value>,
}

impl ColumnValueSample {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(AudienceError::ContextUnavailable(format!(
                "column values document must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
