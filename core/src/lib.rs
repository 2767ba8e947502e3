// Audience Builder Core Library
// Natural-language audience definitions grounded in a warehouse schema

pub mod agent;
pub mod config;
pub mod context;
pub mod feedback;
pub mod llm;
pub mod prompt;
pub mod response;
pub mod storage;
pub mod warehouse;

// Export core types
pub use agent::{AgentStage, AudienceAgent, AudienceResult, AudienceServices};
pub use config::{AgentSettings, AudienceConfig, GcpConfig, GenerationSettings};
pub use context::{ColumnDescriptor, ColumnValueSample, SchemaContext};
pub use feedback::{FeedbackRecord, Verdict};
pub use llm::{GenerationRequest, GenerativeModel, VertexClient};
pub use prompt::{PromptLibrary, PromptTemplate};
pub use response::{AudienceFields, ParsedResponse};
pub use storage::{GcsObjectStore, InMemoryObjectStore, ObjectStore};
pub use warehouse::{BigQueryClient, BoundedQueryOutcome, QueryRows, TableRef, Warehouse};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudienceError {
    #[error("Context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, AudienceError>;
