// Skycast Core Library
// Weather data store, tool registry and chat orchestration runtime

pub mod api;
pub mod chat;
pub mod geom;
pub mod llm;
pub mod store;
pub mod tools;

// Export core types
pub use chat::ChatOrchestrator;
pub use llm::{ChatCompletion, LlmClient, LlmClientConfig};
pub use store::Store;
pub use tools::{Tool, ToolError, ToolRegistry};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkycastError {
    #[error("Store error: {0}")]
    StoreError(#[from] store::StoreError),

    #[error("Tool error: {0}")]
    ToolError(#[from] tools::ToolError),

    #[error("LLM error: {0}")]
    LlmError(#[from] llm::LlmError),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkycastError>;
