pub mod client;
pub mod types;

pub use client::{LlmClient, LlmClientConfig};
pub use types::{
    ChatMessage, Completion, CompletionRequest, FunctionCall, Role, ToolCall, ToolChoice,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: status={status} body={body}")]
    Api { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// The chat-completion capability the orchestrator depends on.
///
/// `LlmClient` is the production implementation; tests substitute a
/// scripted fake.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}
