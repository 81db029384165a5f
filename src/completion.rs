use crate::error::Result;
use async_trait::async_trait;

/// Two-part prompt sent to the chat model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// Chat-completion backend. A single failure surfaces immediately, there is no retry.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt, model: &str) -> Result<String>;
}
