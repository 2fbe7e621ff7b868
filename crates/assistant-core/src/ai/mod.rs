pub mod openai;

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::state::ChatRequest;

pub use openai::{OpenAIClient, OPENAI_CHAT_COMPLETIONS_URL};

/// Anything that can turn one chat request into one completion.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, CompletionError>;
}
