use async_trait::async_trait;
use std::fmt::Debug;

use super::{LlmRequest, LlmResponse};
use crate::domain::DomainError;

/// Trait for LLM providers (Anthropic, Bedrock, OpenAI, Gemini, ...)
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send the conversation and return the normalized response
    async fn call(&self, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Model identifier sent upstream
    fn model(&self) -> &str;
}
