//! Unified LLM
//!
//! One call interface over several hosted LLM APIs:
//! - Anthropic (direct, with optional AWS Bedrock fallback on the thinking path)
//! - Anthropic models through AWS Bedrock
//! - OpenAI, including reasoning-effort models
//! - Google Gemini
//! - A local Ollama server
//!
//! Every adapter implements [`domain::LlmProvider`] and retries its network
//! call with a fixed-interval [`domain::RetryPolicy`].

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{DomainError, LlmProvider, LlmRequest, LlmResponse, Message};
pub use infrastructure::llm::{LlmProviderConfig, LlmProviderFactory};
