//! LLM provider implementations

mod anthropic;
mod bedrock;
mod factory;
mod gemini;
mod http_client;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use bedrock::{BedrockClient, BedrockClientTrait, BedrockProvider};
pub use factory::{LlmProviderConfig, LlmProviderFactory, PROVIDER_NAMES, bedrock_fallback_model};
pub use gemini::GeminiProvider;
pub use http_client::{HttpClient, HttpClientTrait};
pub use ollama::OllamaProvider;
pub use openai::{OpenAiProvider, ReasoningEffort};

/// Thinking budget used by every adapter that supports thinking
pub const DEFAULT_THINKING_BUDGET: u32 = 2048;
