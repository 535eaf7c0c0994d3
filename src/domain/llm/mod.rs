//! LLM provider domain models and traits

mod message;
mod provider;
mod request;
mod response;
mod retry;

pub use message::{ContentBlock, Conversation, Message, MessageRole};
pub use provider::LlmProvider;
pub use request::{LlmRequest, LlmRequestBuilder};
pub use response::{LlmResponse, ThinkingBlock, Usage};
pub use retry::{RetryEvent, RetryHook, RetryPolicy};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
