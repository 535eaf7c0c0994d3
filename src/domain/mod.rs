//! Domain layer - provider-agnostic messages, responses, errors and traits

pub mod credentials;
pub mod error;
pub mod llm;

pub use credentials::{Credential, CredentialProvider, CredentialType};
pub use error::{DomainError, ProviderErrorKind};
pub use llm::{
    ContentBlock, Conversation, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message,
    MessageRole, RetryEvent, RetryHook, RetryPolicy, ThinkingBlock, Usage,
};

#[cfg(test)]
pub use llm::MockLlmProvider;
