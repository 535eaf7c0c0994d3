//! Anthropic models through the AWS Bedrock runtime

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::config::http::HttpResponse;
use aws_sdk_bedrockruntime::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_bedrockruntime::error::SdkError;
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::DEFAULT_THINKING_BUDGET;
use super::anthropic::{DEFAULT_MAX_TOKENS, parse_messages_response, thinking_max_tokens};
use crate::domain::{
    ContentBlock, Conversation, Credential, DomainError, LlmProvider, LlmRequest, LlmResponse,
    Message, MessageRole, ProviderErrorKind, RetryPolicy,
};

const PROVIDER: &str = "bedrock";
const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// AWS Bedrock client trait for dependency injection
#[async_trait]
pub trait BedrockClientTrait: Send + Sync + std::fmt::Debug {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, DomainError>;
}

/// AWS Bedrock provider for Anthropic models.
///
/// Requires at least two messages, the first of which must be the system
/// message.
#[derive(Debug)]
pub struct BedrockProvider<C: BedrockClientTrait> {
    client: C,
    model: String,
    enable_thinking: bool,
    thinking_token_budget: u32,
    retry: RetryPolicy,
}

impl<C: BedrockClientTrait> BedrockProvider<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            enable_thinking: true,
            thinking_token_budget: DEFAULT_THINKING_BUDGET,
            retry: RetryPolicy::fixed(3, Duration::from_secs(10)),
        }
    }

    pub fn with_thinking(mut self, enabled: bool) -> Self {
        self.enable_thinking = enabled;
        self
    }

    pub fn with_thinking_budget(mut self, budget_tokens: u32) -> Self {
        self.thinking_token_budget = budget_tokens;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    fn validate(messages: &[Message]) -> Result<(), DomainError> {
        let starts_with_system = messages
            .first()
            .is_some_and(|m| m.role == MessageRole::System);

        if messages.len() < 2 || !starts_with_system {
            return Err(DomainError::validation(
                "Bedrock requires at least 2 messages, the first being a system message",
            ));
        }

        Ok(())
    }

    fn build_request(&self, request: &LlmRequest, conversation: &Conversation<'_>) -> Value {
        let messages: Vec<BedrockMessage> = conversation
            .turns
            .iter()
            .map(BedrockMessage::from_domain)
            .collect();

        let requested_max = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        let mut body = serde_json::json!({
            "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
            "messages": messages,
        });

        if let Some(system) = conversation.system {
            body["system"] = serde_json::json!(system);
        }

        if self.enable_thinking {
            body["max_tokens"] =
                serde_json::json!(thinking_max_tokens(self.thinking_token_budget, requested_max));
            body["temperature"] = serde_json::json!(1);
            body["thinking"] = serde_json::json!({
                "type": "enabled",
                "budget_tokens": self.thinking_token_budget,
            });
        } else {
            body["max_tokens"] = serde_json::json!(requested_max);

            if let Some(temp) = request.temperature {
                body["temperature"] = serde_json::json!(temp);
            }
        }

        request.merge_extra_into(&mut body);
        body
    }
}

#[async_trait]
impl<C: BedrockClientTrait> LlmProvider for BedrockProvider<C> {
    async fn call(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        Self::validate(&request.messages)?;
        let conversation = Conversation::split(&request.messages)?;
        let body = self.build_request(&request, &conversation);

        let body_bytes = serde_json::to_vec(&body).map_err(|e| {
            DomainError::provider(
                PROVIDER,
                ProviderErrorKind::InvalidRequest,
                format!("Failed to serialize request: {}", e),
            )
        })?;

        debug!(
            model = %self.model,
            turns = conversation.turns.len(),
            thinking = self.enable_thinking,
            "Invoking Bedrock model"
        );

        let response_bytes = self
            .retry
            .run(PROVIDER, || {
                self.client.invoke_model(&self.model, body_bytes.clone())
            })
            .await?;

        let json: Value = serde_json::from_slice(&response_bytes).map_err(|e| {
            DomainError::malformed(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        parse_messages_response(PROVIDER, json, self.enable_thinking)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Bedrock API types

#[derive(Debug, Serialize)]
struct BedrockMessage {
    role: &'static str,
    content: Vec<BedrockContent>,
}

impl BedrockMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "user",
        };

        let content = message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text, .. } => BedrockContent::Text { text: text.clone() },
            })
            .collect();

        Self { role, content }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BedrockContent {
    Text { text: String },
}

/// Real AWS Bedrock client implementation
#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
}

impl BedrockClient {
    /// Client using the ambient AWS configuration (profile, instance role, env)
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_bedrockruntime::Client::new(config),
        }
    }

    /// Client with static keys taken from an `AwsBedrock` credential.
    ///
    /// The credential's api key is the access key id; `secret_key` and
    /// `region` params are required, `session_token` is optional.
    pub fn from_credential(credential: &Credential) -> Result<Self, DomainError> {
        let secret_key = credential.require_param("secret_key")?;
        let region = credential.require_param("region")?;

        let credentials = Credentials::new(
            credential.api_key(),
            secret_key,
            credential.get_param("session_token").cloned(),
            None,
            "environment",
        );

        let config = aws_sdk_bedrockruntime::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();

        Ok(Self {
            client: aws_sdk_bedrockruntime::Client::from_conf(config),
        })
    }
}

fn classify_sdk_error(err: &SdkError<InvokeModelError, HttpResponse>) -> ProviderErrorKind {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => ProviderErrorKind::Transport,
        SdkError::ResponseError(_) => ProviderErrorKind::Malformed,
        SdkError::ServiceError(service) => {
            if service.err().is_throttling_exception() {
                ProviderErrorKind::RateLimited
            } else {
                ProviderErrorKind::from_status(service.raw().status().as_u16())
            }
        }
        SdkError::ConstructionFailure(_) => ProviderErrorKind::InvalidRequest,
        _ => ProviderErrorKind::Transport,
    }
}

#[async_trait]
impl BedrockClientTrait for BedrockClient {
    async fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, DomainError> {
        let blob = aws_sdk_bedrockruntime::primitives::Blob::new(body);

        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .body(blob)
            .content_type("application/json")
            .accept("application/json")
            .send()
            .await
            .map_err(|e| {
                DomainError::provider(
                    PROVIDER,
                    classify_sdk_error(&e),
                    format!("API error: {}", e),
                )
            })?;

        Ok(response.body.into_inner())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted Bedrock client; queued outcomes first, then the fixed response
    #[derive(Debug, Default)]
    pub struct MockBedrockClient {
        response: Mutex<Option<Vec<u8>>>,
        queued: Mutex<VecDeque<DomainError>>,
        invocations: Mutex<Vec<(String, Value)>>,
    }

    impl MockBedrockClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, response: Value) -> Self {
            *self.response.lock().unwrap() = Some(serde_json::to_vec(&response).unwrap());
            self
        }

        pub fn with_failures(self, count: usize, kind: ProviderErrorKind) -> Self {
            {
                let mut queued = self.queued.lock().unwrap();
                for n in 0..count {
                    queued.push_back(DomainError::provider(
                        PROVIDER,
                        kind,
                        format!("scripted failure {}", n + 1),
                    ));
                }
            }
            self
        }

        pub fn invocations(&self) -> Vec<(String, Value)> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BedrockClientTrait for MockBedrockClient {
        async fn invoke_model(
            &self,
            model_id: &str,
            body: Vec<u8>,
        ) -> Result<Vec<u8>, DomainError> {
            let body: Value = serde_json::from_slice(&body).unwrap();
            self.invocations
                .lock()
                .unwrap()
                .push((model_id.to_string(), body));

            if let Some(error) = self.queued.lock().unwrap().pop_front() {
                return Err(error);
            }

            self.response.lock().unwrap().clone().ok_or_else(|| {
                DomainError::provider(
                    PROVIDER,
                    ProviderErrorKind::Auth,
                    format!("No mock response for {}", model_id),
                )
            })
        }
    }
}
