use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::http_client::HttpClientTrait;
use crate::domain::{
    ContentBlock, DomainError, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole,
    RetryPolicy, Usage,
};

const PROVIDER: &str = "openai";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Reasoning effort accepted by OpenAI reasoning models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// OpenAI chat completions provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    reasoning_effort: Option<ReasoningEffort>,
    retry: RetryPolicy,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: model.into(),
            reasoning_effort: None,
            retry: RetryPolicy::fixed(3, Duration::from_millis(500)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_reasoning_effort(mut self, effort: Option<ReasoningEffort>) -> Self {
        self.reasoning_effort = effort;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    /// Reasoning effort applies only to the "o" model family
    fn active_reasoning_effort(&self) -> Option<ReasoningEffort> {
        if self.model.starts_with('o') {
            self.reasoning_effort
        } else {
            None
        }
    }

    fn build_request(&self, request: &LlmRequest) -> Value {
        let messages: Vec<OpenAiMessage> = request
            .messages
            .iter()
            .map(OpenAiMessage::from_domain)
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        match self.active_reasoning_effort() {
            Some(effort) => {
                // Reasoning models reject temperature tuning.
                body["reasoning_effort"] = serde_json::json!(effort);
                body["temperature"] = serde_json::json!(1);

                if let Some(max_tokens) = request.max_tokens {
                    body["max_completion_tokens"] = serde_json::json!(max_tokens);
                }
            }
            None => {
                if let Some(temp) = request.temperature {
                    body["temperature"] = serde_json::json!(temp);
                }

                if let Some(max_tokens) = request.max_tokens {
                    body["max_tokens"] = serde_json::json!(max_tokens);
                }
            }
        }

        request.merge_extra_into(&mut body);
        body
    }

    fn parse_response(&self, json: Value) -> Result<LlmResponse, DomainError> {
        let response = OpenAiResponse::deserialize(&json).map_err(|e| {
            DomainError::malformed(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::response_shape(PROVIDER, "No choices in response"))?;

        let usage = response
            .usage
            .as_ref()
            .map(|raw| {
                Usage::from_vendor(raw, "prompt_tokens", "completion_tokens", Some("total_tokens"))
            })
            .unwrap_or_default();

        Ok(LlmResponse::new(choice.message.content.unwrap_or_default(), json).with_usage(usage))
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn call(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        if request.messages.is_empty() {
            return Err(DomainError::validation("Messages list cannot be empty"));
        }

        let url = self.chat_completions_url();
        let body = self.build_request(&request);

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            reasoning_effort = ?self.active_reasoning_effort(),
            "Sending OpenAI request"
        );

        let json = self
            .retry
            .run(PROVIDER, || {
                self.client.post_json(PROVIDER, &url, self.headers(), &body)
            })
            .await?;

        self.parse_response(json)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: Vec<OpenAiContentPart>,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        let content = message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text, .. } => OpenAiContentPart::Text { text: text.clone() },
            })
            .collect();

        Self { role, content }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
