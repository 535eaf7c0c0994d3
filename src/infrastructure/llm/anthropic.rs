use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::DEFAULT_THINKING_BUDGET;
use super::http_client::HttpClientTrait;
use crate::domain::{
    ContentBlock, Conversation, DomainError, LlmProvider, LlmRequest, LlmResponse, Message,
    MessageRole, RetryPolicy, ThinkingBlock, Usage,
};

const PROVIDER: &str = "anthropic";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(crate) const DEFAULT_MAX_TOKENS: u32 = 16000;

/// Anthropic Messages API provider.
///
/// With thinking enabled, a failed call (after retries) or a response
/// without the expected thinking and text blocks is handed to the fallback
/// provider, if one is configured. The thinking-disabled path never falls
/// back.
#[derive(Debug)]
pub struct AnthropicProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    model: String,
    enable_thinking: bool,
    thinking_token_budget: u32,
    enable_cache_control: bool,
    retry: RetryPolicy,
    fallback: Option<Arc<dyn LlmProvider>>,
}

impl<C: HttpClientTrait> AnthropicProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            model: model.into(),
            enable_thinking: true,
            thinking_token_budget: DEFAULT_THINKING_BUDGET,
            enable_cache_control: true,
            retry: RetryPolicy::fixed(3, Duration::from_secs(10)),
            fallback: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_thinking(mut self, enabled: bool) -> Self {
        self.enable_thinking = enabled;
        self
    }

    pub fn with_thinking_budget(mut self, budget_tokens: u32) -> Self {
        self.thinking_token_budget = budget_tokens;
        self
    }

    pub fn with_cache_control(mut self, enabled: bool) -> Self {
        self.enable_cache_control = enabled;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Provider used when the thinking-enabled call fails
    pub fn with_fallback(mut self, fallback: Arc<dyn LlmProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &LlmRequest, conversation: &Conversation<'_>) -> Value {
        let messages: Vec<AnthropicMessage> = conversation
            .turns
            .iter()
            .map(|m| AnthropicMessage::from_domain(m, self.enable_cache_control))
            .collect();

        let requested_max = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(system) = conversation.system {
            body["system"] = serde_json::json!(system);
        }

        if self.enable_thinking {
            body["max_tokens"] =
                serde_json::json!(thinking_max_tokens(self.thinking_token_budget, requested_max));
            // The API rejects any other temperature while thinking.
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

    async fn send(&self, body: &Value) -> Result<Value, DomainError> {
        let url = self.messages_url();

        self.retry
            .run(PROVIDER, || {
                self.client.post_json(PROVIDER, &url, self.headers(), body)
            })
            .await
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for AnthropicProvider<C> {
    async fn call(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let conversation = Conversation::split(&request.messages)?;
        let body = self.build_request(&request, &conversation);

        debug!(
            model = %self.model,
            turns = conversation.turns.len(),
            thinking = self.enable_thinking,
            "Sending Anthropic request"
        );

        if !self.enable_thinking {
            let json = self.send(&body).await?;
            return parse_messages_response(PROVIDER, json, false);
        }

        let outcome = match self.send(&body).await {
            Ok(json) => parse_messages_response(PROVIDER, json, true),
            Err(e) => Err(e),
        };

        match (outcome, &self.fallback) {
            (Ok(response), _) => Ok(response),
            (Err(e), Some(fallback)) => {
                error!(
                    model = %self.model,
                    fallback = fallback.provider_name(),
                    error = %e,
                    "Anthropic call failed, falling back"
                );
                let response = fallback.call(request).await?;
                info!(fallback = fallback.provider_name(), "Fallback call succeeded");
                Ok(response)
            }
            (Err(e), None) => Err(e),
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Max tokens to request when thinking is on: never below the budget + 1
pub(crate) fn thinking_max_tokens(budget_tokens: u32, requested: u32) -> u32 {
    requested.max(budget_tokens.saturating_add(1))
}

/// Normalize a Messages API response body (shared by the direct and Bedrock paths)
pub(crate) fn parse_messages_response(
    provider: &'static str,
    json: Value,
    thinking_enabled: bool,
) -> Result<LlmResponse, DomainError> {
    let response = MessagesResponse::deserialize(&json)
        .map_err(|e| DomainError::malformed(provider, format!("Failed to parse response: {}", e)))?;

    let usage = response
        .usage
        .as_ref()
        .map(|raw| Usage::from_vendor(raw, "input_tokens", "output_tokens", None))
        .unwrap_or_default();

    let mut text = None;
    let mut thinking = None;

    for block in response.content {
        match block {
            ResponseBlock::Text { text: t } if text.is_none() => text = Some(t),
            ResponseBlock::Thinking {
                thinking: trace,
                signature,
            } if thinking.is_none() => {
                thinking = Some(ThinkingBlock {
                    thinking: trace,
                    signature,
                })
            }
            _ => {}
        }
    }

    let text =
        text.ok_or_else(|| DomainError::response_shape(provider, "response has no text block"))?;

    let mut llm_response = LlmResponse::new(text, json).with_usage(usage);

    if thinking_enabled {
        let thinking = thinking.ok_or_else(|| {
            DomainError::response_shape(
                provider,
                "thinking was enabled but the response has no thinking block",
            )
        })?;
        llm_response = llm_response.with_thinking(thinking);
    }

    Ok(llm_response)
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContent>,
}

impl AnthropicMessage {
    fn from_domain(message: &Message, enable_cache_control: bool) -> Self {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "user", // Only a leading system message is lifted out
        };

        let content = message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text {
                    text,
                    cache_control,
                } => AnthropicContent::Text {
                    text: text.clone(),
                    cache_control: (*cache_control && enable_cache_control)
                        .then_some(CacheControl { kind: "ephemeral" }),
                },
            })
            .collect();

        Self { role, content }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
}

#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        signature: String,
    },
    #[serde(other)]
    Other,
}
