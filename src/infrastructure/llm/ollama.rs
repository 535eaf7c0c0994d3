//! Local Ollama server provider (`/api/generate`)

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::http_client::HttpClientTrait;
use crate::domain::{
    Conversation, DomainError, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole,
    RetryPolicy, ThinkingBlock, Usage,
};

const PROVIDER: &str = "ollama";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug)]
pub struct OllamaProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    enable_thinking: bool,
    retry: RetryPolicy,
}

impl<C: HttpClientTrait> OllamaProvider<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: model.into(),
            enable_thinking: false,
            retry: RetryPolicy::none(),
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

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, request: &LlmRequest, conversation: &Conversation<'_>) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": flatten_turns(conversation.turns),
            "stream": false,
        });

        if let Some(system) = conversation.system {
            body["system"] = serde_json::json!(system);
        }

        if self.enable_thinking {
            body["think"] = serde_json::json!(true);
        }

        let mut options = Map::new();
        if let Some(temp) = request.temperature {
            options.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = request.max_tokens {
            options.insert("num_predict".to_string(), serde_json::json!(max_tokens));
        }
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        request.merge_extra_into(&mut body);
        body
    }
}

/// A lone turn is sent as-is; longer conversations get role labels
fn flatten_turns(turns: &[Message]) -> String {
    if let [only] = turns {
        return only.text().unwrap_or_default().to_string();
    }

    turns
        .iter()
        .map(|message| {
            let label = match message.role {
                MessageRole::System => "System",
                MessageRole::User => "User",
                MessageRole::Assistant => "Assistant",
            };
            format!("{}: {}", label, message.text().unwrap_or_default())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn parse_response(json: Value) -> Result<LlmResponse, DomainError> {
    let response = GenerateResponse::deserialize(&json)
        .map_err(|e| DomainError::malformed(PROVIDER, format!("Failed to parse response: {}", e)))?;

    let content = response
        .response
        .ok_or_else(|| DomainError::response_shape(PROVIDER, "Response has no 'response' field"))?;

    let usage = match json.as_object() {
        Some(raw) => Usage::from_vendor(raw, "prompt_eval_count", "eval_count", None),
        None => Usage::default(),
    };
    // Everything else in the body is generation metadata, already kept in raw_response.
    let usage = Usage {
        details: Map::new(),
        ..usage
    };

    let mut result = LlmResponse::new(content, json).with_usage(usage);

    if let Some(thinking) = response.thinking.filter(|t| !t.is_empty()) {
        result = result.with_thinking(ThinkingBlock {
            thinking,
            signature: String::new(),
        });
    }

    Ok(result)
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OllamaProvider<C> {
    async fn call(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let conversation = Conversation::split(&request.messages)?;
        if conversation.turns.is_empty() {
            return Err(DomainError::validation(
                "Ollama needs at least one turn after the system message",
            ));
        }

        let url = format!("{}/api/generate", self.base_url);
        let body = self.build_request(&request, &conversation);

        debug!(model = %self.model, turns = conversation.turns.len(), "Sending Ollama request");

        let json = self
            .retry
            .run(PROVIDER, || {
                self.client
                    .post_json(PROVIDER, &url, vec![("Content-Type", "application/json")], &body)
            })
            .await?;

        parse_response(json)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    thinking: Option<String>,
}
