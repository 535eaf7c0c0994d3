//! Google Gemini provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::DEFAULT_THINKING_BUDGET;
use super::http_client::HttpClientTrait;
use crate::domain::{
    ContentBlock, Conversation, DomainError, LlmProvider, LlmRequest, LlmResponse, Message,
    MessageRole, RetryPolicy, ThinkingBlock, Usage,
};

const PROVIDER: &str = "gemini";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` provider
#[derive(Debug)]
pub struct GeminiProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    model: String,
    enable_thinking: bool,
    thinking_token_budget: u32,
    retry: RetryPolicy,
}

impl<C: HttpClientTrait> GeminiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: model.into(),
            enable_thinking: true,
            thinking_token_budget: DEFAULT_THINKING_BUDGET,
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

    pub fn with_thinking_budget(mut self, budget_tokens: u32) -> Self {
        self.thinking_token_budget = budget_tokens;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(&self, request: &LlmRequest, conversation: &Conversation<'_>) -> Value {
        let contents: Vec<GeminiContent> =
            conversation.turns.iter().map(GeminiContent::from_domain).collect();

        let mut generation_config = Map::new();

        if self.enable_thinking {
            generation_config.insert(
                "thinkingConfig".to_string(),
                serde_json::json!({
                    "thinkingBudget": self.thinking_token_budget,
                    "includeThoughts": true,
                }),
            );
        }

        // Absent and "unlimited" are not the same to the API.
        if let Some(max_tokens) = request.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), serde_json::json!(max_tokens));
        }

        if let Some(temp) = request.temperature {
            generation_config.insert("temperature".to_string(), serde_json::json!(temp));
        }

        let mut body = serde_json::json!({ "contents": contents });

        if let Some(system) = conversation.system {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": system }] });
        }

        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }

        request.merge_extra_into(&mut body);
        body
    }
}

/// Normalize a `generateContent` response.
///
/// Answer text is the concatenation of the first candidate's non-thought
/// parts; thought parts, when present, become the thinking block.
fn parse_response(json: Value) -> Result<LlmResponse, DomainError> {
    let response = GeminiResponse::deserialize(&json)
        .map_err(|e| DomainError::malformed(PROVIDER, format!("Failed to parse response: {}", e)))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::response_shape(PROVIDER, "Gemini response had no candidates"))?;

    let mut content = String::new();
    let mut thoughts = String::new();
    let mut signature = None;

    for part in candidate.content.parts {
        let Some(text) = part.text else { continue };
        if part.thought {
            thoughts.push_str(&text);
        } else {
            content.push_str(&text);
        }
        if signature.is_none() {
            signature = part.thought_signature;
        }
    }

    let usage = response
        .usage_metadata
        .as_ref()
        .map(|raw| {
            Usage::from_vendor(
                raw,
                "promptTokenCount",
                "candidatesTokenCount",
                Some("totalTokenCount"),
            )
        })
        .unwrap_or_default();

    let mut result = LlmResponse::new(content, json).with_usage(usage);

    if !thoughts.is_empty() {
        result = result.with_thinking(ThinkingBlock {
            thinking: thoughts,
            signature: signature.unwrap_or_default(),
        });
    }

    Ok(result)
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for GeminiProvider<C> {
    async fn call(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let conversation = Conversation::split(&request.messages)?;
        let url = self.generate_url();
        let body = self.build_request(&request, &conversation);

        debug!(
            model = %self.model,
            turns = conversation.turns.len(),
            thinking = self.enable_thinking,
            "Sending Gemini request"
        );

        let json = self
            .retry
            .run(PROVIDER, || {
                self.client.post_json(
                    PROVIDER,
                    &url,
                    vec![
                        ("x-goog-api-key", self.api_key.as_str()),
                        ("Content-Type", "application/json"),
                    ],
                    &body,
                )
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

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::Assistant => "model",
            MessageRole::User | MessageRole::System => "user",
        };

        let parts = message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text, .. } => GeminiPart { text: text.clone() },
            })
            .collect();

        Self { role, parts }
    }
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    thought_signature: Option<String>,
}
