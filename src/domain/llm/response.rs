use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reasoning trace returned alongside the answer when thinking is enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub thinking: String,
    pub signature: String,
}

/// Token usage statistics; every counter is optional because vendors differ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    /// Vendor-specific counters kept verbatim
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl Usage {
    /// Usage with prompt and completion counts and a derived total
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens.saturating_add(completion_tokens)),
            details: Map::new(),
        }
    }

    /// Read counters from a vendor usage object.
    ///
    /// The total is taken from `total_key` when the vendor reports it and
    /// derived from the other two otherwise. Every other field is kept in
    /// `details`. Counts beyond `u32::MAX` saturate.
    pub fn from_vendor(
        raw: &Map<String, Value>,
        prompt_key: &str,
        completion_key: &str,
        total_key: Option<&str>,
    ) -> Self {
        let count = |key: &str| {
            raw.get(key)
                .and_then(Value::as_u64)
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        };

        let prompt_tokens = count(prompt_key);
        let completion_tokens = count(completion_key);
        let total_tokens = total_key.and_then(count).or(match (prompt_tokens, completion_tokens) {
            (Some(p), Some(c)) => Some(p.saturating_add(c)),
            _ => None,
        });

        let known = [Some(prompt_key), Some(completion_key), total_key];
        let details = raw
            .iter()
            .filter(|(k, _)| !known.contains(&Some(k.as_str())))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            details,
        }
    }

}

/// Normalized response from an LLM provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub raw_response: Value,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingBlock>,
}

impl LlmResponse {
    pub fn new(content: impl Into<String>, raw_response: Value) -> Self {
        Self {
            content: content.into(),
            raw_response,
            usage: Usage::default(),
            thinking: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_thinking(mut self, thinking: ThinkingBlock) -> Self {
        self.thinking = Some(thinking);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_calculation() {
        let usage = Usage::new(10, 20);
        assert_eq!(usage.total_tokens, Some(30));
    }

    #[test]
    fn test_from_vendor_keeps_reported_total_and_details() {
        let raw = serde_json::json!({
            "prompt_tokens": 9,
            "completion_tokens": 12,
            "total_tokens": 25,
            "completion_tokens_details": {"reasoning_tokens": 4}
        });

        let usage = Usage::from_vendor(
            raw.as_object().unwrap(),
            "prompt_tokens",
            "completion_tokens",
            Some("total_tokens"),
        );

        assert_eq!(usage.prompt_tokens, Some(9));
        assert_eq!(usage.completion_tokens, Some(12));
        assert_eq!(usage.total_tokens, Some(25));
        assert_eq!(usage.details.len(), 1);
        assert!(usage.details.contains_key("completion_tokens_details"));
    }

    #[test]
    fn test_from_vendor_derives_missing_total() {
        let raw = serde_json::json!({"input_tokens": 3, "output_tokens": 4});
        let usage = Usage::from_vendor(raw.as_object().unwrap(), "input_tokens", "output_tokens", None);

        assert_eq!(usage.total_tokens, Some(7));
        assert!(usage.details.is_empty());
    }

    #[test]
    fn test_from_vendor_with_missing_counts() {
        let raw = serde_json::json!({"input_tokens": 3});
        let usage = Usage::from_vendor(raw.as_object().unwrap(), "input_tokens", "output_tokens", None);

        assert_eq!(usage.prompt_tokens, Some(3));
        assert_eq!(usage.completion_tokens, None);
        assert_eq!(usage.total_tokens, None);
    }

    #[test]
    fn test_from_vendor_saturates_oversized_counts() {
        let raw = serde_json::json!({"input_tokens": 4_294_967_295u64, "output_tokens": 1});
        let usage = Usage::from_vendor(raw.as_object().unwrap(), "input_tokens", "output_tokens", None);

        assert_eq!(usage.prompt_tokens, Some(u32::MAX));
        assert_eq!(usage.completion_tokens, Some(1));
        assert_eq!(usage.total_tokens, Some(u32::MAX));

        let raw = serde_json::json!({"input_tokens": 4_294_967_301u64});
        let usage = Usage::from_vendor(raw.as_object().unwrap(), "input_tokens", "output_tokens", None);
        assert_eq!(usage.prompt_tokens, Some(u32::MAX));
    }

    #[test]
    fn test_usage_new_saturates_total() {
        assert_eq!(Usage::new(u32::MAX, 10).total_tokens, Some(u32::MAX));
    }

    #[test]
    fn test_response_without_thinking_omits_field() {
        let response = LlmResponse::new("Hello!", serde_json::json!({"id": "x"}))
            .with_usage(Usage::new(1, 2));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["content"], "Hello!");
        assert!(json.get("thinking").is_none());
        assert_eq!(json["usage"]["total_tokens"], 3);
    }
}
