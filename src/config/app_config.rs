use std::time::Duration;

use serde::Deserialize;

use crate::domain::RetryPolicy;
use crate::infrastructure::llm::{DEFAULT_THINKING_BUDGET, ReasoningEffort};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout applied by the shared HTTP client
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fixed-interval retry override for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.interval_ms))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: AnthropicSettings,
    pub bedrock: BedrockSettings,
    pub openai: OpenAiSettings,
    pub gemini: GeminiSettings,
    pub ollama: OllamaSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    pub model: String,
    pub enable_thinking: bool,
    pub thinking_token_budget: u32,
    pub enable_cache_control: bool,
    /// Wire a Bedrock provider as fallback for the thinking path
    pub bedrock_fallback: bool,
    pub base_url: Option<String>,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BedrockSettings {
    pub model: String,
    pub region: Option<String>,
    pub enable_thinking: bool,
    pub thinking_token_budget: u32,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub model: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub base_url: Option<String>,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    pub enable_thinking: bool,
    pub thinking_token_budget: u32,
    pub base_url: Option<String>,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub model: String,
    pub enable_thinking: bool,
    pub base_url: Option<String>,
    pub retry: Option<RetryConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}


impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            model: "claude-3-7-sonnet-20250219".to_string(),
            enable_thinking: true,
            thinking_token_budget: DEFAULT_THINKING_BUDGET,
            enable_cache_control: true,
            bedrock_fallback: true,
            base_url: None,
            retry: None,
        }
    }
}

impl Default for BedrockSettings {
    fn default() -> Self {
        Self {
            model: "us.anthropic.claude-3-7-sonnet-20250219-v1:0".to_string(),
            region: None,
            enable_thinking: true,
            thinking_token_budget: DEFAULT_THINKING_BUDGET,
            retry: None,
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            reasoning_effort: None,
            base_url: None,
            retry: None,
        }
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            enable_thinking: true,
            thinking_token_budget: DEFAULT_THINKING_BUDGET,
            base_url: None,
            retry: None,
        }
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            model: "qwen2.5".to_string(),
            enable_thinking: false,
            base_url: None,
            retry: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
