//! Application configuration loaded from files and `APP__*` environment variables

mod app_config;

pub use app_config::{
    AnthropicSettings, AppConfig, BedrockSettings, GeminiSettings, HttpConfig, LogFormat,
    LoggingConfig, OllamaSettings, OpenAiSettings, ProvidersConfig, RetryConfig,
};
