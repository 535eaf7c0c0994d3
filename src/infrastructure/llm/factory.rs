use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::bedrock::{BedrockClient, BedrockProvider};
use super::http_client::HttpClient;
use super::{AnthropicProvider, GeminiProvider, OllamaProvider, OpenAiProvider};
use crate::config::{
    AnthropicSettings, BedrockSettings, GeminiSettings, OllamaSettings, OpenAiSettings,
    ProvidersConfig,
};
use crate::domain::{Credential, CredentialProvider, CredentialType, DomainError, LlmProvider};

/// LLM provider configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmProviderConfig {
    Anthropic(AnthropicSettings),
    AwsBedrock(BedrockSettings),
    OpenAi(OpenAiSettings),
    Gemini(GeminiSettings),
    Ollama(OllamaSettings),
}

/// Names accepted by [`LlmProviderConfig::from_providers`]
pub const PROVIDER_NAMES: [&str; 5] = ["anthropic", "bedrock", "openai", "gemini", "ollama"];

impl LlmProviderConfig {
    /// Pick one provider section out of the application config by name
    pub fn from_providers(providers: &ProvidersConfig, name: &str) -> Result<Self, DomainError> {
        match name {
            "anthropic" => Ok(Self::Anthropic(providers.anthropic.clone())),
            "bedrock" | "aws_bedrock" => Ok(Self::AwsBedrock(providers.bedrock.clone())),
            "openai" => Ok(Self::OpenAi(providers.openai.clone())),
            "gemini" => Ok(Self::Gemini(providers.gemini.clone())),
            "ollama" => Ok(Self::Ollama(providers.ollama.clone())),
            other => Err(DomainError::configuration(format!(
                "Unknown provider '{}', expected one of: {}",
                other,
                PROVIDER_NAMES.join(", ")
            ))),
        }
    }
}

/// Bedrock model id used when falling back from the direct Anthropic API
pub fn bedrock_fallback_model(anthropic_model: &str) -> String {
    format!("us.anthropic.{}-v1:0", anthropic_model)
}

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory {
    credentials: Arc<dyn CredentialProvider>,
    http_timeout: Duration,
}

impl LlmProviderFactory {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            credentials,
            http_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Create an LLM provider from configuration, reading credentials now
    pub async fn create(
        &self,
        config: &LlmProviderConfig,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        match config {
            LlmProviderConfig::Anthropic(settings) => self.create_anthropic(settings).await,
            LlmProviderConfig::AwsBedrock(settings) => {
                let provider = self.create_bedrock(settings).await?;
                Ok(Arc::new(provider))
            }
            LlmProviderConfig::OpenAi(settings) => {
                let credential = self.credential(CredentialType::OpenAi).await?;
                let mut provider =
                    OpenAiProvider::new(self.http_client()?, credential.api_key(), &settings.model)
                        .with_reasoning_effort(settings.reasoning_effort);

                if let Some(base_url) = &settings.base_url {
                    provider = provider.with_base_url(base_url);
                }
                if let Some(retry) = settings.retry {
                    provider = provider.with_retry_policy(retry.policy());
                }

                Ok(Arc::new(provider))
            }
            LlmProviderConfig::Gemini(settings) => {
                let credential = self.credential(CredentialType::Gemini).await?;
                let mut provider =
                    GeminiProvider::new(self.http_client()?, credential.api_key(), &settings.model)
                        .with_thinking(settings.enable_thinking)
                        .with_thinking_budget(settings.thinking_token_budget);

                if let Some(base_url) = &settings.base_url {
                    provider = provider.with_base_url(base_url);
                }
                if let Some(retry) = settings.retry {
                    provider = provider.with_retry_policy(retry.policy());
                }

                Ok(Arc::new(provider))
            }
            LlmProviderConfig::Ollama(settings) => {
                let mut provider = OllamaProvider::new(self.http_client()?, &settings.model)
                    .with_thinking(settings.enable_thinking);

                if let Some(base_url) = &settings.base_url {
                    provider = provider.with_base_url(base_url);
                }
                if let Some(retry) = settings.retry {
                    provider = provider.with_retry_policy(retry.policy());
                }

                Ok(Arc::new(provider))
            }
        }
    }

    async fn create_anthropic(
        &self,
        settings: &AnthropicSettings,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let credential = self.credential(CredentialType::Anthropic).await?;
        let mut provider =
            AnthropicProvider::new(self.http_client()?, credential.api_key(), &settings.model)
                .with_thinking(settings.enable_thinking)
                .with_thinking_budget(settings.thinking_token_budget)
                .with_cache_control(settings.enable_cache_control);

        if let Some(base_url) = &settings.base_url {
            provider = provider.with_base_url(base_url);
        }
        if let Some(retry) = settings.retry {
            provider = provider.with_retry_policy(retry.policy());
        }

        if settings.bedrock_fallback && settings.enable_thinking {
            let fallback_settings = BedrockSettings {
                model: bedrock_fallback_model(&settings.model),
                enable_thinking: settings.enable_thinking,
                thinking_token_budget: settings.thinking_token_budget,
                ..BedrockSettings::default()
            };
            let fallback = self.create_bedrock(&fallback_settings).await?;

            info!(
                model = %settings.model,
                fallback_model = %fallback_settings.model,
                "Wired Bedrock fallback for Anthropic"
            );
            provider = provider.with_fallback(Arc::new(fallback));
        }

        Ok(Arc::new(provider))
    }

    async fn create_bedrock(
        &self,
        settings: &BedrockSettings,
    ) -> Result<BedrockProvider<BedrockClient>, DomainError> {
        let client = match self.credentials.get_credential(&CredentialType::AwsBedrock).await {
            Ok(credential) => {
                let credential = match &settings.region {
                    Some(region) => credential.with_param("region", region),
                    None => credential,
                };
                BedrockClient::from_credential(&credential)?
            }
            Err(e) => {
                debug!(error = %e, "No explicit AWS credential, using the default provider chain");
                let loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
                let loader = match &settings.region {
                    Some(region) => loader.region(aws_config::Region::new(region.clone())),
                    None => loader,
                };
                BedrockClient::from_sdk_config(&loader.load().await)
            }
        };

        let mut provider = BedrockProvider::new(client, &settings.model)
            .with_thinking(settings.enable_thinking)
            .with_thinking_budget(settings.thinking_token_budget);

        if let Some(retry) = settings.retry {
            provider = provider.with_retry_policy(retry.policy());
        }

        Ok(provider)
    }

    async fn credential(&self, credential_type: CredentialType) -> Result<Credential, DomainError> {
        debug!(
            credential_type = %credential_type,
            source = self.credentials.provider_name(),
            "Resolving credential"
        );
        self.credentials.get_credential(&credential_type).await
    }

    fn http_client(&self) -> Result<HttpClient, DomainError> {
        HttpClient::with_timeout(self.http_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credentials::mock::MockCredentialProvider;

    fn factory(credentials: MockCredentialProvider) -> LlmProviderFactory {
        LlmProviderFactory::new(Arc::new(credentials)).with_http_timeout(Duration::from_secs(5))
    }

    fn bedrock_credential() -> Credential {
        Credential::new(CredentialType::AwsBedrock, "AKIATEST".to_string())
            .with_param("secret_key", "secret")
            .with_param("region", "us-east-1")
    }

    #[test]
    fn test_bedrock_fallback_model() {
        assert_eq!(
            bedrock_fallback_model("claude-3-7-sonnet-20250219"),
            "us.anthropic.claude-3-7-sonnet-20250219-v1:0"
        );
    }

    #[test]
    fn test_config_is_tagged_by_type() {
        let config: LlmProviderConfig = serde_json::from_value(serde_json::json!({
            "type": "open_ai",
            "model": "o1",
            "reasoning_effort": "low"
        }))
        .unwrap();

        match config {
            LlmProviderConfig::OpenAi(settings) => {
                assert_eq!(settings.model, "o1");
                assert!(settings.retry.is_none());
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_from_providers_by_name() {
        let providers = ProvidersConfig::default();

        for name in PROVIDER_NAMES {
            assert!(LlmProviderConfig::from_providers(&providers, name).is_ok());
        }

        let err = LlmProviderConfig::from_providers(&providers, "cohere").unwrap_err();
        assert!(err.to_string().contains("cohere"));
    }

    #[tokio::test]
    async fn test_create_openai_provider() {
        let credentials = MockCredentialProvider::new("mock")
            .with_credential(Credential::new(CredentialType::OpenAi, "sk-test".to_string()));

        let provider = factory(credentials)
            .create(&LlmProviderConfig::OpenAi(OpenAiSettings::default()))
            .await
            .unwrap();

        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model(), "gpt-4o");
    }

    #[tokio::test]
    async fn test_create_gemini_and_ollama_providers() {
        let credentials = MockCredentialProvider::new("mock")
            .with_credential(Credential::new(CredentialType::Gemini, "g-key".to_string()));
        let factory = factory(credentials);

        let gemini = factory
            .create(&LlmProviderConfig::Gemini(GeminiSettings::default()))
            .await
            .unwrap();
        assert_eq!(gemini.provider_name(), "gemini");

        // Ollama needs no credential.
        let ollama = factory
            .create(&LlmProviderConfig::Ollama(OllamaSettings::default()))
            .await
            .unwrap();
        assert_eq!(ollama.provider_name(), "ollama");
        assert_eq!(ollama.model(), "qwen2.5");
    }

    #[tokio::test]
    async fn test_missing_credential_fails() {
        let result = factory(MockCredentialProvider::new("mock"))
            .create(&LlmProviderConfig::Anthropic(AnthropicSettings::default()))
            .await;

        assert!(matches!(result, Err(DomainError::Credential { .. })));
    }

    #[tokio::test]
    async fn test_create_anthropic_with_bedrock_fallback() {
        let credentials = MockCredentialProvider::new("mock")
            .with_credential(Credential::new(CredentialType::Anthropic, "sk-ant".to_string()))
            .with_credential(bedrock_credential());

        let provider = factory(credentials)
            .create(&LlmProviderConfig::Anthropic(AnthropicSettings::default()))
            .await
            .unwrap();

        assert_eq!(provider.provider_name(), "anthropic");
        assert_eq!(provider.model(), "claude-3-7-sonnet-20250219");
    }

    #[tokio::test]
    async fn test_create_anthropic_without_fallback_skips_aws() {
        let credentials = MockCredentialProvider::new("mock")
            .with_credential(Credential::new(CredentialType::Anthropic, "sk-ant".to_string()));
        let settings = AnthropicSettings {
            bedrock_fallback: false,
            ..AnthropicSettings::default()
        };

        let provider = factory(credentials)
            .create(&LlmProviderConfig::Anthropic(settings))
            .await
            .unwrap();

        assert_eq!(provider.provider_name(), "anthropic");
    }

    #[tokio::test]
    async fn test_create_bedrock_from_credential() {
        let credentials = MockCredentialProvider::new("mock").with_credential(bedrock_credential());

        let provider = factory(credentials)
            .create(&LlmProviderConfig::AwsBedrock(BedrockSettings::default()))
            .await
            .unwrap();

        assert_eq!(provider.provider_name(), "bedrock");
        assert_eq!(provider.model(), "us.anthropic.claude-3-7-sonnet-20250219-v1:0");
    }

    #[tokio::test]
    async fn test_bedrock_credential_without_region_uses_settings_region() {
        let credential = Credential::new(CredentialType::AwsBedrock, "AKIATEST".to_string())
            .with_param("secret_key", "secret");
        let credentials = MockCredentialProvider::new("mock").with_credential(credential);
        let settings = BedrockSettings {
            region: Some("eu-west-1".to_string()),
            ..BedrockSettings::default()
        };

        let provider = factory(credentials)
            .create(&LlmProviderConfig::AwsBedrock(settings))
            .await
            .unwrap();

        assert_eq!(provider.provider_name(), "bedrock");
    }
}
