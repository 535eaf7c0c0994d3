//! Providers command - lists adapters, their models and credential status

use crate::config::{AppConfig, ProvidersConfig};
use crate::domain::{CredentialProvider, CredentialType};
use crate::infrastructure::credentials::EnvCredentialProvider;
use crate::infrastructure::llm::{LlmProviderConfig, PROVIDER_NAMES};

/// Run the providers command
pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let credentials = EnvCredentialProvider::default();

    for line in describe(&config.providers, &credentials).await? {
        println!("{}", line);
    }

    Ok(())
}

/// One line per provider: name, configured model and credential status
async fn describe(
    providers: &ProvidersConfig,
    credentials: &dyn CredentialProvider,
) -> anyhow::Result<Vec<String>> {
    let mut lines = Vec::with_capacity(PROVIDER_NAMES.len());

    for name in PROVIDER_NAMES {
        let (model, credential_type) = match LlmProviderConfig::from_providers(providers, name)? {
            LlmProviderConfig::Anthropic(s) => (s.model, Some(CredentialType::Anthropic)),
            LlmProviderConfig::AwsBedrock(s) => (s.model, Some(CredentialType::AwsBedrock)),
            LlmProviderConfig::OpenAi(s) => (s.model, Some(CredentialType::OpenAi)),
            LlmProviderConfig::Gemini(s) => (s.model, Some(CredentialType::Gemini)),
            LlmProviderConfig::Ollama(s) => (s.model, None),
        };

        let status = match credential_type {
            Some(credential_type) => {
                if credentials.supports(&credential_type).await {
                    "ready"
                } else {
                    "missing credential"
                }
            }
            None => "no credential needed",
        };

        lines.push(format!("{:<10} {:<48} {}", name, model, status));
    }

    Ok(lines)
}
