use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Type of credential (which LLM provider it belongs to)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Anthropic,
    OpenAi,
    Gemini,
    AwsBedrock,
}

/// Credential entity containing API keys and secrets
#[derive(Clone)]
pub struct Credential {
    credential_type: CredentialType,
    api_key: String,
    additional_params: HashMap<String, String>,
}

impl Credential {
    pub fn new(credential_type: CredentialType, api_key: String) -> Self {
        Self {
            credential_type,
            api_key,
            additional_params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_params.insert(key.into(), value.into());
        self
    }

    pub fn credential_type(&self) -> &CredentialType {
        &self.credential_type
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn get_param(&self, key: &str) -> Option<&String> {
        self.additional_params.get(key)
    }

    /// Fetch a parameter that must be present
    pub fn require_param(&self, key: &str) -> Result<&str, crate::domain::DomainError> {
        self.get_param(key).map(String::as_str).ok_or_else(|| {
            crate::domain::DomainError::credential(format!(
                "Credential '{}' is missing parameter '{}'",
                self.credential_type, key
            ))
        })
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("credential_type", &self.credential_type)
            .field("api_key", &"***")
            .field("params", &self.additional_params.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialType::Anthropic => write!(f, "anthropic"),
            CredentialType::OpenAi => write!(f, "openai"),
            CredentialType::Gemini => write!(f, "gemini"),
            CredentialType::AwsBedrock => write!(f, "aws_bedrock"),
        }
    }
}
