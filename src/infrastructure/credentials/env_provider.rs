use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;

use crate::domain::{Credential, CredentialProvider, CredentialType, DomainError};

/// Extra credential parameter read from its own variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvParam {
    pub name: String,
    pub env_var: String,
    pub required: bool,
}

/// Environment variable mappings for each credential type
#[derive(Debug, Clone)]
pub struct EnvMapping {
    pub api_key_var: String,
    pub params: Vec<EnvParam>,
}

impl EnvMapping {
    pub fn new(api_key_var: impl Into<String>) -> Self {
        Self {
            api_key_var: api_key_var.into(),
            params: Vec::new(),
        }
    }

    /// Parameter that must be set for the credential to resolve
    pub fn with_required_var(self, name: impl Into<String>, env_var: impl Into<String>) -> Self {
        self.with_param(name, env_var, true)
    }

    /// Parameter copied only when set
    pub fn with_var(self, name: impl Into<String>, env_var: impl Into<String>) -> Self {
        self.with_param(name, env_var, false)
    }

    fn with_param(
        mut self,
        name: impl Into<String>,
        env_var: impl Into<String>,
        required: bool,
    ) -> Self {
        self.params.push(EnvParam {
            name: name.into(),
            env_var: env_var.into(),
            required,
        });
        self
    }
}

type VarSource = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Credential provider that reads from environment variables.
///
/// Variables are read on every lookup, so a provider built after a variable
/// changes sees the new value.
pub struct EnvCredentialProvider {
    mappings: HashMap<CredentialType, EnvMapping>,
    source: VarSource,
}

impl fmt::Debug for EnvCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCredentialProvider")
            .field("mappings", &self.mappings)
            .finish_non_exhaustive()
    }
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
            source: Arc::new(|name| env::var(name).ok()),
        }
    }

    /// Resolve variables through `source` instead of the process environment
    pub fn with_source(
        mut self,
        source: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.source = Arc::new(source);
        self
    }

    pub fn with_mapping(mut self, credential_type: CredentialType, mapping: EnvMapping) -> Self {
        self.mappings.insert(credential_type, mapping);
        self
    }

    pub fn with_defaults(mut self) -> Self {
        self.mappings.insert(
            CredentialType::Anthropic,
            EnvMapping::new("ANTHROPIC_API_KEY"),
        );

        self.mappings.insert(
            CredentialType::OpenAi,
            EnvMapping::new("OPENAI_API_KEY"),
        );

        self.mappings.insert(
            CredentialType::Gemini,
            EnvMapping::new("GEMINI_API_KEY"),
        );

        self.mappings.insert(
            CredentialType::AwsBedrock,
            EnvMapping::new("AWS_ACCESS_KEY_ID")
                .with_required_var("secret_key", "AWS_SECRET_ACCESS_KEY")
                .with_required_var("region", "AWS_REGION")
                .with_var("session_token", "AWS_SESSION_TOKEN"),
        );

        self
    }

    fn lookup(&self, name: &str) -> Option<String> {
        (self.source)(name).filter(|value| !value.is_empty())
    }

    fn read_credential(&self, credential_type: &CredentialType) -> Result<Credential, DomainError> {
        let mapping = self.mappings.get(credential_type).ok_or_else(|| {
            DomainError::credential(format!(
                "No environment mapping configured for credential type: {}",
                credential_type
            ))
        })?;

        let missing = |var: &str| {
            DomainError::credential(format!(
                "Environment variable '{}' not set for credential type: {}",
                var, credential_type
            ))
        };

        let api_key = self
            .lookup(&mapping.api_key_var)
            .ok_or_else(|| missing(&mapping.api_key_var))?;

        let mut credential = Credential::new(credential_type.clone(), api_key);

        for param in &mapping.params {
            match self.lookup(&param.env_var) {
                Some(value) => credential = credential.with_param(&param.name, value),
                None if param.required => return Err(missing(&param.env_var)),
                None => {}
            }
        }

        Ok(credential)
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new().with_defaults()
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn get_credential(
        &self,
        credential_type: &CredentialType,
    ) -> Result<Credential, DomainError> {
        self.read_credential(credential_type)
    }

    async fn supports(&self, credential_type: &CredentialType) -> bool {
        self.read_credential(credential_type).is_ok()
    }

    fn provider_name(&self) -> &'static str {
        "env"
    }
}
