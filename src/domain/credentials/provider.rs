use async_trait::async_trait;
use std::fmt::Debug;

use super::{Credential, CredentialType};
use crate::domain::DomainError;

/// Source of provider credentials, read when a provider is constructed
#[async_trait]
pub trait CredentialProvider: Send + Sync + Debug {
    /// Get a credential by its type
    async fn get_credential(&self, credential_type: &CredentialType) -> Result<Credential, DomainError>;

    /// Whether a credential of this type can currently be resolved
    async fn supports(&self, credential_type: &CredentialType) -> bool;

    /// Get provider name for logging/debugging
    fn provider_name(&self) -> &'static str;
}
