use std::fmt;

use thiserror::Error;

/// Classification of an upstream provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection, DNS, TLS or timeout failure before a response arrived
    Transport,
    /// HTTP 429 or a vendor throttling error
    RateLimited,
    /// HTTP 5xx or vendor overload
    Server,
    /// HTTP 401/403
    Auth,
    /// Any other 4xx; the request itself is wrong
    InvalidRequest,
    /// The response body could not be decoded
    Malformed,
}

impl ProviderErrorKind {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            401 | 403 => Self::Auth,
            408 => Self::Transport,
            500..=599 => Self::Server,
            _ => Self::InvalidRequest,
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::RateLimited | Self::Server)
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::RateLimited => "rate_limited",
            Self::Server => "server",
            Self::Auth => "auth",
            Self::InvalidRequest => "invalid_request",
            Self::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Provider error: {provider} ({kind}) - {message}")]
    Provider {
        provider: String,
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("Unexpected response shape from {provider}: {message}")]
    ResponseShape { provider: String, message: String },

    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn provider(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::provider(provider, ProviderErrorKind::Transport, message)
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::provider(provider, ProviderErrorKind::Malformed, message)
    }

    pub fn response_shape(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResponseShape {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Only transport, throttling and server-side provider failures are retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { kind, .. } => kind.is_retryable(),
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
