//! Credential provider implementations

mod env_provider;

pub use env_provider::{EnvCredentialProvider, EnvMapping, EnvParam};
