//! Infrastructure layer - vendor adapters, credential sources and logging

pub mod credentials;
pub mod llm;
pub mod logging;
