use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        /// Marks a prompt-cache breakpoint for vendors that support one
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        cache_control: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            cache_control: false,
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn new(role: MessageRole, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, vec![ContentBlock::text(content)])
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![ContentBlock::text(content)])
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, vec![ContentBlock::text(content)])
    }

    /// Mark every content block of this message as a cache breakpoint
    pub fn with_cache_control(mut self) -> Self {
        for block in &mut self.content {
            let ContentBlock::Text { cache_control, .. } = block;
            *cache_control = true;
        }
        self
    }

    /// Text of the first text block
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text, .. } => Some(text.as_str()),
        })
    }
}

/// A message list with a leading system message lifted out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversation<'a> {
    pub system: Option<&'a str>,
    pub turns: &'a [Message],
}

impl<'a> Conversation<'a> {
    /// Split off a leading system message.
    ///
    /// Only the first message is inspected; a system message anywhere else
    /// stays in `turns`.
    pub fn split(messages: &'a [Message]) -> Result<Self, DomainError> {
        let Some(first) = messages.first() else {
            return Err(DomainError::validation("Messages list cannot be empty"));
        };

        if first.role != MessageRole::System {
            return Ok(Self {
                system: None,
                turns: messages,
            });
        }

        let system = first
            .text()
            .ok_or_else(|| DomainError::validation("System message has no text content"))?;

        Ok(Self {
            system: Some(system),
            turns: &messages[1..],
        })
    }
}
