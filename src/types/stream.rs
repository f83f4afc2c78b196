//! Streaming update types.

use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, Role};

/// An incremental piece of text content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub delta: String,
    pub author: String,
    /// Multi-choice backends report a choice index; only choice 0 is
    /// accepted anywhere in the pipeline.
    #[serde(default)]
    pub choice_index: u32,
}

impl TextDelta {
    pub fn new(role: Role, delta: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            delta: delta.into(),
            author: author.into(),
            choice_index: 0,
        }
    }
}

/// A partial tool call, identified by its call index.
///
/// Field payloads are character fragments to append, not replacements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallChunk {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallChunk {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            id: None,
            function_name: None,
            arguments: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }
}

/// An incremental piece of a tool-call request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallDelta {
    pub calls: Vec<ToolCallChunk>,
    pub author: String,
    #[serde(default)]
    pub choice_index: u32,
}

impl ToolCallDelta {
    pub fn new(calls: Vec<ToolCallChunk>, author: impl Into<String>) -> Self {
        Self {
            calls,
            author: author.into(),
            choice_index: 0,
        }
    }
}

/// Opaque backend-native streaming fragment, decoded only by the content
/// connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeDelta {
    pub author: String,
    pub payload: serde_json::Value,
}

/// One fragment of a logical message, consumed in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageDelta {
    Text(TextDelta),
    ToolCall(ToolCallDelta),
    Envelope(EnvelopeDelta),
}

impl MessageDelta {
    pub fn author(&self) -> &str {
        match self {
            Self::Text(d) => &d.author,
            Self::ToolCall(d) => &d.author,
            Self::Envelope(d) => &d.author,
        }
    }
}

/// Element of a reply stream: either a partial update or a completed
/// message. Mixed streams are intentional; consumers distinguish by kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum StreamItem {
    Delta(MessageDelta),
    Completed(ChatMessage),
}
