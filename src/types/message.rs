//! Chat message variants exchanged between agents.

use serde::{Deserialize, Serialize};

use crate::error::{ColloquyError, Result};

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Plain text message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub content: String,
    pub author: String,
}

impl TextMessage {
    pub fn new(role: Role, content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            content: content.into(),
            author: author.into(),
        }
    }
}

/// Image message referencing content by URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub url: String,
    pub author: String,
}

impl ImageMessage {
    pub fn new(role: Role, url: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            url: url.into(),
            author: author.into(),
        }
    }
}

/// A single part of a multi-modal message. Only text and image parts are
/// admitted, so multi-modal nesting is unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MultiModalPart {
    Text(TextMessage),
    Image(ImageMessage),
}

/// Ordered multi-part message mixing text and images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiModalMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub parts: Vec<MultiModalPart>,
    pub author: String,
}

impl MultiModalMessage {
    /// Create a multi-modal message. Fails on an empty part sequence.
    pub fn new(
        role: Role,
        parts: Vec<MultiModalPart>,
        author: impl Into<String>,
    ) -> Result<Self> {
        if parts.is_empty() {
            return Err(ColloquyError::InvalidMessage(
                "multi-modal message requires at least one part".into(),
            ));
        }
        Ok(Self {
            role: Some(role),
            parts,
            author: author.into(),
        })
    }
}

/// A structured request to invoke a named function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub function_name: String,
    /// Serialized (typically JSON) arguments.
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl ToolCall {
    pub fn new(function_name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            arguments: arguments.into(),
            id: None,
            result: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }
}

/// One or more tool calls requested in a single reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallMessage {
    pub calls: Vec<ToolCall>,
    pub author: String,
}

impl ToolCallMessage {
    pub fn new(calls: Vec<ToolCall>, author: impl Into<String>) -> Self {
        Self {
            calls,
            author: author.into(),
        }
    }

    pub fn single(call: ToolCall, author: impl Into<String>) -> Self {
        Self::new(vec![call], author)
    }
}

/// Results for previously requested tool calls, in request order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResultMessage {
    pub calls: Vec<ToolCall>,
    pub author: String,
}

impl ToolCallResultMessage {
    pub fn new(calls: Vec<ToolCall>, author: impl Into<String>) -> Self {
        Self {
            calls,
            author: author.into(),
        }
    }
}

/// A tool-call request bundled with its already-computed results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateMessage {
    pub first: ToolCallMessage,
    pub second: ToolCallResultMessage,
}

impl AggregateMessage {
    /// Bundle a request with its results. The result sequence must be
    /// index-aligned with the request sequence.
    pub fn new(first: ToolCallMessage, second: ToolCallResultMessage) -> Result<Self> {
        if first.calls.len() != second.calls.len() {
            return Err(ColloquyError::InvalidMessage(format!(
                "aggregate message requires index-aligned calls, got {} requests and {} results",
                first.calls.len(),
                second.calls.len()
            )));
        }
        Ok(Self { first, second })
    }
}

/// Opaque backend-native payload carried through the protocol.
///
/// Participates only by exposing `author`, `role` and the serialized
/// payload; the content connector is the sole component that decodes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub author: String,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(author: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            role: None,
            author: author.into(),
            payload,
        }
    }
}

/// Deprecated compatibility shim with loosely-typed optional fields.
///
/// Validity depends on which fields are populated; the connector
/// preserves the legacy combination rules when normalizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegacyMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_arguments: Option<String>,
    pub author: String,
}

/// The closed set of messages understood by every component.
///
/// Adding a variant forces every exhaustive match in the crate to handle
/// it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessage {
    Text(TextMessage),
    Image(ImageMessage),
    MultiModal(MultiModalMessage),
    ToolCall(ToolCallMessage),
    ToolCallResult(ToolCallResultMessage),
    Aggregate(AggregateMessage),
    Envelope(Envelope),
    Legacy(LegacyMessage),
}

impl ChatMessage {
    /// Who authored this message.
    pub fn author(&self) -> &str {
        match self {
            Self::Text(m) => &m.author,
            Self::Image(m) => &m.author,
            Self::MultiModal(m) => &m.author,
            Self::ToolCall(m) => &m.author,
            Self::ToolCallResult(m) => &m.author,
            Self::Aggregate(m) => &m.second.author,
            Self::Envelope(m) => &m.author,
            Self::Legacy(m) => &m.author,
        }
    }

    /// The declared conversation role, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Text(m) => m.role,
            Self::Image(m) => m.role,
            Self::MultiModal(m) => m.role,
            Self::ToolCall(_) | Self::ToolCallResult(_) | Self::Aggregate(_) => None,
            Self::Envelope(m) => m.role,
            Self::Legacy(m) => m.role,
        }
    }

    /// Rendered text content, concatenating all text-bearing parts.
    ///
    /// Tool results render their result strings joined by newlines, so a
    /// self-executed aggregate reads as its results.
    pub fn text(&self) -> String {
        match self {
            Self::Text(m) => m.content.clone(),
            Self::Image(_) => String::new(),
            Self::MultiModal(m) => m
                .parts
                .iter()
                .filter_map(|p| match p {
                    MultiModalPart::Text(t) => Some(t.content.as_str()),
                    MultiModalPart::Image(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::ToolCall(_) => String::new(),
            Self::ToolCallResult(m) => m
                .calls
                .iter()
                .filter_map(|c| c.result.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Aggregate(m) => m
                .second
                .calls
                .iter()
                .filter_map(|c| c.result.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Envelope(_) => String::new(),
            Self::Legacy(m) => m.content.clone().unwrap_or_default(),
        }
    }

    /// Variant name for diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::MultiModal(_) => "multi_modal",
            Self::ToolCall(_) => "tool_call",
            Self::ToolCallResult(_) => "tool_call_result",
            Self::Aggregate(_) => "aggregate",
            Self::Envelope(_) => "envelope",
            Self::Legacy(_) => "legacy",
        }
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} from {}: {}", self.variant_name(), self.author(), self.text())
    }
}

impl From<TextMessage> for ChatMessage {
    fn from(m: TextMessage) -> Self {
        Self::Text(m)
    }
}

impl From<ImageMessage> for ChatMessage {
    fn from(m: ImageMessage) -> Self {
        Self::Image(m)
    }
}

impl From<MultiModalMessage> for ChatMessage {
    fn from(m: MultiModalMessage) -> Self {
        Self::MultiModal(m)
    }
}

impl From<ToolCallMessage> for ChatMessage {
    fn from(m: ToolCallMessage) -> Self {
        Self::ToolCall(m)
    }
}

impl From<ToolCallResultMessage> for ChatMessage {
    fn from(m: ToolCallResultMessage) -> Self {
        Self::ToolCallResult(m)
    }
}

impl From<AggregateMessage> for ChatMessage {
    fn from(m: AggregateMessage) -> Self {
        Self::Aggregate(m)
    }
}

impl From<Envelope> for ChatMessage {
    fn from(m: Envelope) -> Self {
        Self::Envelope(m)
    }
}

impl From<LegacyMessage> for ChatMessage {
    fn from(m: LegacyMessage) -> Self {
        Self::Legacy(m)
    }
}
