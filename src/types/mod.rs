//! Core protocol types.

pub mod message;
pub mod options;
pub mod stream;

pub use message::{
    AggregateMessage, ChatMessage, Envelope, ImageMessage, LegacyMessage, MultiModalMessage,
    MultiModalPart, Role, TextMessage, ToolCall, ToolCallMessage, ToolCallResultMessage,
};
pub use options::GenerateOptions;
pub use stream::{EnvelopeDelta, MessageDelta, StreamItem, TextDelta, ToolCallChunk, ToolCallDelta};
