//! Convenience re-exports.

pub use crate::agent::{Agent, BackendAgent, DefaultReplyAgent, ReplyStream, StreamingAgent};
pub use crate::aggregator::{collect_reply, StreamingAggregator};
pub use crate::connector::{ChatContentConnector, Perspective};
pub use crate::conversation::{
    ChatOutcome, Conversation, Orchestrator, SpeakerSelection, StopReason, TERMINATE,
};
pub use crate::error::{ColloquyError, Result};
pub use crate::middleware::{
    from_fn, FunctionCallMiddleware, LoggingMiddleware, Middleware, MiddlewareAgent,
    MiddlewareContext, StreamingMiddleware,
};
pub use crate::tools::{ContractParameter, FunctionContract, FunctionMap};
pub use crate::types::{
    AggregateMessage, ChatMessage, Envelope, GenerateOptions, ImageMessage, LegacyMessage,
    MessageDelta, MultiModalMessage, MultiModalPart, Role, StreamItem, TextDelta, TextMessage,
    ToolCall, ToolCallChunk, ToolCallDelta, ToolCallMessage, ToolCallResultMessage,
};
