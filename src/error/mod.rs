//! Error types for colloquy.

use thiserror::Error;

/// Primary error type for all colloquy operations.
///
/// Every failure is immediate and non-retried; no component downgrades
/// one into a partial result.
#[derive(Error, Debug)]
pub enum ColloquyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported content kind: {0}")]
    UnsupportedContentKind(String),

    #[error("Image content has no resolvable url")]
    AmbiguousContentReference,

    #[error("Only choice 0 is supported in streaming replies, got choice {0}")]
    InvalidStreamingChoice(u32),

    #[error("Multi-modal message authored by '{0}' cannot be replayed as its own output")]
    SelfAuthoredMultiModalRejected(String),

    #[error("Tool call authored by '{0}' cannot be replayed as its own output")]
    SelfAuthoredFunctionCallRejected(String),

    #[error("No executor registered for function '{0}'")]
    MissingFunctionExecutor(String),

    #[error("Unexpected message variant: {0}")]
    UnknownMessageVariant(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Tool execution error: {function_name}: {message}")]
    ToolExecution {
        function_name: String,
        message: String,
    },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation canceled")]
    Canceled,
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ColloquyError>;
