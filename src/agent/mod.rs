//! Agent contracts and built-in agents.

pub mod backend;
pub mod default_reply;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{ChatMessage, GenerateOptions, StreamItem};

pub use backend::BackendAgent;
pub use default_reply::DefaultReplyAgent;

/// Lazily pulled reply sequence. Finite, single-pass, not restartable.
pub type ReplyStream = BoxStream<'static, Result<StreamItem>>;

/// A reply-generating unit.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The agent's name; also the authorship tag on its replies.
    fn name(&self) -> &str;

    /// Produce one reply to the given history.
    async fn generate_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage>;

    /// One-shot send with default options and a fresh cancellation token.
    async fn send(&self, history: &[ChatMessage]) -> Result<ChatMessage> {
        self.generate_reply(history, &GenerateOptions::default(), &CancellationToken::new())
            .await
    }
}

/// An agent that can additionally stream its reply incrementally.
#[async_trait]
pub trait StreamingAgent: Agent {
    /// Produce a reply as an ordered fragment sequence.
    async fn generate_streaming_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream>;
}
