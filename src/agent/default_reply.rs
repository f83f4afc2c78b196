//! Agent answering every turn with a fixed reply.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{ChatMessage, GenerateOptions, MessageDelta, Role, StreamItem, TextDelta, TextMessage};

use super::{Agent, ReplyStream, StreamingAgent};

/// A backend-less agent with a canned answer. Handy as a conversation
/// participant and in tests.
#[derive(Debug, Clone)]
pub struct DefaultReplyAgent {
    name: String,
    reply: String,
}

impl DefaultReplyAgent {
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl Agent for DefaultReplyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_reply(
        &self,
        _history: &[ChatMessage],
        _options: &GenerateOptions,
        _cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        Ok(TextMessage::new(Role::Assistant, self.reply.clone(), self.name.clone()).into())
    }
}

#[async_trait]
impl StreamingAgent for DefaultReplyAgent {
    async fn generate_streaming_reply(
        &self,
        _history: &[ChatMessage],
        _options: &GenerateOptions,
        _cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        let delta = TextDelta::new(Role::Assistant, self.reply.clone(), self.name.clone());
        Ok(Box::pin(tokio_stream::iter(vec![Ok(StreamItem::Delta(
            MessageDelta::Text(delta),
        ))])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_with_fixed_text() {
        let agent = DefaultReplyAgent::new("assistant", "hello world");
        let reply = agent.send(&[]).await.unwrap();
        assert_eq!(reply.text(), "hello world");
        assert_eq!(reply.author(), "assistant");
        assert_eq!(reply.role(), Some(Role::Assistant));
    }
}
