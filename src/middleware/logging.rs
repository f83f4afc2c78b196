//! Reply logging through the tracing facade.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{Agent, ReplyStream, StreamingAgent};
use crate::error::Result;
use crate::types::{ChatMessage, StreamItem};

use super::{Middleware, MiddlewareContext, StreamingMiddleware};

/// Logs every reply and streaming fragment count. Never alters the
/// reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "LoggingMiddleware"
    }

    async fn invoke(
        &self,
        context: MiddlewareContext,
        next: &dyn Agent,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let history_len = context.messages.len();
        let reply = next
            .generate_reply(&context.messages, &context.options, cancel)
            .await?;
        debug!(agent = next.name(), history = history_len, reply = %reply, "reply generated");
        Ok(reply)
    }
}

#[async_trait]
impl StreamingMiddleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "LoggingMiddleware"
    }

    async fn invoke_streaming(
        &self,
        context: MiddlewareContext,
        next: &dyn StreamingAgent,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        let inner = next
            .generate_streaming_reply(&context.messages, &context.options, cancel)
            .await?;
        let agent = next.name().to_string();
        Ok(Box::pin(async_stream::stream! {
            let mut inner = inner;
            let mut fragments = 0usize;
            while let Some(item) = inner.next().await {
                if matches!(&item, Ok(StreamItem::Delta(_))) {
                    fragments += 1;
                }
                yield item;
            }
            debug!(agent = %agent, fragments, "reply stream finished");
        }))
    }
}
