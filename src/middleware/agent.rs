//! Pipeline composition: wrapping an agent in ordered middleware chains.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, ReplyStream, StreamingAgent};
use crate::error::Result;
use crate::types::{ChatMessage, GenerateOptions};

use super::{Middleware, MiddlewareContext, StreamingMiddleware};

/// An agent wrapped in two independently registered middleware chains,
/// one per contract.
///
/// Registration is non-mutating composition: each `register_*` consumes
/// the pipeline and returns a new one. The last-registered middleware is
/// outermost on both contracts, so its after-side processing is the
/// first the outside caller sees.
pub struct MiddlewareAgent<A> {
    inner: A,
    middlewares: Vec<Arc<dyn Middleware>>,
    streaming_middlewares: Vec<Arc<dyn StreamingMiddleware>>,
}

impl<A> MiddlewareAgent<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            middlewares: Vec::new(),
            streaming_middlewares: Vec::new(),
        }
    }

    /// Wrap the one-shot contract in another middleware layer.
    pub fn register_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Wrap the streaming contract in another middleware layer.
    pub fn register_streaming_middleware(
        mut self,
        middleware: impl StreamingMiddleware + 'static,
    ) -> Self {
        self.streaming_middlewares.push(Arc::new(middleware));
        self
    }

    /// Registered one-shot middleware names, innermost first.
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Registered streaming middleware names, innermost first.
    pub fn streaming_middleware_names(&self) -> Vec<&str> {
        self.streaming_middlewares.iter().map(|m| m.name()).collect()
    }
}

/// Continuation over the remaining one-shot layers.
struct Chain<'a> {
    inner: &'a dyn Agent,
    layers: &'a [Arc<dyn Middleware>],
}

#[async_trait]
impl Agent for Chain<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        match self.layers.split_last() {
            Some((outermost, rest)) => {
                let next = Chain {
                    inner: self.inner,
                    layers: rest,
                };
                let context = MiddlewareContext::new(history.to_vec(), options.clone());
                outermost.invoke(context, &next, cancel).await
            }
            None => self.inner.generate_reply(history, options, cancel).await,
        }
    }
}

/// Continuation over the remaining streaming layers.
struct StreamingChain<'a> {
    inner: &'a dyn StreamingAgent,
    layers: &'a [Arc<dyn StreamingMiddleware>],
}

#[async_trait]
impl Agent for StreamingChain<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        self.inner.generate_reply(history, options, cancel).await
    }
}

#[async_trait]
impl StreamingAgent for StreamingChain<'_> {
    async fn generate_streaming_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        match self.layers.split_last() {
            Some((outermost, rest)) => {
                let next = StreamingChain {
                    inner: self.inner,
                    layers: rest,
                };
                let context = MiddlewareContext::new(history.to_vec(), options.clone());
                outermost.invoke_streaming(context, &next, cancel).await
            }
            None => {
                self.inner
                    .generate_streaming_reply(history, options, cancel)
                    .await
            }
        }
    }
}

#[async_trait]
impl<A: Agent> Agent for MiddlewareAgent<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let chain = Chain {
            inner: &self.inner,
            layers: &self.middlewares,
        };
        chain.generate_reply(history, options, cancel).await
    }
}

#[async_trait]
impl<A: StreamingAgent> StreamingAgent for MiddlewareAgent<A> {
    async fn generate_streaming_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        let chain = StreamingChain {
            inner: &self.inner,
            layers: &self.streaming_middlewares,
        };
        chain.generate_streaming_reply(history, options, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DefaultReplyAgent;
    use crate::middleware::from_fn;
    use crate::types::{Role, TextMessage};

    fn tagging(tag: &'static str) -> impl Middleware {
        from_fn(tag, move |context, next, cancel| {
            Box::pin(async move {
                let reply = next
                    .generate_reply(&context.messages, &context.options, cancel)
                    .await?;
                Ok(TextMessage::new(
                    Role::Assistant,
                    format!("{}:{}", tag, reply.text()),
                    reply.author().to_string(),
                )
                .into())
            })
        })
    }

    #[tokio::test]
    async fn last_registered_runs_outermost() {
        let agent = MiddlewareAgent::new(DefaultReplyAgent::new("a", "base"))
            .register_middleware(tagging("first"))
            .register_middleware(tagging("second"));

        let reply = agent.send(&[]).await.unwrap();
        // "second" wraps "first", so its after-side runs last.
        assert_eq!(reply.text(), "second:first:base");
    }

    #[tokio::test]
    async fn short_circuit_skips_downstream() {
        let agent = MiddlewareAgent::new(DefaultReplyAgent::new("a", "base")).register_middleware(
            from_fn("stop", |_context, _next, _cancel| {
                Box::pin(async move {
                    Ok(TextMessage::new(Role::Assistant, "short", "stop").into())
                })
            }),
        );

        let reply = agent.send(&[]).await.unwrap();
        assert_eq!(reply.text(), "short");
        assert_eq!(reply.author(), "stop");
    }
}
