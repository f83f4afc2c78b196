//! Composable behaviors wrapped around an agent's reply contracts.

pub mod agent;
pub mod function_call;
pub mod logging;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, ReplyStream, StreamingAgent};
use crate::error::Result;
use crate::types::{ChatMessage, GenerateOptions};

pub use agent::MiddlewareAgent;
pub use function_call::FunctionCallMiddleware;
pub use logging::LoggingMiddleware;

/// Per-invocation view of the incoming request. Middlewares may rewrite
/// either field before calling the continuation.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    pub messages: Vec<ChatMessage>,
    pub options: GenerateOptions,
}

impl MiddlewareContext {
    pub fn new(messages: Vec<ChatMessage>, options: GenerateOptions) -> Self {
        Self { messages, options }
    }
}

/// A behavior layered around the one-shot reply contract.
///
/// The continuation is the downstream agent (or the next middleware in);
/// a middleware may rewrite the context, post-process the reply, or
/// short-circuit by not calling it.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    async fn invoke(
        &self,
        context: MiddlewareContext,
        next: &dyn Agent,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage>;
}

/// A behavior layered around the streaming reply contract.
///
/// Registered separately from [`Middleware`]: streaming requires
/// per-fragment transformation logic, so neither chain is derived from
/// the other.
#[async_trait]
pub trait StreamingMiddleware: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    async fn invoke_streaming(
        &self,
        context: MiddlewareContext,
        next: &dyn StreamingAgent,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream>;
}

/// Closure-based one-shot middleware.
pub struct MiddlewareFn<F> {
    name: String,
    f: F,
}

/// Build a middleware from a closure.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(
            MiddlewareContext,
            &'a dyn Agent,
            &'a CancellationToken,
        ) -> BoxFuture<'a, Result<ChatMessage>>
        + Send
        + Sync,
{
    MiddlewareFn { name: name.into(), f }
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(
            MiddlewareContext,
            &'a dyn Agent,
            &'a CancellationToken,
        ) -> BoxFuture<'a, Result<ChatMessage>>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        context: MiddlewareContext,
        next: &dyn Agent,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        (self.f)(context, next, cancel).await
    }
}
