//! Tool-call recognition and dispatch.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{Agent, ReplyStream, StreamingAgent};
use crate::aggregator::StreamingAggregator;
use crate::error::{ColloquyError, Result};
use crate::tools::{FunctionContract, FunctionMap};
use crate::types::{
    AggregateMessage, ChatMessage, StreamItem, ToolCall, ToolCallResultMessage,
};

use super::{Middleware, MiddlewareContext, StreamingMiddleware};

/// Recognizes tool-call requests in a reply and optionally executes them.
///
/// Contracts are advertised to the backend by appending them to the
/// request options; whether to call is the backend's decision. When a
/// dispatch table is configured and covers every requested call, the
/// calls are executed and the reply becomes an [`AggregateMessage`]
/// bundling request and results. A request the table does not fully
/// cover passes through untouched for out-of-band execution.
pub struct FunctionCallMiddleware {
    contracts: Vec<FunctionContract>,
    functions: Option<FunctionMap>,
}

impl FunctionCallMiddleware {
    pub fn new(contracts: Vec<FunctionContract>, functions: Option<FunctionMap>) -> Self {
        Self {
            contracts,
            functions,
        }
    }

    /// Middleware that only advertises contracts, never self-executes.
    pub fn advertising(contracts: Vec<FunctionContract>) -> Self {
        Self::new(contracts, None)
    }

    fn advertise(&self, context: &mut MiddlewareContext) {
        if !self.contracts.is_empty() {
            context.options.functions.extend(self.contracts.iter().cloned());
        }
    }

    fn coverage<'a>(&'a self, calls: &[ToolCall]) -> Option<&'a FunctionMap> {
        self.functions
            .as_ref()
            .filter(|map| calls.iter().all(|call| map.contains(&call.function_name)))
    }
}

/// Run every call through its executor, in request order, reassembling
/// results index-aligned.
async fn execute_calls(
    map: &FunctionMap,
    calls: &[ToolCall],
    cancel: &CancellationToken,
) -> Result<Vec<ToolCall>> {
    let mut completed = Vec::with_capacity(calls.len());
    for call in calls {
        let executor = map.get(&call.function_name).ok_or_else(|| {
            ColloquyError::MissingFunctionExecutor(call.function_name.clone())
        })?;
        let execution = executor(call.arguments.clone());
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(ColloquyError::Canceled),
            result = execution => result.map_err(|err| ColloquyError::ToolExecution {
                function_name: call.function_name.clone(),
                message: err.to_string(),
            })?,
        };
        debug!(function = %call.function_name, "tool call executed");
        completed.push(call.clone().with_result(result));
    }
    Ok(completed)
}

#[async_trait]
impl Middleware for FunctionCallMiddleware {
    fn name(&self) -> &str {
        "FunctionCallMiddleware"
    }

    async fn invoke(
        &self,
        mut context: MiddlewareContext,
        next: &dyn Agent,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        // An incoming bare tool-call request is executed directly, without
        // consulting the agent. No pass-through exists on this path.
        if let Some(ChatMessage::ToolCall(request)) = context.messages.last() {
            let map = self.functions.as_ref().ok_or_else(|| {
                ColloquyError::MissingFunctionExecutor(
                    request
                        .calls
                        .first()
                        .map(|call| call.function_name.clone())
                        .unwrap_or_default(),
                )
            })?;
            let results = execute_calls(map, &request.calls, cancel).await?;
            return Ok(ToolCallResultMessage::new(results, next.name().to_string()).into());
        }

        self.advertise(&mut context);
        let reply = next
            .generate_reply(&context.messages, &context.options, cancel)
            .await?;
        match reply {
            ChatMessage::ToolCall(request) => match self.coverage(&request.calls) {
                Some(map) => {
                    let results = execute_calls(map, &request.calls, cancel).await?;
                    let result_message =
                        ToolCallResultMessage::new(results, request.author.clone());
                    Ok(AggregateMessage::new(request, result_message)?.into())
                }
                None => Ok(request.into()),
            },
            other => Ok(other),
        }
    }
}

#[async_trait]
impl StreamingMiddleware for FunctionCallMiddleware {
    fn name(&self) -> &str {
        "FunctionCallMiddleware"
    }

    async fn invoke_streaming(
        &self,
        mut context: MiddlewareContext,
        next: &dyn StreamingAgent,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        if let Some(ChatMessage::ToolCall(request)) = context.messages.last() {
            let map = self.functions.as_ref().ok_or_else(|| {
                ColloquyError::MissingFunctionExecutor(
                    request
                        .calls
                        .first()
                        .map(|call| call.function_name.clone())
                        .unwrap_or_default(),
                )
            })?;
            let results = execute_calls(map, &request.calls, cancel).await?;
            let reply: ChatMessage =
                ToolCallResultMessage::new(results, next.name().to_string()).into();
            return Ok(Box::pin(tokio_stream::iter(vec![Ok(
                StreamItem::Completed(reply),
            )])));
        }

        self.advertise(&mut context);
        let inner = next
            .generate_streaming_reply(&context.messages, &context.options, cancel)
            .await?;
        let functions = self.functions.clone();
        let cancel = cancel.clone();
        Ok(Box::pin(async_stream::stream! {
            let mut inner = inner;
            let mut aggregator = StreamingAggregator::new();
            let mut pending_request = None;
            loop {
                let item = tokio::select! {
                    _ = cancel.cancelled() => {
                        yield Err(ColloquyError::Canceled);
                        return;
                    }
                    item = inner.next() => item,
                };
                let Some(item) = item else { break };
                match item {
                    Ok(StreamItem::Delta(delta)) => {
                        if let Err(err) = aggregator.apply(&delta) {
                            yield Err(err);
                            return;
                        }
                        yield Ok(StreamItem::Delta(delta));
                    }
                    // A completed tool-call reply is held back; it either
                    // becomes the terminal aggregate or is re-emitted bare.
                    Ok(StreamItem::Completed(ChatMessage::ToolCall(request))) => {
                        pending_request = Some(request);
                    }
                    Ok(item) => yield Ok(item),
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }

            let request = match pending_request {
                Some(request) => Some(request),
                None if !aggregator.is_empty() => match aggregator.finish() {
                    Ok(ChatMessage::ToolCall(request)) => Some(request),
                    Ok(_) => None,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                },
                None => None,
            };
            let Some(request) = request else { return };

            let covered = functions.as_ref().filter(|map| {
                request
                    .calls
                    .iter()
                    .all(|call| map.contains(&call.function_name))
            });
            match covered {
                Some(map) => match execute_calls(map, &request.calls, &cancel).await {
                    Ok(results) => {
                        let result_message =
                            ToolCallResultMessage::new(results, request.author.clone());
                        match AggregateMessage::new(request, result_message) {
                            Ok(aggregate) => {
                                yield Ok(StreamItem::Completed(aggregate.into()));
                            }
                            Err(err) => yield Err(err),
                        }
                    }
                    Err(err) => yield Err(err),
                },
                None => yield Ok(StreamItem::Completed(request.into())),
            }
        }))
    }
}
