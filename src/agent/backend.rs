//! Agent backed by an external generation backend.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connector::native::{ChatBackend, ChatRequest, FunctionDefinition};
use crate::error::{ColloquyError, Result};
use crate::types::{ChatMessage, Envelope, EnvelopeDelta, GenerateOptions, MessageDelta, StreamItem};

use super::{Agent, ReplyStream, StreamingAgent};

/// Adapts a [`ChatBackend`] to the agent contract.
///
/// Speaks native content only: every history message must be an
/// [`Envelope`] carrying the backend's native shape (a content connector
/// upstream takes care of that), and replies come back wrapped the same
/// way.
pub struct BackendAgent {
    name: String,
    backend: Arc<dyn ChatBackend>,
}

impl BackendAgent {
    pub fn new(name: impl Into<String>, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }

    fn build_request(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<ChatRequest> {
        let mut contents = Vec::with_capacity(history.len());
        for message in history {
            let ChatMessage::Envelope(envelope) = message else {
                return Err(ColloquyError::UnknownMessageVariant(
                    message.variant_name().to_string(),
                ));
            };
            contents.push(serde_json::from_value(envelope.payload.clone())?);
        }
        Ok(ChatRequest {
            contents,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stop_sequences: options.stop_sequences.clone(),
            functions: options
                .functions
                .iter()
                .map(FunctionDefinition::from_contract)
                .collect(),
        })
    }
}

#[async_trait]
impl Agent for BackendAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let request = self.build_request(history, options)?;
        debug!(agent = %self.name, contents = request.contents.len(), "backend completion");
        let reply = tokio::select! {
            _ = cancel.cancelled() => return Err(ColloquyError::Canceled),
            reply = self.backend.complete(request) => reply?,
        };
        Ok(Envelope::new(self.name.clone(), serde_json::to_value(&reply)?).into())
    }
}

#[async_trait]
impl StreamingAgent for BackendAgent {
    async fn generate_streaming_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        let request = self.build_request(history, options)?;
        debug!(agent = %self.name, contents = request.contents.len(), "backend stream");
        let native = tokio::select! {
            _ = cancel.cancelled() => return Err(ColloquyError::Canceled),
            stream = self.backend.stream(request) => stream?,
        };
        let author = self.name.clone();
        let cancel = cancel.clone();
        Ok(Box::pin(async_stream::stream! {
            let mut native = native;
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => {
                        yield Err(ColloquyError::Canceled);
                        return;
                    }
                    next = native.next() => next,
                };
                let Some(fragment) = next else { break };
                match fragment {
                    Ok(fragment) => match serde_json::to_value(&fragment) {
                        Ok(payload) => {
                            yield Ok(StreamItem::Delta(MessageDelta::Envelope(EnvelopeDelta {
                                author: author.clone(),
                                payload,
                            })));
                        }
                        Err(err) => {
                            yield Err(err.into());
                            return;
                        }
                    },
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }))
    }
}
