//! Shared test doubles: in-process backends and scripted agents.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use colloquy::connector::native::{
    AuthorRole, ChatBackend, ChatContent, ChatRequest, NativeStream, StreamingChatContent,
};
use colloquy::error::{ColloquyError, Result};
use colloquy::prelude::*;

/// Backend that echoes the last request content back unchanged.
pub struct EchoBackend;

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn complete(&self, request: ChatRequest) -> Result<ChatContent> {
        let last = request
            .contents
            .last()
            .ok_or_else(|| ColloquyError::Backend("empty request".into()))?;
        Ok(ChatContent::new(AuthorRole::Assistant, last.items.clone()))
    }

    async fn stream(&self, _request: ChatRequest) -> Result<NativeStream> {
        Err(ColloquyError::Backend("echo backend does not stream".into()))
    }
}

/// Backend replying with a fixed native content.
pub struct FixedBackend {
    pub reply: ChatContent,
}

#[async_trait]
impl ChatBackend for FixedBackend {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatContent> {
        Ok(self.reply.clone())
    }

    async fn stream(&self, _request: ChatRequest) -> Result<NativeStream> {
        Err(ColloquyError::Backend("fixed backend does not stream".into()))
    }
}

/// Backend yielding scripted streaming fragments.
pub struct StreamBackend {
    pub fragments: Vec<StreamingChatContent>,
}

#[async_trait]
impl ChatBackend for StreamBackend {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatContent> {
        Err(ColloquyError::Backend("stream backend only streams".into()))
    }

    async fn stream(&self, _request: ChatRequest) -> Result<NativeStream> {
        let fragments: Vec<Result<StreamingChatContent>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(fragments)))
    }
}

/// Backend that records the last request and echoes.
#[derive(Default)]
pub struct CaptureBackend {
    pub last_request: Arc<Mutex<Option<ChatRequest>>>,
}

#[async_trait]
impl ChatBackend for CaptureBackend {
    async fn complete(&self, request: ChatRequest) -> Result<ChatContent> {
        let reply = request
            .contents
            .last()
            .map(|content| ChatContent::new(AuthorRole::Assistant, content.items.clone()))
            .unwrap_or_else(|| ChatContent::text(AuthorRole::Assistant, ""));
        *self.last_request.lock().unwrap() = Some(request);
        Ok(reply)
    }

    async fn stream(&self, _request: ChatRequest) -> Result<NativeStream> {
        Err(ColloquyError::Backend("capture backend does not stream".into()))
    }
}

/// Backend whose stream never produces a fragment.
pub struct PendingBackend;

#[async_trait]
impl ChatBackend for PendingBackend {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatContent> {
        futures::future::pending().await
    }

    async fn stream(&self, _request: ChatRequest) -> Result<NativeStream> {
        Ok(Box::pin(futures::stream::pending()))
    }
}

/// Agent replying with scripted lines, one per turn.
pub struct ScriptedAgent {
    name: String,
    lines: Mutex<VecDeque<String>>,
}

impl ScriptedAgent {
    pub fn new(name: impl Into<String>, lines: &[&str]) -> Self {
        Self {
            name: name.into(),
            lines: Mutex::new(lines.iter().map(|line| line.to_string()).collect()),
        }
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_reply(
        &self,
        _history: &[ChatMessage],
        _options: &GenerateOptions,
        _cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let line = self
            .lines
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ColloquyError::Backend("script exhausted".into()))?;
        Ok(TextMessage::new(Role::Assistant, line, self.name.clone()).into())
    }
}

/// Agent replying with one fixed message.
pub struct FixedReplyAgent {
    name: String,
    reply: ChatMessage,
}

impl FixedReplyAgent {
    pub fn new(name: impl Into<String>, reply: ChatMessage) -> Self {
        Self {
            name: name.into(),
            reply,
        }
    }
}

#[async_trait]
impl Agent for FixedReplyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_reply(
        &self,
        _history: &[ChatMessage],
        _options: &GenerateOptions,
        _cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        Ok(self.reply.clone())
    }
}

/// Streaming agent yielding scripted stream items.
pub struct ScriptedStreamAgent {
    name: String,
    items: Vec<StreamItem>,
}

impl ScriptedStreamAgent {
    pub fn new(name: impl Into<String>, items: Vec<StreamItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }
}

#[async_trait]
impl Agent for ScriptedStreamAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_reply(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let stream = self
            .generate_streaming_reply(history, options, cancel)
            .await?;
        collect_reply(stream).await
    }
}

#[async_trait]
impl StreamingAgent for ScriptedStreamAgent {
    async fn generate_streaming_reply(
        &self,
        _history: &[ChatMessage],
        _options: &GenerateOptions,
        _cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        let items: Vec<Result<StreamItem>> = self.items.iter().cloned().map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(items)))
    }
}
