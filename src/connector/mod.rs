//! Bidirectional adapter between the message protocol and the backend's
//! native content shape.

pub mod native;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{Agent, ReplyStream, StreamingAgent};
use crate::error::{ColloquyError, Result};
use crate::middleware::{Middleware, MiddlewareContext, StreamingMiddleware};
use crate::types::{
    ChatMessage, Envelope, ImageMessage, LegacyMessage, MessageDelta, MultiModalMessage,
    MultiModalPart, Role, StreamItem, TextDelta, TextMessage,
};

use native::{AuthorRole, ChatContent, ContentItem, StreamingChatContent};

/// Whose message is being normalized, relative to the agent making the
/// backend call. Computed once per message and passed down explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    /// Authored by the calling agent itself.
    Own,
    /// Authored by another party.
    Other,
}

impl Perspective {
    pub fn of(author: &str, agent_name: &str) -> Self {
        if author == agent_name {
            Self::Own
        } else {
            Self::Other
        }
    }
}

/// Translates protocol messages to native content before the wrapped
/// agent runs and translates the native reply back afterwards.
///
/// Registered on both the one-shot and the streaming contract. The
/// wrapped agent is expected to consume and produce [`Envelope`]
/// messages carrying [`ChatContent`] payloads; anything else coming back
/// up is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatContentConnector;

impl ChatContentConnector {
    pub fn new() -> Self {
        Self
    }

    /// Translate a history into native contents, applying the
    /// perspective-dependent role policy per message.
    pub fn normalize_outgoing(
        &self,
        messages: &[ChatMessage],
        agent_name: &str,
    ) -> Result<Vec<ChatContent>> {
        let mut contents = Vec::with_capacity(messages.len());
        for message in messages {
            let perspective = Perspective::of(message.author(), agent_name);
            contents.extend(self.normalize_message(message, perspective)?);
        }
        Ok(contents)
    }

    fn normalize_message(
        &self,
        message: &ChatMessage,
        perspective: Perspective,
    ) -> Result<Vec<ChatContent>> {
        match message {
            // Already native: pass through unchanged.
            ChatMessage::Envelope(envelope) => {
                let content: ChatContent = serde_json::from_value(envelope.payload.clone())?;
                Ok(vec![content])
            }
            ChatMessage::Text(text) => Ok(vec![self.normalize_text(text, perspective)]),
            ChatMessage::Image(image) => self.normalize_image(image, perspective),
            ChatMessage::MultiModal(multi) => self.normalize_multi_modal(multi, perspective),
            ChatMessage::ToolCall(m) => {
                self.reject_tool_shape(&m.author, perspective, message.variant_name())
            }
            ChatMessage::ToolCallResult(m) => {
                self.reject_tool_shape(&m.author, perspective, message.variant_name())
            }
            ChatMessage::Aggregate(m) => {
                self.reject_tool_shape(&m.second.author, perspective, message.variant_name())
            }
            ChatMessage::Legacy(legacy) => self.normalize_legacy(legacy, perspective),
        }
    }

    fn normalize_text(&self, message: &TextMessage, perspective: Perspective) -> ChatContent {
        let role = match (message.role, perspective) {
            // System role survives regardless of perspective.
            (Some(Role::System), _) => AuthorRole::System,
            (_, Perspective::Own) => AuthorRole::Assistant,
            (_, Perspective::Other) => AuthorRole::User,
        };
        ChatContent::text(role, message.content.clone())
    }

    fn normalize_image(
        &self,
        message: &ImageMessage,
        perspective: Perspective,
    ) -> Result<Vec<ChatContent>> {
        match perspective {
            Perspective::Own => Err(ColloquyError::UnsupportedContentKind(format!(
                "image message authored by '{}' has no assistant-side projection",
                message.author
            ))),
            Perspective::Other => Ok(vec![ChatContent::new(
                AuthorRole::User,
                vec![ContentItem::Image {
                    url: Some(message.url.clone()),
                }],
            )]),
        }
    }

    fn normalize_multi_modal(
        &self,
        message: &MultiModalMessage,
        perspective: Perspective,
    ) -> Result<Vec<ChatContent>> {
        if perspective == Perspective::Own {
            return Err(ColloquyError::SelfAuthoredMultiModalRejected(
                message.author.clone(),
            ));
        }
        let items = message
            .parts
            .iter()
            .map(|part| match part {
                MultiModalPart::Text(text) => ContentItem::Text {
                    text: text.content.clone(),
                },
                MultiModalPart::Image(image) => ContentItem::Image {
                    url: Some(image.url.clone()),
                },
            })
            .collect();
        Ok(vec![ChatContent::new(AuthorRole::User, items)])
    }

    fn reject_tool_shape(
        &self,
        author: &str,
        perspective: Perspective,
        variant: &str,
    ) -> Result<Vec<ChatContent>> {
        match perspective {
            Perspective::Own => Err(ColloquyError::SelfAuthoredFunctionCallRejected(
                author.to_string(),
            )),
            Perspective::Other => Err(ColloquyError::UnsupportedContentKind(format!(
                "{variant} message from another party has no native projection"
            ))),
        }
    }

    /// Legacy combination rules, preserved from the compatibility shim:
    /// system role wins; content-only is plain text; function-fields-only
    /// is a tool shape; anything else is unsupported.
    fn normalize_legacy(
        &self,
        message: &LegacyMessage,
        perspective: Perspective,
    ) -> Result<Vec<ChatContent>> {
        if message.role == Some(Role::System) {
            return Ok(vec![ChatContent::text(
                AuthorRole::System,
                message.content.clone().unwrap_or_default(),
            )]);
        }
        match (&message.content, &message.function_name, &message.function_arguments) {
            (Some(content), None, None) => {
                let role = match perspective {
                    Perspective::Own => AuthorRole::Assistant,
                    Perspective::Other => AuthorRole::User,
                };
                Ok(vec![ChatContent::text(role, content.clone())])
            }
            (None, Some(_), Some(_)) => match perspective {
                Perspective::Own => Err(ColloquyError::SelfAuthoredFunctionCallRejected(
                    message.author.clone(),
                )),
                Perspective::Other => Err(ColloquyError::UnsupportedContentKind(
                    "legacy function call from another party has no native projection".into(),
                )),
            },
            _ => Err(ColloquyError::UnsupportedContentKind(
                "legacy message with unrecognized field combination".into(),
            )),
        }
    }

    /// Translate a native reply into a protocol message.
    ///
    /// A single item comes back unwrapped; multiple items are wrapped in
    /// a multi-modal message. Everything is tagged as assistant output of
    /// the backend agent.
    pub fn denormalize_incoming(
        &self,
        reply: &ChatContent,
        agent_name: &str,
    ) -> Result<ChatMessage> {
        let mut messages = Vec::with_capacity(reply.items.len());
        for item in &reply.items {
            messages.push(self.denormalize_item(item, agent_name)?);
        }
        match messages.len() {
            0 => Err(ColloquyError::UnsupportedContentKind(
                "native reply with no content items".into(),
            )),
            1 => Ok(match messages.remove(0) {
                MultiModalPart::Text(text) => text.into(),
                MultiModalPart::Image(image) => image.into(),
            }),
            _ => Ok(MultiModalMessage::new(Role::Assistant, messages, agent_name)?.into()),
        }
    }

    fn denormalize_item(&self, item: &ContentItem, agent_name: &str) -> Result<MultiModalPart> {
        match item {
            ContentItem::Text { text } => Ok(MultiModalPart::Text(TextMessage::new(
                Role::Assistant,
                text.clone(),
                agent_name,
            ))),
            ContentItem::Image { url: Some(url) } => Ok(MultiModalPart::Image(ImageMessage::new(
                Role::Assistant,
                url.clone(),
                agent_name,
            ))),
            ContentItem::Image { url: None } => Err(ColloquyError::AmbiguousContentReference),
            ContentItem::Unknown { kind } => {
                Err(ColloquyError::UnsupportedContentKind(kind.clone()))
            }
        }
    }

    /// Translate a native streaming fragment into a text update.
    pub fn denormalize_streaming_fragment(
        &self,
        fragment: &StreamingChatContent,
        agent_name: &str,
    ) -> Result<MessageDelta> {
        if fragment.choice_index > 0 {
            return Err(ColloquyError::InvalidStreamingChoice(fragment.choice_index));
        }
        Ok(MessageDelta::Text(TextDelta::new(
            Role::Assistant,
            fragment.content.clone().unwrap_or_default(),
            agent_name,
        )))
    }

    fn wrap_outgoing(&self, messages: &[ChatMessage], agent_name: &str) -> Result<Vec<ChatMessage>> {
        let contents = self.normalize_outgoing(messages, agent_name)?;
        debug!(
            agent = agent_name,
            messages = messages.len(),
            contents = contents.len(),
            "normalized outgoing history"
        );
        contents
            .into_iter()
            .map(|content| {
                Ok(Envelope::new(agent_name.to_string(), serde_json::to_value(&content)?).into())
            })
            .collect()
    }
}

#[async_trait]
impl Middleware for ChatContentConnector {
    fn name(&self) -> &str {
        "ChatContentConnector"
    }

    async fn invoke(
        &self,
        context: MiddlewareContext,
        next: &dyn Agent,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let envelopes = self.wrap_outgoing(&context.messages, next.name())?;
        let reply = next.generate_reply(&envelopes, &context.options, cancel).await?;
        match reply {
            ChatMessage::Envelope(envelope) => {
                let content: ChatContent = serde_json::from_value(envelope.payload)?;
                self.denormalize_incoming(&content, &envelope.author)
            }
            other => Err(ColloquyError::UnknownMessageVariant(
                other.variant_name().to_string(),
            )),
        }
    }
}

#[async_trait]
impl StreamingMiddleware for ChatContentConnector {
    fn name(&self) -> &str {
        "ChatContentConnector"
    }

    async fn invoke_streaming(
        &self,
        context: MiddlewareContext,
        next: &dyn StreamingAgent,
        cancel: &CancellationToken,
    ) -> Result<ReplyStream> {
        let envelopes = self.wrap_outgoing(&context.messages, next.name())?;
        let inner = next
            .generate_streaming_reply(&envelopes, &context.options, cancel)
            .await?;
        let connector = *self;
        Ok(Box::pin(async_stream::stream! {
            let mut inner = inner;
            while let Some(item) = inner.next().await {
                match item {
                    Ok(StreamItem::Delta(MessageDelta::Envelope(delta))) => {
                        let translated = serde_json::from_value::<StreamingChatContent>(delta.payload)
                            .map_err(ColloquyError::from)
                            .and_then(|fragment| {
                                connector.denormalize_streaming_fragment(&fragment, &delta.author)
                            });
                        match translated {
                            Ok(update) => yield Ok(StreamItem::Delta(update)),
                            Err(err) => {
                                yield Err(err);
                                return;
                            }
                        }
                    }
                    Ok(StreamItem::Completed(ChatMessage::Envelope(envelope))) => {
                        let translated = serde_json::from_value::<ChatContent>(envelope.payload)
                            .map_err(ColloquyError::from)
                            .and_then(|content| {
                                connector.denormalize_incoming(&content, &envelope.author)
                            });
                        match translated {
                            Ok(message) => yield Ok(StreamItem::Completed(message)),
                            Err(err) => {
                                yield Err(err);
                                return;
                            }
                        }
                    }
                    Ok(StreamItem::Delta(other)) => {
                        yield Err(ColloquyError::UnknownMessageVariant(format!(
                            "non-native streaming fragment from {}",
                            other.author()
                        )));
                        return;
                    }
                    Ok(StreamItem::Completed(other)) => {
                        yield Err(ColloquyError::UnknownMessageVariant(
                            other.variant_name().to_string(),
                        ));
                        return;
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }))
    }
}
