//! Reconstruction of a complete message from ordered streaming fragments.

use futures::StreamExt;

use crate::agent::ReplyStream;
use crate::error::{ColloquyError, Result};
use crate::types::{
    ChatMessage, MessageDelta, Role, StreamItem, TextMessage, ToolCall, ToolCallDelta,
    ToolCallMessage,
};

/// Folds an in-order fragment sequence into one logical message.
///
/// Text deltas concatenate; tool-call chunks assemble by call index,
/// append-only per field. Seeing any tool-call fragment promotes the
/// final message to a tool-call request. Replaying the same sequence
/// from scratch yields the same message; partial replay is undefined.
#[derive(Debug, Default)]
pub struct StreamingAggregator {
    author: Option<String>,
    role: Option<Role>,
    text: String,
    calls: Vec<PartialCall>,
    max_index: Option<usize>,
    saw_fragment: bool,
}

#[derive(Debug)]
struct PartialCall {
    index: usize,
    id: Option<String>,
    function_name: String,
    arguments: String,
}

impl StreamingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any fragment has been applied yet.
    pub fn is_empty(&self) -> bool {
        !self.saw_fragment
    }

    /// Fold one fragment into the accumulator.
    pub fn apply(&mut self, delta: &MessageDelta) -> Result<()> {
        match delta {
            MessageDelta::Text(text) => {
                if text.choice_index > 0 {
                    return Err(ColloquyError::InvalidStreamingChoice(text.choice_index));
                }
                self.note_author(&text.author)?;
                if self.role.is_none() {
                    self.role = text.role;
                }
                self.text.push_str(&text.delta);
            }
            MessageDelta::ToolCall(calls) => {
                if calls.choice_index > 0 {
                    return Err(ColloquyError::InvalidStreamingChoice(calls.choice_index));
                }
                self.note_author(&calls.author)?;
                self.apply_tool_calls(calls)?;
            }
            MessageDelta::Envelope(envelope) => {
                return Err(ColloquyError::UnknownMessageVariant(format!(
                    "native streaming fragment from {} reached the aggregator",
                    envelope.author
                )));
            }
        }
        self.saw_fragment = true;
        Ok(())
    }

    fn note_author(&mut self, author: &str) -> Result<()> {
        match &self.author {
            None => {
                self.author = Some(author.to_string());
                Ok(())
            }
            Some(existing) if existing == author => Ok(()),
            Some(existing) => Err(ColloquyError::InvalidMessage(format!(
                "stream mixes fragments from '{existing}' and '{author}'"
            ))),
        }
    }

    fn apply_tool_calls(&mut self, delta: &ToolCallDelta) -> Result<()> {
        for chunk in &delta.calls {
            if let Some(call) = self.calls.iter_mut().find(|c| c.index == chunk.index) {
                // Existing index: strictly append, never rewrite.
                if let Some(name) = &chunk.function_name {
                    call.function_name.push_str(name);
                }
                if let Some(arguments) = &chunk.arguments {
                    call.arguments.push_str(arguments);
                }
                if call.id.is_none() {
                    call.id = chunk.id.clone();
                }
            } else {
                if let Some(max) = self.max_index {
                    if chunk.index < max {
                        return Err(ColloquyError::InvalidMessage(format!(
                            "tool call index {} introduced after index {}",
                            chunk.index, max
                        )));
                    }
                }
                self.calls.push(PartialCall {
                    index: chunk.index,
                    id: chunk.id.clone(),
                    function_name: chunk.function_name.clone().unwrap_or_default(),
                    arguments: chunk.arguments.clone().unwrap_or_default(),
                });
                self.max_index = Some(chunk.index);
            }
        }
        Ok(())
    }

    /// Close the aggregation and expose the materialized message.
    pub fn finish(self) -> Result<ChatMessage> {
        let author = self.author.unwrap_or_default();
        if !self.calls.is_empty() {
            let calls = self
                .calls
                .into_iter()
                .map(|call| {
                    let mut assembled = ToolCall::new(call.function_name, call.arguments);
                    if let Some(id) = call.id {
                        assembled = assembled.with_id(id);
                    }
                    assembled
                })
                .collect();
            Ok(ToolCallMessage::new(calls, author).into())
        } else {
            Ok(TextMessage {
                role: self.role.or(Some(Role::Assistant)),
                content: self.text,
                author,
            }
            .into())
        }
    }
}

/// Drain a reply stream to its final message.
///
/// Deltas are folded through an aggregator; a completed message yielded
/// by the stream supersedes the fold.
pub async fn collect_reply(mut stream: ReplyStream) -> Result<ChatMessage> {
    let mut aggregator = StreamingAggregator::new();
    let mut completed = None;
    while let Some(item) = stream.next().await {
        match item? {
            StreamItem::Delta(delta) => aggregator.apply(&delta)?,
            StreamItem::Completed(message) => completed = Some(message),
        }
    }
    match completed {
        Some(message) => Ok(message),
        None => aggregator.finish(),
    }
}
