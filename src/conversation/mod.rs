//! Turn-taking conversation loop with bounded termination.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::agent::Agent;
use crate::error::{ColloquyError, Result};
use crate::types::{ChatMessage, GenerateOptions};

/// Reserved phrase signaling conversation completion.
pub const TERMINATE: &str = "[GROUPCHAT_TERMINATE]";

/// Append-only conversation history.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Why a conversation run stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    /// A reply matched the termination sentinel.
    Sentinel,
    /// The maximum turn count was reached.
    TurnBudget,
}

/// Outcome of a conversation run.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub id: Uuid,
    pub history: Vec<ChatMessage>,
    pub stop_reason: StopReason,
    /// Replies appended by the loop (seed messages not counted).
    pub turns: usize,
    pub finished_at: DateTime<Utc>,
}

/// How the next speaker is chosen in group mode.
#[derive(Clone)]
pub enum SpeakerSelection {
    /// Cycle through participants in registration order. With two
    /// participants this is plain alternation.
    RoundRobin,
    /// Caller-supplied policy: `(history, turn, participant_count) ->
    /// participant index`.
    Policy(Arc<dyn Fn(&[ChatMessage], usize, usize) -> usize + Send + Sync>),
}

impl std::fmt::Debug for SpeakerSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoundRobin => f.write_str("RoundRobin"),
            Self::Policy(_) => f.write_str("Policy"),
        }
    }
}

/// Drives a bounded exchange between two or more agents.
///
/// The loop owns the history; participants see read-only slices per
/// turn. It appends whatever reply the pipeline produces without
/// interpreting it; message-specific behavior lives in middleware. A
/// failed turn aborts the run.
pub struct Orchestrator {
    agents: Vec<Arc<dyn Agent>>,
    max_turns: usize,
    sentinel: String,
    selection: SpeakerSelection,
    options: GenerateOptions,
}

impl Orchestrator {
    /// Create a loop over the given participants. Turn order follows
    /// their order here.
    pub fn new(agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            agents,
            max_turns: 10,
            sentinel: TERMINATE.to_string(),
            selection: SpeakerSelection::RoundRobin,
            options: GenerateOptions::default(),
        }
    }

    /// Add another participant at the end of the turn order.
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_selection(mut self, selection: SpeakerSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Literal equality between the reply's rendered text and the
    /// sentinel. Not a semantic judgment.
    pub fn is_termination(&self, message: &ChatMessage) -> bool {
        message.text() == self.sentinel
    }

    fn next_speaker(&self, history: &[ChatMessage], turn: usize) -> usize {
        match &self.selection {
            SpeakerSelection::RoundRobin => turn % self.agents.len(),
            SpeakerSelection::Policy(policy) => {
                policy(history, turn, self.agents.len()) % self.agents.len()
            }
        }
    }

    /// Run the loop from seed history until the sentinel or the turn
    /// budget, whichever comes first.
    pub async fn run(
        &self,
        seed: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<ChatOutcome> {
        if self.agents.is_empty() {
            return Err(ColloquyError::Configuration(
                "conversation requires at least one participant".into(),
            ));
        }
        let id = Uuid::new_v4();
        let mut history = Conversation::from_messages(seed);
        let mut turns = 0usize;
        for turn in 0..self.max_turns {
            if cancel.is_cancelled() {
                return Err(ColloquyError::Canceled);
            }
            let speaker = &self.agents[self.next_speaker(history.messages(), turn)];
            debug!(run_id = %id, turn, agent = speaker.name(), "conversation turn");
            let reply = speaker
                .generate_reply(history.messages(), &self.options, cancel)
                .await?;
            let terminal = self.is_termination(&reply);
            history.push(reply);
            turns += 1;
            if terminal {
                debug!(run_id = %id, turns, "conversation terminated by sentinel");
                return Ok(ChatOutcome {
                    id,
                    history: history.into_messages(),
                    stop_reason: StopReason::Sentinel,
                    turns,
                    finished_at: Utc::now(),
                });
            }
        }
        debug!(run_id = %id, turns, "conversation exhausted turn budget");
        Ok(ChatOutcome {
            id,
            history: history.into_messages(),
            stop_reason: StopReason::TurnBudget,
            turns,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DefaultReplyAgent;

    #[tokio::test]
    async fn empty_participant_list_is_rejected() {
        let orchestrator = Orchestrator::new(Vec::new());
        let err = orchestrator
            .run(Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ColloquyError::Configuration(_)));
    }

    #[tokio::test]
    async fn turn_budget_bounds_the_loop() {
        let orchestrator = Orchestrator::new(vec![
            Arc::new(DefaultReplyAgent::new("a", "ping")),
            Arc::new(DefaultReplyAgent::new("b", "pong")),
        ])
        .with_max_turns(4);

        let outcome = orchestrator
            .run(Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.stop_reason, StopReason::TurnBudget);
        assert_eq!(outcome.turns, 4);
        assert_eq!(outcome.history.len(), 4);
        assert_eq!(outcome.history[0].author(), "a");
        assert_eq!(outcome.history[1].author(), "b");
        assert_eq!(outcome.history[2].author(), "a");
    }

    #[tokio::test]
    async fn sentinel_requires_exact_equality() {
        let orchestrator = Orchestrator::new(vec![
            Arc::new(DefaultReplyAgent::new("a", format!("almost {TERMINATE}"))),
            Arc::new(DefaultReplyAgent::new("b", TERMINATE)),
        ])
        .with_max_turns(10);

        let outcome = orchestrator
            .run(Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
        // Turn 1 (agent a) embeds the sentinel but does not equal it;
        // turn 2 (agent b) matches exactly.
        assert_eq!(outcome.stop_reason, StopReason::Sentinel);
        assert_eq!(outcome.turns, 2);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_run() {
        let orchestrator = Orchestrator::new(vec![
            Arc::new(DefaultReplyAgent::new("a", "ping")),
            Arc::new(DefaultReplyAgent::new("b", "pong")),
        ]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orchestrator.run(Vec::new(), &cancel).await.unwrap_err();
        assert!(matches!(err, ColloquyError::Canceled));
    }
}
