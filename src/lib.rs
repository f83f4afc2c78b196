//! Colloquy — agent interop core.
//!
//! One uniform chat-message protocol for independently-implemented
//! conversational agents, with composable middleware around both the
//! one-shot and the streaming reply contracts, perspective-aware content
//! normalization, streaming reconstruction, tool-call dispatch, and a
//! bounded conversation loop.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use colloquy::prelude::*;
//!
//! # async fn example() -> colloquy::error::Result<()> {
//! let assistant = Arc::new(DefaultReplyAgent::new("assistant", "hello!"));
//! let user = Arc::new(DefaultReplyAgent::new("user", TERMINATE));
//! let outcome = Orchestrator::new(vec![assistant, user])
//!     .with_max_turns(10)
//!     .run(Vec::new(), &tokio_util::sync::CancellationToken::new())
//!     .await?;
//! println!("{} turns", outcome.turns);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod aggregator;
pub mod connector;
pub mod conversation;
pub mod error;
pub mod middleware;
pub mod prelude;
pub mod tools;
pub mod types;
