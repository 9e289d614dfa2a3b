//! Architect-Reviewer Debate Library
//!
//! Turns a rough software idea into a verified, structurally sound design
//! draft by running a bounded adversarial loop between two roles:
//! - an architect that produces and revises a structured draft
//! - a reviewer that challenges each draft without seeing its history
//!
//! The library never talks to a model provider. Callers supply role
//! adapters through [`ArchitectRole`] and [`ReviewerRole`], and a
//! [`DecisionProvider`] for the human decision gate.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ard_coordination::{
//!     DebateConfig, DebateOrchestrator, DocumentEmitter, MarkdownEmitter, NoDecisions,
//!     RunOutcome, ScriptedArchitect, ScriptedReviewer,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let architect = Arc::new(ScriptedArchitect::from_replies(["{...}"]));
//! let reviewer = Arc::new(ScriptedReviewer::from_replies(["{...}"]));
//! let mut debate =
//!     DebateOrchestrator::new(DebateConfig::default(), "a task tracker", architect, reviewer)?;
//! if let RunOutcome::Completed(session) = debate.run(&NoDecisions).await? {
//!     MarkdownEmitter.write_document(&session, "out/design.md".as_ref())?;
//! }
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod debate;

pub use debate::hitl::NoDecisions;
pub use debate::{
    AuthoritativeConstraint, Challenge, ChallengeCategory, ChallengeRound, DebateConfig,
    DebateError, DebateOrchestrator, DebatePhase, DecisionError, DecisionProvider,
    DocumentEmitter, Draft, HumanDecision, HumanDecisionRequest, MarkdownEmitter, NextAction,
    RunOutcome, ScriptedArchitect, ScriptedReviewer, Session, SessionStatus, Severity,
    TransportError, Verdict,
};
