//! Debate Orchestration — Architect-Reviewer Loop
//!
//! Drives a generative architect and an evaluative reviewer through
//! repeated draft/challenge rounds until the draft is accepted or the
//! iteration ceiling is reached.
//!
//! # Debate Flow
//!
//! ```text
//! Initializing → AwaitingArchitect → AwaitingReviewer → [critical?]
//!                  │    ▲    (validate, re-prompt once,    │
//!                  │    │     structural check)            ├─ No → Verified
//!                  │    │                                  ├─ Yes, behavioral ambiguity
//!                  │    │                                  │     → AwaitingHumanDecision
//!                  │    │                                  │          │ (decisions become
//!                  │    │                                  │          │  constraints)
//!                  │    └──────── rounds left ─────────────┴──────────┤
//!                  │                                                  └─ ceiling → TimedOut
//!                  └─ fatal error at any point → aborted, nothing emitted
//! ```

pub mod buildability;
pub mod challenge;
pub mod compactor;
pub mod config;
pub mod contract;
pub mod draft;
pub mod emitter;
pub mod error;
pub mod hitl;
pub mod orchestrator;
pub mod retry;
pub mod roles;
pub mod state;

pub use buildability::{check_draft, StructuralIssue, StructuralRule};
pub use challenge::{Alternative, Challenge, ChallengeCategory, ChallengeRound, Severity, Verdict};
pub use compactor::{CompactedHistory, CompactionConfig, ContextCompactor, HistorySummarizer};
pub use config::{ConfigError, DebateConfig};
pub use contract::{validate_architect, validate_reviewer, ContractViolation, ViolationReason};
pub use draft::{ApiEndpoint, Component, ComponentType, DataModel, Draft, ModelField};
pub use emitter::{DocumentEmitter, EmitError, MarkdownEmitter};
pub use error::{DebateError, TransportError};
pub use hitl::{
    AuthoritativeConstraint, DecisionError, DecisionProvider, HumanDecision, HumanDecisionRequest,
};
pub use orchestrator::{DebateOrchestrator, NextAction, RunOutcome};
pub use retry::RetryPolicy;
pub use roles::{ArchitectRequest, ArchitectRole, ReviewerRole, ScriptedArchitect, ScriptedReviewer};
pub use state::{DebatePhase, ParticipantRole, Session, SessionStatus};
