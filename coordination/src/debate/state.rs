//! Debate state machine — phases, transitions, and the session record.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::challenge::ChallengeRound;
use super::draft::Draft;
use super::error::DebateError;
use super::hitl::{AuthoritativeConstraint, HumanDecisionRequest};

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebatePhase {
    /// Session created, input validated, loop not started.
    Initializing,
    /// Architect is producing or revising the draft.
    AwaitingArchitect,
    /// Reviewer is evaluating the draft.
    AwaitingReviewer,
    /// Suspended on a critical behavioral ambiguity.
    AwaitingHumanDecision,
    /// Draft accepted.
    Verified,
    /// Iteration ceiling reached without acceptance.
    TimedOut,
}

impl DebatePhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::TimedOut)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Initializing => &[Self::AwaitingArchitect],
            Self::AwaitingArchitect => &[Self::AwaitingReviewer],
            Self::AwaitingReviewer => &[
                Self::AwaitingHumanDecision,
                Self::AwaitingArchitect,
                Self::Verified,
                Self::TimedOut,
            ],
            Self::AwaitingHumanDecision => &[Self::AwaitingArchitect, Self::TimedOut],
            Self::Verified | Self::TimedOut => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::AwaitingArchitect => write!(f, "awaiting_architect"),
            Self::AwaitingReviewer => write!(f, "awaiting_reviewer"),
            Self::AwaitingHumanDecision => write!(f, "awaiting_human_decision"),
            Self::Verified => write!(f, "verified"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Externally visible session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Verified,
    MaxIterationsReached,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Verified => write!(f, "verified"),
            Self::MaxIterationsReached => write!(f, "max_iterations_reached"),
        }
    }
}

/// Role of a participant in the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// Generative role: produces drafts.
    Architect,
    /// Evaluative role: challenges drafts.
    Reviewer,
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Architect => write!(f, "architect"),
            Self::Reviewer => write!(f, "reviewer"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// Architect turn that did not cite every challenge of the previous round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityWarning {
    pub iteration: u32,
    /// Ids from the previous round missing from the rationale.
    pub unreferenced: Vec<u32>,
}

/// The unit of work: one idea driven to a terminal phase.
///
/// Only the orchestrator mutates a session; everything else sees `&Session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: String,
    rough_idea: String,
    status: SessionStatus,
    phase: DebatePhase,
    iteration: u32,
    max_iterations: u32,
    current_draft: Option<Draft>,
    challenge_history: Vec<ChallengeRound>,
    pending_decision: Option<HumanDecisionRequest>,
    constraints: Vec<AuthoritativeConstraint>,
    /// `(round, challenge id)` pairs settled by a human decision.
    resolved: BTreeSet<(u32, u32)>,
    warnings: Vec<QualityWarning>,
    transitions: Vec<PhaseTransition>,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session, rejecting an empty or whitespace-only idea.
    pub fn new(rough_idea: &str, max_iterations: u32) -> Result<Self, DebateError> {
        let idea = rough_idea.trim();
        if idea.is_empty() {
            return Err(DebateError::Input(
                "rough idea must be a non-empty string".to_string(),
            ));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            rough_idea: idea.to_string(),
            status: SessionStatus::InProgress,
            phase: DebatePhase::Initializing,
            iteration: 0,
            max_iterations,
            current_draft: None,
            challenge_history: Vec::new(),
            pending_decision: None,
            constraints: Vec::new(),
            resolved: BTreeSet::new(),
            warnings: Vec::new(),
            transitions: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rough_idea(&self) -> &str {
        &self.rough_idea
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn phase(&self) -> DebatePhase {
        self.phase
    }

    /// Current round number; 0 before the first architect turn.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn current_draft(&self) -> Option<&Draft> {
        self.current_draft.as_ref()
    }

    pub fn challenge_history(&self) -> &[ChallengeRound] {
        &self.challenge_history
    }

    pub fn latest_round(&self) -> Option<&ChallengeRound> {
        self.challenge_history.last()
    }

    pub fn pending_decision(&self) -> Option<&HumanDecisionRequest> {
        self.pending_decision.as_ref()
    }

    /// Human decisions in the order they were made.
    pub fn constraints(&self) -> &[AuthoritativeConstraint] {
        &self.constraints
    }

    pub fn is_resolved(&self, round: u32, challenge_id: u32) -> bool {
        self.resolved.contains(&(round, challenge_id))
    }

    pub fn warnings(&self) -> &[QualityWarning] {
        &self.warnings
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the session reached a terminal phase.
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether another round fits under the ceiling.
    pub fn has_rounds_remaining(&self) -> bool {
        self.iteration < self.max_iterations
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {} rounds recorded | {} decision(s) | session={}",
            self.phase,
            self.iteration,
            self.max_iterations,
            self.challenge_history.len(),
            self.constraints.len(),
            self.id
        )
    }

    /// Transition to a new phase with a reason.
    pub(crate) fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        match to {
            // Each entry into the architect phase opens a new round
            DebatePhase::AwaitingArchitect => self.iteration += 1,
            DebatePhase::Verified => self.status = SessionStatus::Verified,
            DebatePhase::TimedOut => self.status = SessionStatus::MaxIterationsReached,
            _ => {}
        }

        Ok(())
    }

    pub(crate) fn replace_draft(&mut self, draft: Draft) {
        self.current_draft = Some(draft);
    }

    pub(crate) fn append_round(&mut self, round: ChallengeRound) {
        self.challenge_history.push(round);
    }

    pub(crate) fn set_pending_decision(&mut self, request: Option<HumanDecisionRequest>) {
        self.pending_decision = request;
    }

    pub(crate) fn add_constraint(&mut self, constraint: AuthoritativeConstraint) {
        self.resolved
            .insert((constraint.round, constraint.challenge_id));
        self.constraints.push(constraint);
    }

    pub(crate) fn push_warning(&mut self, warning: QualityWarning) {
        self.warnings.push(warning);
    }
}
