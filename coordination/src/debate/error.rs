//! Debate error taxonomy.
//!
//! | Class                 | Policy                                              |
//! |-----------------------|-----------------------------------------------------|
//! | `Input`, `Config`     | fatal, before any transition                        |
//! | `Transport`           | retried up to the configured ceiling, then fatal    |
//! | `ContractViolation`   | architect: one re-prompt then fatal; reviewer: fatal |
//! | `StructuralViolation` | same budget as an architect contract violation      |
//! | `Decision`            | non-fatal, the request is presented again           |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::buildability::StructuralIssue;
use super::config::ConfigError;
use super::contract::ContractViolation;
use super::hitl::DecisionError;
use super::state::{ParticipantRole, TransitionError};

/// Failure of an outbound role call, as reported by the role adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Whether another attempt may succeed (timeouts, 429, 5xx).
    pub retryable: bool,
}

impl TransportError {
    /// A failure worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that retrying cannot fix (auth, bad request).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Errors raised while driving a debate session.
#[derive(Debug, Error)]
pub enum DebateError {
    /// The rough idea was rejected before the session started.
    #[error("invalid input: {0}")]
    Input(String),

    /// The configuration cannot drive a session.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A role call kept failing at the transport level.
    #[error("{role} call failed after {attempts} attempt(s): {source}")]
    Transport {
        role: ParticipantRole,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// A role response did not match its schema.
    #[error("{role} response violated its contract: {violation}")]
    ContractViolation {
        role: ParticipantRole,
        violation: ContractViolation,
    },

    /// The architect's draft failed structural acceptance twice.
    #[error("architect draft failed structural acceptance: {issue}")]
    StructuralViolation { issue: StructuralIssue },

    /// A human decision could not be applied.
    #[error("human decision rejected: {0}")]
    Decision(#[from] DecisionError),

    /// Internal state machine transition refused.
    #[error("transition failed: {0}")]
    TransitionFailed(#[from] TransitionError),

    /// Session already reached a terminal phase.
    #[error("debate already complete")]
    AlreadyComplete,

    /// Session was aborted by an earlier fatal error.
    #[error("session aborted: {0}")]
    Aborted(String),
}

impl DebateError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decision(_))
    }

    /// Short machine-readable class name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input_error",
            Self::Config(_) => "config_error",
            Self::Transport { .. } => "transport_error",
            Self::ContractViolation { .. } => "contract_violation",
            Self::StructuralViolation { .. } => "structural_violation",
            Self::Decision(_) => "decision_error",
            Self::TransitionFailed(_) => "transition_failed",
            Self::AlreadyComplete => "already_complete",
            Self::Aborted(_) => "aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::contract::ViolationReason;

    #[test]
    fn test_decision_errors_are_not_fatal() {
        let err = DebateError::from(DecisionError::EmptySelection);
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), "decision_error");
    }

    #[test]
    fn test_display_names_role() {
        let err = DebateError::ContractViolation {
            role: ParticipantRole::Reviewer,
            violation: ContractViolation {
                reason: ViolationReason::MissingField,
                field: "status".into(),
                detail: "required field 'status' is absent".into(),
            },
        };
        assert!(err.is_fatal());
        let text = err.to_string();
        assert!(text.starts_with("reviewer response violated its contract"));
        assert!(text.contains("missing_field"));
    }

    #[test]
    fn test_transport_error_constructors() {
        assert!(TransportError::transient("503").retryable);
        assert!(!TransportError::permanent("401").retryable);
        let err = DebateError::Transport {
            role: ParticipantRole::Architect,
            attempts: 4,
            source: TransportError::transient("timeout"),
        };
        assert_eq!(err.to_string(), "architect call failed after 4 attempt(s): timeout");
    }
}
