//! Human decision gate — suspends the debate on critical behavioral
//! ambiguities and turns the human's choice into an authoritative
//! constraint for the architect.
//!
//! The gate never infers whether an ambiguity is behavioral; it trusts the
//! reviewer's explicit flag (see [`Challenge::needs_human_decision`]). A
//! flagged challenge whose alternatives do not form a valid choice set is
//! not gated: it is logged and stays an ordinary critical challenge.
//! There is no timeout here. A caller that wants one layers it on top.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::challenge::{Alternative, Challenge, ChallengeRound};

/// Minimum alternatives a gated challenge must offer.
pub const MIN_ALTERNATIVES: usize = 2;
/// Maximum alternatives a gated challenge may offer.
pub const MAX_ALTERNATIVES: usize = 4;

/// A bounded choice presented to the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanDecisionRequest {
    /// Round that raised the challenge.
    pub round: u32,
    /// The triggering critical ambiguity.
    pub challenge: Challenge,
    /// 2 to 4 named alternatives, exactly one recommended.
    pub alternatives: Vec<Alternative>,
    /// Whether an open-text answer is accepted. Always true.
    pub allows_free_text: bool,
}

impl HumanDecisionRequest {
    /// Build a request for a gated challenge.
    ///
    /// Returns `None` if the challenge is not a critical behavioral ambiguity
    /// or its alternatives are not a valid bounded choice set.
    pub fn from_challenge(round: u32, challenge: &Challenge) -> Option<Self> {
        if !challenge.needs_human_decision() || choice_set_problem(challenge).is_some() {
            return None;
        }
        Some(Self {
            round,
            challenge: challenge.clone(),
            alternatives: challenge.alternatives.clone(),
            allows_free_text: true,
        })
    }

    /// Index of the recommended alternative.
    pub fn recommended_index(&self) -> Option<usize> {
        self.alternatives.iter().position(|a| a.recommended)
    }

    /// Validate a decision against this request.
    pub fn resolve(&self, decision: &HumanDecision) -> Result<AuthoritativeConstraint, DecisionError> {
        let (resolution, free_text) = match &decision.choice {
            DecisionChoice::Alternative(index) => {
                let alt = self.alternatives.get(*index).ok_or(
                    DecisionError::AlternativeOutOfRange {
                        index: *index,
                        available: self.alternatives.len(),
                    },
                )?;
                (alt.label.clone(), false)
            }
            DecisionChoice::FreeText(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(DecisionError::EmptySelection);
                }
                (text.to_string(), true)
            }
        };

        Ok(AuthoritativeConstraint {
            round: self.round,
            challenge_id: self.challenge.id,
            challenge_description: self.challenge.description.clone(),
            resolution,
            free_text,
            decided_at: Utc::now(),
        })
    }
}

/// Why a challenge's alternatives cannot be offered as a bounded choice.
fn choice_set_problem(challenge: &Challenge) -> Option<String> {
    let n = challenge.alternatives.len();
    if !(MIN_ALTERNATIVES..=MAX_ALTERNATIVES).contains(&n) {
        return Some(format!(
            "needs {}-{} alternatives, got {}",
            MIN_ALTERNATIVES, MAX_ALTERNATIVES, n
        ));
    }
    let recommended = challenge
        .alternatives
        .iter()
        .filter(|a| a.recommended)
        .count();
    if recommended != 1 {
        return Some(format!(
            "exactly one alternative must be recommended, got {}",
            recommended
        ));
    }
    None
}

/// What the human picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionChoice {
    /// 0-indexed position in [`HumanDecisionRequest::alternatives`].
    Alternative(usize),
    /// Open-text answer.
    FreeText(String),
}

/// The human's answer to a [`HumanDecisionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanDecision {
    pub choice: DecisionChoice,
}

impl HumanDecision {
    pub fn alternative(index: usize) -> Self {
        Self {
            choice: DecisionChoice::Alternative(index),
        }
    }

    pub fn free_text(text: impl Into<String>) -> Self {
        Self {
            choice: DecisionChoice::FreeText(text.into()),
        }
    }
}

/// A human decision the architect must honor without re-litigating it.
///
/// Immutable once created; surfaced verbatim on every later architect turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativeConstraint {
    pub round: u32,
    pub challenge_id: u32,
    pub challenge_description: String,
    /// Chosen alternative label or the free-text answer.
    pub resolution: String,
    pub free_text: bool,
    pub decided_at: DateTime<Utc>,
}

impl AuthoritativeConstraint {
    /// Text handed to the architect, identical on every turn.
    pub fn directive(&self) -> String {
        format!(
            "Challenge #{} (round {}): {}\nDecision: {}",
            self.challenge_id, self.round, self.challenge_description, self.resolution
        )
    }
}

/// A decision that cannot be applied. Never fatal: the request is
/// presented again.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DecisionError {
    /// Neither a listed alternative nor any free text was supplied.
    #[error("decision selects no alternative and supplies no free text")]
    EmptySelection,
    /// The selected index does not name a listed alternative.
    #[error("alternative {index} does not exist ({available} offered)")]
    AlternativeOutOfRange { index: usize, available: usize },
    /// No decision is pending.
    #[error("no human decision is pending")]
    NotAwaiting,
}

/// Queue of requests for the current round; presented one at a time in
/// challenge-id order.
#[derive(Debug, Default)]
pub struct HumanDecisionGate {
    queue: VecDeque<HumanDecisionRequest>,
}

impl HumanDecisionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every gated challenge in `round` and return the first request.
    ///
    /// Flagged challenges without a valid choice set are skipped with a
    /// warning.
    pub fn open(&mut self, round: &ChallengeRound) -> Option<HumanDecisionRequest> {
        self.queue = round
            .gated_challenges()
            .filter(|c| match choice_set_problem(c) {
                Some(problem) => {
                    warn!(
                        round = round.round,
                        challenge_id = c.id,
                        %problem,
                        "Behavioral ambiguity not gated, handled as a critical revision"
                    );
                    false
                }
                None => true,
            })
            .filter_map(|c| HumanDecisionRequest::from_challenge(round.round, c))
            .collect();
        if !self.queue.is_empty() {
            info!(
                round = round.round,
                pending = self.queue.len(),
                "Human decision gate opened"
            );
        }
        self.queue.pop_front()
    }

    /// Requests still waiting behind the current one.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Next queued request, if any.
    pub fn next_request(&mut self) -> Option<HumanDecisionRequest> {
        self.queue.pop_front()
    }
}

/// Source of human decisions for the driver loop.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Answer `request`. `rejected` carries the reason the previous answer
    /// to the same request was refused. Returning `None` abandons the gate
    /// and leaves the session suspended.
    async fn decide(
        &self,
        request: &HumanDecisionRequest,
        rejected: Option<&DecisionError>,
    ) -> Option<HumanDecision>;
}

/// Provider that never answers; for sessions run with the gate disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecisions;

#[async_trait]
impl DecisionProvider for NoDecisions {
    async fn decide(
        &self,
        _request: &HumanDecisionRequest,
        _rejected: Option<&DecisionError>,
    ) -> Option<HumanDecision> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::challenge::{ChallengeCategory, Severity, Verdict};

    fn alt(label: &str, recommended: bool) -> Alternative {
        Alternative {
            label: label.to_string(),
            description: format!("{} description", label),
            recommended,
        }
    }

    fn gated(id: u32) -> Challenge {
        Challenge {
            id,
            category: ChallengeCategory::Ambiguity,
            severity: Severity::Critical,
            description: format!("Sync or async for {}?", id),
            behavioral: true,
            alternatives: vec![alt("Sync", true), alt("Async", false)],
        }
    }

    #[test]
    fn test_request_from_gated_challenge() {
        let req = HumanDecisionRequest::from_challenge(2, &gated(1)).unwrap();
        assert_eq!(req.round, 2);
        assert_eq!(req.recommended_index(), Some(0));
        assert!(req.allows_free_text);
    }

    #[test]
    fn test_non_behavioral_not_gated() {
        let mut c = gated(1);
        c.behavioral = false;
        assert!(HumanDecisionRequest::from_challenge(1, &c).is_none());
    }

    #[test]
    fn test_invalid_choice_set_not_gated() {
        let mut none = gated(1);
        none.alternatives.clear();
        assert!(HumanDecisionRequest::from_challenge(1, &none).is_none());

        let mut two_recommended = gated(2);
        two_recommended.alternatives = vec![alt("Sync", true), alt("Async", true)];
        assert!(HumanDecisionRequest::from_challenge(1, &two_recommended).is_none());

        let mut too_many = gated(3);
        too_many.alternatives = ["A", "B", "C", "D", "E"]
            .iter()
            .enumerate()
            .map(|(i, l)| alt(l, i == 0))
            .collect();
        assert!(HumanDecisionRequest::from_challenge(1, &too_many).is_none());
    }

    #[test]
    fn test_gate_skips_invalid_choice_sets() {
        let mut bare = gated(1);
        bare.alternatives.clear();
        let round = ChallengeRound {
            round: 2,
            verdict: Verdict::NeedsRevision,
            challenges: vec![bare, gated(2)],
        };
        let mut gate = HumanDecisionGate::new();
        let first = gate.open(&round).unwrap();
        assert_eq!(first.challenge.id, 2);
        assert_eq!(gate.remaining(), 0);

        let only_bare = ChallengeRound {
            round: 3,
            verdict: Verdict::NeedsRevision,
            challenges: vec![round.challenges[0].clone()],
        };
        assert!(gate.open(&only_bare).is_none());
    }

    #[test]
    fn test_resolve_alternative() {
        let req = HumanDecisionRequest::from_challenge(1, &gated(3)).unwrap();
        let constraint = req.resolve(&HumanDecision::alternative(1)).unwrap();
        assert_eq!(constraint.resolution, "Async");
        assert_eq!(constraint.challenge_id, 3);
        assert!(!constraint.free_text);
        assert_eq!(
            constraint.directive(),
            "Challenge #3 (round 1): Sync or async for 3?\nDecision: Async"
        );
    }

    #[test]
    fn test_resolve_free_text() {
        let req = HumanDecisionRequest::from_challenge(1, &gated(1)).unwrap();
        let constraint = req
            .resolve(&HumanDecision::free_text("  Async with a sync fallback "))
            .unwrap();
        assert_eq!(constraint.resolution, "Async with a sync fallback");
        assert!(constraint.free_text);
    }

    #[test]
    fn test_resolve_rejects_empty_and_out_of_range() {
        let req = HumanDecisionRequest::from_challenge(1, &gated(1)).unwrap();
        assert_eq!(
            req.resolve(&HumanDecision::free_text("   ")).unwrap_err(),
            DecisionError::EmptySelection
        );
        assert_eq!(
            req.resolve(&HumanDecision::alternative(2)).unwrap_err(),
            DecisionError::AlternativeOutOfRange {
                index: 2,
                available: 2
            }
        );
    }

    #[test]
    fn test_gate_queues_in_id_order() {
        let round = ChallengeRound {
            round: 1,
            verdict: Verdict::NeedsRevision,
            challenges: vec![gated(1), gated(2)],
        };
        let mut gate = HumanDecisionGate::new();
        let first = gate.open(&round).unwrap();
        assert_eq!(first.challenge.id, 1);
        assert_eq!(gate.remaining(), 1);
        assert_eq!(gate.next_request().unwrap().challenge.id, 2);
        assert!(gate.next_request().is_none());
    }
}
