//! Debate orchestrator — drives the architect→reviewer loop.
//!
//! Owns the [`Session`] and is the only writer of it. Each call to
//! [`DebateOrchestrator::step`] performs at most one role invocation, so a
//! caller can interleave its own bookkeeping between turns. [`run`] drives
//! the loop to completion, asking a [`DecisionProvider`] whenever the
//! human decision gate opens.
//!
//! [`run`]: DebateOrchestrator::run

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::buildability::{check_draft, StructuralIssue};
use super::challenge::ChallengeRound;
use super::compactor::ContextCompactor;
use super::config::DebateConfig;
use super::contract::{check_verdict_invariant, validate_architect, validate_reviewer, ContractViolation};
use super::draft::Draft;
use super::error::DebateError;
use super::hitl::{DecisionError, DecisionProvider, HumanDecision, HumanDecisionGate, HumanDecisionRequest};
use super::retry::call_with_retry;
use super::roles::{ArchitectRequest, ArchitectRole, ReviewerRole};
use super::state::{DebatePhase, ParticipantRole, QualityWarning, Session};

/// What the orchestrator expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextAction {
    /// Next step runs the architect.
    AwaitArchitect,
    /// Next step runs the reviewer.
    AwaitReviewer,
    /// Suspended until [`DebateOrchestrator::submit_decision`] is called.
    AwaitDecision,
    /// Debate is complete.
    Complete,
}

impl std::fmt::Display for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitArchitect => write!(f, "await_architect"),
            Self::AwaitReviewer => write!(f, "await_reviewer"),
            Self::AwaitDecision => write!(f, "await_decision"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// How [`DebateOrchestrator::run`] returned.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Terminal phase reached.
    Completed(Session),
    /// The decision provider walked away; the session stays suspended on
    /// this request and can be resumed with `submit_decision`.
    Suspended(HumanDecisionRequest),
}

/// Why an architect response was refused.
enum Rejection {
    Contract(ContractViolation),
    Structural(StructuralIssue),
}

impl Rejection {
    /// Notice carried into the single re-prompt.
    fn notice(&self) -> String {
        match self {
            Self::Contract(v) => format!(
                "Your previous response was rejected: {}. Return one JSON object that satisfies the schema.",
                v
            ),
            Self::Structural(issue) => format!(
                "Your previous draft failed structural acceptance: {}. Fix {} and return the full draft.",
                issue,
                issue.pointer()
            ),
        }
    }

    fn into_error(self) -> DebateError {
        match self {
            Self::Contract(violation) => DebateError::ContractViolation {
                role: ParticipantRole::Architect,
                violation,
            },
            Self::Structural(issue) => DebateError::StructuralViolation { issue },
        }
    }
}

/// Validate and structurally check an architect response.
fn accept_draft(raw: &str) -> Result<Draft, Rejection> {
    let draft = validate_architect(raw).map_err(Rejection::Contract)?;
    check_draft(&draft).map_err(Rejection::Structural)?;
    Ok(draft)
}

/// Ids in `round` that the rationale never cites as `#N`, `challenge N`,
/// or `[N]`.
pub fn unreferenced_challenges(rationale: &str, round: &ChallengeRound) -> Vec<u32> {
    round
        .challenges
        .iter()
        .map(|c| c.id)
        .filter(|id| {
            let pattern = format!(r"(?i)(?:#\s*{id}\b|\bchallenge\s+{id}\b|\[{id}\])");
            Regex::new(&pattern)
                .map(|re| !re.is_match(rationale))
                .unwrap_or(false)
        })
        .collect()
}

/// The debate orchestrator.
///
/// Usage:
/// 1. Create with `new()`; an empty idea is rejected here
/// 2. Call `step()` until it returns `Complete` or `AwaitDecision`
/// 3. On `AwaitDecision`, answer `pending_decision()` with `submit_decision()`
/// 4. Read the result with `session()` or `into_session()`
///
/// Or call `run()` to do all of the above against a [`DecisionProvider`].
pub struct DebateOrchestrator {
    config: DebateConfig,
    session: Session,
    architect: Arc<dyn ArchitectRole>,
    reviewer: Arc<dyn ReviewerRole>,
    compactor: ContextCompactor,
    gate: HumanDecisionGate,
    aborted: Option<String>,
}

impl DebateOrchestrator {
    /// Validate config and input and create a session in `Initializing`.
    pub fn new(
        config: DebateConfig,
        rough_idea: &str,
        architect: Arc<dyn ArchitectRole>,
        reviewer: Arc<dyn ReviewerRole>,
    ) -> Result<Self, DebateError> {
        config.validate()?;
        let session = Session::new(rough_idea, config.max_iterations)?;
        let compactor = ContextCompactor::new(config.compaction.clone());
        Ok(Self {
            config,
            session,
            architect,
            reviewer,
            compactor,
            gate: HumanDecisionGate::new(),
            aborted: None,
        })
    }

    /// Replace the history compactor (e.g. with a model-backed summarizer).
    pub fn with_compactor(mut self, compactor: ContextCompactor) -> Self {
        self.compactor = compactor;
        self
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Whether the debate reached a terminal phase.
    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    /// Reason the session was aborted, if a fatal error occurred.
    pub fn abort_reason(&self) -> Option<&str> {
        self.aborted.as_deref()
    }

    /// The request currently awaiting a human, if suspended.
    pub fn pending_decision(&self) -> Option<&HumanDecisionRequest> {
        self.session.pending_decision()
    }

    /// What `step()` will do next.
    pub fn next_action(&self) -> NextAction {
        match self.session.phase() {
            DebatePhase::Initializing | DebatePhase::AwaitingArchitect => NextAction::AwaitArchitect,
            DebatePhase::AwaitingReviewer => NextAction::AwaitReviewer,
            DebatePhase::AwaitingHumanDecision => NextAction::AwaitDecision,
            DebatePhase::Verified | DebatePhase::TimedOut => NextAction::Complete,
        }
    }

    /// Advance the session by one turn.
    ///
    /// While suspended on a human decision this returns `AwaitDecision`
    /// without invoking either role.
    pub async fn step(&mut self) -> Result<NextAction, DebateError> {
        if let Some(reason) = &self.aborted {
            return Err(DebateError::Aborted(reason.clone()));
        }
        match self.session.phase() {
            DebatePhase::Initializing => {
                self.session
                    .transition(DebatePhase::AwaitingArchitect, "input accepted")?;
                info!(
                    session_id = %self.session.id(),
                    max_iterations = self.config.max_iterations,
                    hitl_enabled = self.config.hitl_enabled,
                    "Debate started"
                );
                Ok(NextAction::AwaitArchitect)
            }
            DebatePhase::AwaitingArchitect => {
                let result = self.architect_turn().await;
                self.guard(result)
            }
            DebatePhase::AwaitingReviewer => {
                let result = self.reviewer_turn().await;
                self.guard(result)
            }
            DebatePhase::AwaitingHumanDecision => Ok(NextAction::AwaitDecision),
            DebatePhase::Verified | DebatePhase::TimedOut => Err(DebateError::AlreadyComplete),
        }
    }

    /// Apply a human decision to the pending request.
    ///
    /// A [`DecisionError`] leaves the request pending so it can be answered
    /// again. Once every gated challenge of the round is decided, loop
    /// control resumes with the round's verdict.
    pub fn submit_decision(&mut self, decision: HumanDecision) -> Result<NextAction, DebateError> {
        if let Some(reason) = &self.aborted {
            return Err(DebateError::Aborted(reason.clone()));
        }
        if self.session.phase() != DebatePhase::AwaitingHumanDecision {
            return Err(DecisionError::NotAwaiting.into());
        }
        let request = self
            .session
            .pending_decision()
            .cloned()
            .ok_or(DecisionError::NotAwaiting)?;
        let constraint = request.resolve(&decision)?;
        info!(
            round = constraint.round,
            challenge_id = constraint.challenge_id,
            free_text = constraint.free_text,
            resolution = %constraint.resolution,
            "Human decision recorded"
        );
        self.session.add_constraint(constraint);

        if let Some(next) = self.gate.next_request() {
            self.session.set_pending_decision(Some(next));
            return Ok(NextAction::AwaitDecision);
        }
        self.session.set_pending_decision(None);

        let result = match self.session.latest_round().cloned() {
            Some(round) => self.advance(&round),
            None => Err(DebateError::Aborted(
                "decision gate open without a recorded round".to_string(),
            )),
        };
        self.guard(result)
    }

    /// Drive the session until it completes or the provider abandons a
    /// decision.
    pub async fn run(&mut self, decisions: &dyn DecisionProvider) -> Result<RunOutcome, DebateError> {
        loop {
            if self.session.is_complete() {
                return Ok(RunOutcome::Completed(self.session.clone()));
            }
            match self.step().await? {
                NextAction::AwaitDecision => {
                    if let Some(request) = self.await_decision(decisions).await? {
                        return Ok(RunOutcome::Suspended(request));
                    }
                }
                NextAction::AwaitArchitect | NextAction::AwaitReviewer | NextAction::Complete => {}
            }
        }
    }

    /// Ask the provider until a decision is accepted. Returns the pending
    /// request if the provider gives up.
    async fn await_decision(
        &mut self,
        decisions: &dyn DecisionProvider,
    ) -> Result<Option<HumanDecisionRequest>, DebateError> {
        let mut rejected: Option<DecisionError> = None;
        loop {
            let Some(request) = self.session.pending_decision().cloned() else {
                return Ok(None);
            };
            match decisions.decide(&request, rejected.as_ref()).await {
                None => {
                    info!(
                        challenge_id = request.challenge.id,
                        "Decision abandoned, session stays suspended"
                    );
                    return Ok(Some(request));
                }
                Some(decision) => match self.submit_decision(decision) {
                    Ok(_) => return Ok(None),
                    Err(DebateError::Decision(err)) => {
                        warn!(error = %err, "Decision rejected, presenting request again");
                        rejected = Some(err);
                    }
                    Err(err) => return Err(err),
                },
            }
        }
    }

    async fn architect_turn(&mut self) -> Result<NextAction, DebateError> {
        let mut request = ArchitectRequest {
            iteration: self.session.iteration(),
            rough_idea: self.session.rough_idea().to_string(),
            history: self.compactor.compact_rounds(self.session.challenge_history()),
            constraints: self.session.constraints().to_vec(),
            violation_notice: None,
        };

        let draft = loop {
            let raw = call_with_retry(&self.config.transport, ParticipantRole::Architect, || {
                self.architect.generate(&request)
            })
            .await?;

            match accept_draft(&raw) {
                Ok(draft) => break draft,
                Err(rejection) if request.violation_notice.is_none() => {
                    let notice = rejection.notice();
                    warn!(iteration = request.iteration, %notice, "Architect response rejected, re-prompting once");
                    request.violation_notice = Some(notice);
                }
                Err(rejection) => return Err(rejection.into_error()),
            }
        };

        if let Some(previous) = self.session.latest_round() {
            let unreferenced = unreferenced_challenges(&draft.rationale, previous);
            if !unreferenced.is_empty() {
                warn!(
                    iteration = request.iteration,
                    ?unreferenced,
                    "Rationale does not reference every challenge from the previous round"
                );
                self.session.push_warning(QualityWarning {
                    iteration: request.iteration,
                    unreferenced,
                });
            }
        }

        info!(
            iteration = request.iteration,
            components = draft.components.len(),
            dependencies = draft.dependency_count(),
            "Architect draft accepted"
        );
        self.session.replace_draft(draft);
        self.session
            .transition(DebatePhase::AwaitingReviewer, "draft accepted")?;
        Ok(NextAction::AwaitReviewer)
    }

    async fn reviewer_turn(&mut self) -> Result<NextAction, DebateError> {
        let Some(draft) = self.session.current_draft().cloned() else {
            return Err(DebateError::Aborted(
                "reviewer turn without a current draft".to_string(),
            ));
        };

        let raw = call_with_retry(&self.config.transport, ParticipantRole::Reviewer, || {
            self.reviewer.review(&draft)
        })
        .await?;

        let response = validate_reviewer(&raw)
            .and_then(|r| check_verdict_invariant(&r).map(|_| r))
            .map_err(|violation| DebateError::ContractViolation {
                role: ParticipantRole::Reviewer,
                violation,
            })?;

        let round = ChallengeRound {
            round: self.session.iteration(),
            verdict: response.verdict,
            challenges: response.challenges,
        };
        let (critical, minor) = round.severity_counts();
        info!(
            round = round.round,
            verdict = %round.verdict,
            critical,
            minor,
            "Reviewer round recorded"
        );
        self.session.append_round(round.clone());

        if self.config.hitl_enabled {
            if let Some(request) = self.gate.open(&round) {
                info!(
                    round = round.round,
                    challenge_id = request.challenge.id,
                    "Suspending for human decision"
                );
                self.session.set_pending_decision(Some(request));
                self.session.transition(
                    DebatePhase::AwaitingHumanDecision,
                    "critical behavioral ambiguity",
                )?;
                return Ok(NextAction::AwaitDecision);
            }
        }

        self.advance(&round)
    }

    /// Loop control after a round is final.
    fn advance(&mut self, round: &ChallengeRound) -> Result<NextAction, DebateError> {
        if round.accepts_draft() {
            self.session
                .transition(DebatePhase::Verified, "no critical challenges")?;
            info!(rounds = round.round, "Debate verified");
            return Ok(NextAction::Complete);
        }
        if !self.session.has_rounds_remaining() {
            self.session
                .transition(DebatePhase::TimedOut, "max iterations reached")?;
            warn!(
                rounds = round.round,
                max_iterations = self.config.max_iterations,
                "Debate reached max iterations without verification"
            );
            return Ok(NextAction::Complete);
        }
        self.session
            .transition(DebatePhase::AwaitingArchitect, "revision requested")?;
        Ok(NextAction::AwaitArchitect)
    }

    /// Record fatal errors so later calls refuse to continue.
    fn guard(&mut self, result: Result<NextAction, DebateError>) -> Result<NextAction, DebateError> {
        if let Err(err) = &result {
            if err.is_fatal() {
                error!(
                    session_id = %self.session.id(),
                    phase = %self.session.phase(),
                    kind = err.kind(),
                    error = %err,
                    "Debate aborted"
                );
                self.aborted = Some(err.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::challenge::{Challenge, ChallengeCategory, Severity, Verdict};
    use crate::debate::roles::{ScriptedArchitect, ScriptedReviewer};

    const DRAFT: &str = r#"{"components":[{"name":"Api","type":"API","purpose":"HTTP surface","dependencies":["Store"]},{"name":"Store","type":"DataStore","purpose":"Persistence"}],"rationale":"Addresses #1."}"#;
    const VERIFIED: &str = r#"{"status":"verified","challenges":[]}"#;

    fn orchestrator(
        architect: Vec<&str>,
        reviewer: Vec<&str>,
    ) -> (DebateOrchestrator, Arc<ScriptedArchitect>, Arc<ScriptedReviewer>) {
        let architect = Arc::new(ScriptedArchitect::from_replies(architect));
        let reviewer = Arc::new(ScriptedReviewer::from_replies(reviewer));
        let orch = DebateOrchestrator::new(
            DebateConfig::default(),
            "a small API backed by a store",
            architect.clone(),
            reviewer.clone(),
        )
        .unwrap();
        (orch, architect, reviewer)
    }

    #[tokio::test]
    async fn test_step_sequence() {
        let (mut orch, _, _) = orchestrator(vec![DRAFT], vec![VERIFIED]);
        assert_eq!(orch.next_action(), NextAction::AwaitArchitect);
        assert_eq!(orch.step().await.unwrap(), NextAction::AwaitArchitect);
        assert_eq!(orch.session().iteration(), 1);
        assert_eq!(orch.step().await.unwrap(), NextAction::AwaitReviewer);
        assert_eq!(orch.step().await.unwrap(), NextAction::Complete);
        assert!(orch.is_complete());
        assert!(matches!(orch.step().await, Err(DebateError::AlreadyComplete)));
    }

    #[tokio::test]
    async fn test_submit_decision_when_not_suspended() {
        let (mut orch, _, _) = orchestrator(vec![DRAFT], vec![VERIFIED]);
        let err = orch.submit_decision(HumanDecision::alternative(0)).unwrap_err();
        assert!(matches!(err, DebateError::Decision(DecisionError::NotAwaiting)));
        assert!(orch.abort_reason().is_none());
    }

    #[tokio::test]
    async fn test_fatal_error_latches() {
        let (mut orch, _, _) = orchestrator(vec![DRAFT], vec!["not json"]);
        orch.step().await.unwrap();
        orch.step().await.unwrap();
        let err = orch.step().await.unwrap_err();
        assert_eq!(err.kind(), "contract_violation");
        assert!(matches!(orch.step().await, Err(DebateError::Aborted(_))));
    }

    #[test]
    fn test_unreferenced_challenges() {
        let round = ChallengeRound {
            round: 1,
            verdict: Verdict::NeedsRevision,
            challenges: (1..=4)
                .map(|id| Challenge {
                    id,
                    category: ChallengeCategory::Completeness,
                    severity: Severity::Critical,
                    description: format!("issue {}", id),
                    behavioral: false,
                    alternatives: vec![],
                })
                .collect(),
        };
        let rationale = "Fixed #1, addressed Challenge 2 and [3]. See #12 for more.";
        assert_eq!(unreferenced_challenges(rationale, &round), vec![4]);
    }

    #[test]
    fn test_empty_idea_rejected_before_start() {
        let result = DebateOrchestrator::new(
            DebateConfig::default(),
            "   ",
            Arc::new(ScriptedArchitect::default()),
            Arc::new(ScriptedReviewer::default()),
        );
        assert!(matches!(result, Err(DebateError::Input(_))));
    }
}
