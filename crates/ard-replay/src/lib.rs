//! Deterministic replay of recorded debate transcripts.
//!
//! A transcript holds the rough idea plus every architect reply, reviewer
//! reply, and human decision of one session, in call order. Replaying it
//! drives a real [`DebateOrchestrator`] with scripted roles, so a recorded
//! session can be re-run against the current validation and loop-control
//! rules without any model provider.
//!
//! ```json
//! {
//!   "rough_idea": "A task tracker with offline sync",
//!   "architect": [ {"components": [...], "rationale": "..."} ],
//!   "reviewer":  [ {"transport_error": "503", "retryable": true},
//!                  {"status": "verified", "challenges": []} ],
//!   "decisions": [ {"alternative": 1}, {"free_text": "..."}, null ]
//! }
//! ```
//!
//! A `null` decision (or running out of decisions) abandons the gate and
//! leaves the session suspended.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use ard_coordination::debate::hitl::DecisionChoice;
use ard_coordination::{
    DebateConfig, DebateOrchestrator, DecisionError, DecisionProvider, DocumentEmitter,
    HumanDecision, HumanDecisionRequest, MarkdownEmitter, RunOutcome, ScriptedArchitect,
    ScriptedReviewer, Session, TransportError,
};

/// One recorded role reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedReply {
    /// Raw response text, exactly as the model returned it.
    Text(String),
    /// A transport failure instead of a response.
    Failure {
        transport_error: String,
        #[serde(default)]
        retryable: bool,
    },
    /// A response recorded as structured JSON.
    Json(Value),
}

impl RecordedReply {
    fn into_script(self) -> Result<String, TransportError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Failure {
                transport_error,
                retryable,
            } => Err(TransportError {
                message: transport_error,
                retryable,
            }),
            Self::Json(value) => Ok(value.to_string()),
        }
    }
}

/// A recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub rough_idea: String,
    #[serde(default)]
    pub architect: Vec<RecordedReply>,
    #[serde(default)]
    pub reviewer: Vec<RecordedReply>,
    #[serde(default)]
    pub decisions: Vec<Option<DecisionChoice>>,
}

impl Transcript {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse transcript")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid transcript {}", path.display()))
    }
}

/// Replays recorded decisions in order, abandoning once they run out.
#[derive(Debug, Default)]
pub struct RecordedDecisions {
    queue: Mutex<VecDeque<Option<DecisionChoice>>>,
}

impl RecordedDecisions {
    pub fn new(decisions: Vec<Option<DecisionChoice>>) -> Self {
        Self {
            queue: Mutex::new(decisions.into()),
        }
    }
}

#[async_trait]
impl DecisionProvider for RecordedDecisions {
    async fn decide(
        &self,
        request: &HumanDecisionRequest,
        rejected: Option<&DecisionError>,
    ) -> Option<HumanDecision> {
        if let Some(err) = rejected {
            warn!(challenge_id = request.challenge.id, error = %err, "Recorded decision rejected");
        }
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .flatten();
        next.map(|choice| HumanDecision { choice })
    }
}

/// How a replay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStatus {
    /// Terminal session; `document` holds the rendered Markdown.
    Completed,
    /// Stopped at a decision the transcript does not answer.
    Suspended { round: u32, challenge_id: u32 },
}

#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub status: ReplayStatus,
    pub session: Session,
    pub document: Option<String>,
}

/// Run `transcript` through a fresh orchestrator.
///
/// A fatal debate error is returned as an error; no document is rendered
/// for it.
pub async fn replay(config: DebateConfig, transcript: Transcript) -> Result<ReplayReport> {
    let architect = Arc::new(ScriptedArchitect::new(
        transcript.architect.into_iter().map(RecordedReply::into_script),
    ));
    let reviewer = Arc::new(ScriptedReviewer::new(
        transcript.reviewer.into_iter().map(RecordedReply::into_script),
    ));
    let decisions = RecordedDecisions::new(transcript.decisions);

    let mut orchestrator =
        DebateOrchestrator::new(config, &transcript.rough_idea, architect, reviewer)
            .context("failed to start debate")?;
    info!(session_id = %orchestrator.session().id(), "Replaying transcript");

    let outcome = orchestrator
        .run(&decisions)
        .await
        .with_context(|| format!("debate aborted: {}", orchestrator.session().status_line()))?;

    match outcome {
        RunOutcome::Completed(session) => {
            let document = MarkdownEmitter
                .render(&session)
                .context("failed to render design document")?;
            Ok(ReplayReport {
                status: ReplayStatus::Completed,
                session,
                document: Some(document),
            })
        }
        RunOutcome::Suspended(request) => Ok(ReplayReport {
            status: ReplayStatus::Suspended {
                round: request.round,
                challenge_id: request.challenge.id,
            },
            session: orchestrator.into_session(),
            document: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ard_coordination::SessionStatus;

    const TRANSCRIPT: &str = r#"{
        "rough_idea": "A task tracker with offline sync",
        "architect": [
            {"project_name": "tracker",
             "components": [
                {"name": "SyncAgent", "type": "Agent", "purpose": "Syncs edits", "dependencies": ["LocalDb"]},
                {"name": "LocalDb", "type": "database", "purpose": "Offline store"}
             ]},
            "```json\n{\"project_name\": \"tracker\", \"components\": [{\"name\": \"SyncAgent\", \"type\": \"Agent\", \"purpose\": \"Syncs queued edits\", \"dependencies\": [\"LocalDb\"]}, {\"name\": \"LocalDb\", \"type\": \"DataStore\", \"purpose\": \"Offline store\"}], \"rationale\": \"Resolves #1\"}\n```"
        ],
        "reviewer": [
            {"status": "needs_revision", "challenges": [
                {"id": 1, "category": "ambiguity", "severity": "critical", "behavioral": true,
                 "description": "Sync on every edit or in batches?",
                 "alternatives": [
                    {"label": "Every edit", "description": "Lowest latency", "recommended": false},
                    {"label": "Batched", "description": "Fewer requests", "recommended": true}
                 ]}
            ]},
            {"transport_error": "502 bad gateway", "retryable": true},
            {"status": "verified", "challenges": []}
        ],
        "decisions": [{"alternative": 1}]
    }"#;

    #[test]
    fn test_parse_transcript_shapes() {
        let t = Transcript::from_json_str(TRANSCRIPT).unwrap();
        assert!(matches!(t.architect[0], RecordedReply::Json(_)));
        assert!(matches!(t.architect[1], RecordedReply::Text(_)));
        assert!(matches!(
            t.reviewer[1],
            RecordedReply::Failure { retryable: true, .. }
        ));
        assert_eq!(t.decisions, vec![Some(DecisionChoice::Alternative(1))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_completes() {
        let t = Transcript::from_json_str(TRANSCRIPT).unwrap();
        let report = replay(DebateConfig::default(), t).await.unwrap();
        assert_eq!(report.status, ReplayStatus::Completed);
        assert_eq!(report.session.status(), SessionStatus::Verified);
        assert_eq!(report.session.iteration(), 2);
        let doc = report.document.unwrap();
        assert!(doc.contains("# tracker — Software Design Document"));
        assert!(doc.contains("Decision: Batched"));
    }

    #[tokio::test]
    async fn test_replay_suspends_without_decisions() {
        let mut t = Transcript::from_json_str(TRANSCRIPT).unwrap();
        t.decisions.clear();
        let report = replay(DebateConfig::default(), t).await.unwrap();
        assert_eq!(
            report.status,
            ReplayStatus::Suspended {
                round: 1,
                challenge_id: 1
            }
        );
        assert!(report.document.is_none());
    }

    #[tokio::test]
    async fn test_replay_fatal_error() {
        let t = Transcript::from_json_str(
            r#"{"rough_idea": "x", "architect": ["nope", "still nope"], "reviewer": []}"#,
        )
        .unwrap();
        let err = replay(DebateConfig::default(), t).await.unwrap_err();
        assert!(format!("{:#}", err).contains("contract"));
    }

    #[tokio::test]
    async fn test_empty_idea_fails_to_start() {
        let t = Transcript::from_json_str(r#"{"rough_idea": "  "}"#).unwrap();
        let err = replay(DebateConfig::default(), t).await.unwrap_err();
        assert!(format!("{:#}", err).contains("failed to start debate"));
    }
}
