//! Role seams for the architect and reviewer.
//!
//! Adapters return raw text; parsing and validation belong to the
//! orchestrator. The reviewer only ever sees the current draft, never the
//! rough idea or the challenge history.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::compactor::CompactedHistory;
use super::draft::Draft;
use super::error::TransportError;
use super::hitl::AuthoritativeConstraint;

/// Everything the architect receives on one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectRequest {
    /// 1-indexed round this turn belongs to.
    pub iteration: u32,
    pub rough_idea: String,
    /// Possibly compacted challenge history, oldest first.
    pub history: CompactedHistory,
    /// Human decisions, in the order they were made.
    pub constraints: Vec<AuthoritativeConstraint>,
    /// Set on the single re-prompt after a rejected response.
    pub violation_notice: Option<String>,
}

impl ArchitectRequest {
    /// Whether this is a revision rather than the first draft.
    pub fn is_revision(&self) -> bool {
        !self.history.is_empty()
    }

    /// Constraint directives as handed to the model.
    pub fn directives(&self) -> Vec<String> {
        self.constraints.iter().map(|c| c.directive()).collect()
    }
}

/// Generative role: produces or revises the draft.
#[async_trait]
pub trait ArchitectRole: Send + Sync {
    async fn generate(&self, request: &ArchitectRequest) -> Result<String, TransportError>;
}

/// Evaluative role: challenges the current draft.
#[async_trait]
pub trait ReviewerRole: Send + Sync {
    async fn review(&self, draft: &Draft) -> Result<String, TransportError>;
}

type Script = Mutex<VecDeque<Result<String, TransportError>>>;

fn next_reply(script: &Script) -> Result<String, TransportError> {
    script
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .pop_front()
        .unwrap_or_else(|| Err(TransportError::permanent("script exhausted")))
}

/// Architect that replays a fixed list of replies and records its inputs.
#[derive(Debug, Default)]
pub struct ScriptedArchitect {
    script: Script,
    requests: Mutex<Vec<ArchitectRequest>>,
}

impl ScriptedArchitect {
    pub fn new(replies: impl IntoIterator<Item = Result<String, TransportError>>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script made only of successful replies.
    pub fn from_replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ArchitectRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ArchitectRole for ScriptedArchitect {
    async fn generate(&self, request: &ArchitectRequest) -> Result<String, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        next_reply(&self.script)
    }
}

/// Reviewer that replays a fixed list of replies and records the drafts
/// it was shown.
#[derive(Debug, Default)]
pub struct ScriptedReviewer {
    script: Script,
    drafts: Mutex<Vec<Draft>>,
}

impl ScriptedReviewer {
    pub fn new(replies: impl IntoIterator<Item = Result<String, TransportError>>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn from_replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn drafts(&self) -> Vec<Draft> {
        self.drafts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls(&self) -> usize {
        self.drafts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ReviewerRole for ScriptedReviewer {
    async fn review(&self, draft: &Draft) -> Result<String, TransportError> {
        self.drafts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(draft.clone());
        next_reply(&self.script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ArchitectRequest {
        ArchitectRequest {
            iteration: 1,
            rough_idea: "idea".into(),
            history: CompactedHistory::default(),
            constraints: vec![],
            violation_notice: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_architect_replays_in_order() {
        let architect = ScriptedArchitect::new(vec![
            Err(TransportError::transient("503")),
            Ok("first".to_string()),
        ]);
        assert!(architect.generate(&request()).await.is_err());
        assert_eq!(architect.generate(&request()).await.unwrap(), "first");
        assert_eq!(architect.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_is_permanent() {
        let reviewer = ScriptedReviewer::from_replies(Vec::<String>::new());
        let err = reviewer.review(&Draft::default()).await.unwrap_err();
        assert!(!err.retryable);
        assert_eq!(reviewer.calls(), 1);
    }

    #[test]
    fn test_first_request_is_not_revision() {
        assert!(!request().is_revision());
    }
}
