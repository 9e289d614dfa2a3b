//! Document emitter — renders a terminal session as a Markdown design
//! document.
//!
//! Only terminal sessions are rendered. An aborted session never reaches a
//! terminal phase, so it can never be published.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::challenge::Challenge;
use super::draft::{ApiEndpoint, DataModel, Draft};
use super::state::{DebatePhase, Session, SessionStatus};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("session is not complete (phase {0})")]
    NotTerminal(DebatePhase),
    #[error("session has no accepted draft")]
    NoDraft,
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders a terminal session into its persisted form.
pub trait DocumentEmitter {
    fn render(&self, session: &Session) -> Result<String, EmitError>;

    /// Render and write to `path`, creating parent directories.
    fn write_document(&self, session: &Session, path: &Path) -> Result<PathBuf, EmitError> {
        let content = self.render(session)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EmitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| EmitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            session_id = %session.id(),
            status = %session.status(),
            path = %path.display(),
            "Design document written"
        );
        Ok(path.to_path_buf())
    }
}

/// Markdown software design document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownEmitter;

impl MarkdownEmitter {
    fn render_draft(draft: &Draft, out: &mut Vec<String>) {
        let title = if draft.project_name.trim().is_empty() {
            "Untitled Project"
        } else {
            draft.project_name.as_str()
        };
        out.push(format!("# {} — Software Design Document", title));
        out.push(String::new());

        if !draft.tech_stack.is_empty() {
            out.push("## Tech Stack".to_string());
            out.push(String::new());
            out.extend(draft.tech_stack.iter().map(|t| format!("- {}", t)));
            out.push(String::new());
        }

        if !draft.key_decisions.is_empty() {
            out.push("## Key Design Decisions".to_string());
            out.push(String::new());
            out.extend(draft.key_decisions.iter().map(|d| format!("- {}", d)));
            out.push(String::new());
        }

        if !draft.directory_structure.trim().is_empty() {
            out.push("## Directory Structure".to_string());
            out.push(String::new());
            out.push("```".to_string());
            out.push(draft.directory_structure.trim_end().to_string());
            out.push("```".to_string());
            out.push(String::new());
        }

        out.push("## Components".to_string());
        out.push(String::new());
        for component in &draft.components {
            out.push(format!("### {}", component.name));
            out.push(String::new());
            out.push(format!("- **Type:** {}", component.kind));
            if !component.file_path.is_empty() {
                out.push(format!("- **File:** `{}`", component.file_path));
            }
            out.push(format!("- **Purpose:** {}", component.purpose));
            if !component.dependencies.is_empty() {
                out.push(format!(
                    "- **Dependencies:** {}",
                    component.dependencies.join(", ")
                ));
            }
            out.push(String::new());
        }

        Self::render_data_models(&draft.data_models, out);
        Self::render_endpoints(&draft.api_endpoints, out);
    }

    fn render_data_models(models: &[DataModel], out: &mut Vec<String>) {
        if models.is_empty() {
            return;
        }
        out.push("## Data Models".to_string());
        out.push(String::new());
        for model in models {
            out.push(format!("### {}", model.name));
            out.push(String::new());
            if model.fields.is_empty() {
                continue;
            }
            out.push("| Field | Type | Description |".to_string());
            out.push("|-------|------|-------------|".to_string());
            for field in &model.fields {
                out.push(format!(
                    "| `{}` | `{}` | {} |",
                    field.name, field.kind, field.description
                ));
            }
            out.push(String::new());
        }
    }

    fn render_endpoints(endpoints: &[ApiEndpoint], out: &mut Vec<String>) {
        if endpoints.is_empty() {
            return;
        }
        out.push("## API Endpoints".to_string());
        out.push(String::new());
        out.push("| Method | Path | Description |".to_string());
        out.push("|--------|------|-------------|".to_string());
        for ep in endpoints {
            out.push(format!("| `{}` | `{}` | {} |", ep.method, ep.path, ep.description));
        }
        out.push(String::new());

        for ep in endpoints {
            out.push(format!("### `{} {}`", ep.method, ep.path));
            out.push(String::new());
            if !ep.description.is_empty() {
                out.push(ep.description.clone());
                out.push(String::new());
            }
            if let Some(query) = &ep.query_params {
                out.push("**Query parameters:**".to_string());
                out.push(String::new());
                out.push(format!("```json\n{}\n```", query));
                out.push(String::new());
            }
            if let Some(body) = &ep.request_body {
                out.push("**Request body:**".to_string());
                out.push(String::new());
                out.push(format!("```json\n{}\n```", body));
                out.push(String::new());
            }
            if !ep.response.is_empty() {
                out.push("**Response:**".to_string());
                out.push(String::new());
                out.push(format!("```\n{}\n```", ep.response));
                out.push(String::new());
            }
            if !ep.errors.is_empty() {
                out.push(format!("**Errors:** {}", ep.errors));
                out.push(String::new());
            }
        }
    }

    fn render_decisions(session: &Session, out: &mut Vec<String>) {
        if session.constraints().is_empty() {
            return;
        }
        out.push("---".to_string());
        out.push(String::new());
        out.push("## Human Decisions".to_string());
        out.push(String::new());
        for c in session.constraints() {
            out.push(format!(
                "- **Challenge #{} (round {}):** {}",
                c.challenge_id, c.round, c.challenge_description
            ));
            out.push(format!("  - Decision: {}", c.resolution));
        }
        out.push(String::new());
    }

    fn render_minor_notes(session: &Session, out: &mut Vec<String>) {
        let minors: Vec<&Challenge> = session
            .latest_round()
            .map(|r| r.minor_challenges().collect())
            .unwrap_or_default();
        if minors.is_empty() {
            return;
        }
        out.push("---".to_string());
        out.push(String::new());
        out.push("## Reviewer Notes (Minor)".to_string());
        out.push(String::new());
        out.push(
            "The following minor suggestions were noted but did not block verification:"
                .to_string(),
        );
        out.push(String::new());
        out.extend(
            minors
                .iter()
                .map(|c| format!("- **[{}]** {}", c.category, c.description)),
        );
        out.push(String::new());
    }

    fn render_trace_log(session: &Session, out: &mut Vec<String>) {
        let unresolved: Vec<&Challenge> = session
            .challenge_history()
            .iter()
            .flat_map(|round| {
                round
                    .challenges
                    .iter()
                    .filter(move |c| !session.is_resolved(round.round, c.id))
            })
            .collect();

        out.push("---".to_string());
        out.push(String::new());
        out.push("## Trace Log — Max Iterations Reached".to_string());
        out.push(String::new());
        if unresolved.is_empty() {
            out.push("No unresolved challenges were recorded.".to_string());
        } else {
            out.push("Unresolved challenges at termination:".to_string());
            out.push(String::new());
            for (n, c) in unresolved.iter().enumerate() {
                out.push(format!("{}. [{}] {}", n + 1, c.category, c.description));
            }
        }
        out.push(String::new());
    }
}

impl DocumentEmitter for MarkdownEmitter {
    fn render(&self, session: &Session) -> Result<String, EmitError> {
        if !session.is_complete() {
            return Err(EmitError::NotTerminal(session.phase()));
        }
        let draft = session.current_draft().ok_or(EmitError::NoDraft)?;

        let mut out = Vec::new();
        Self::render_draft(draft, &mut out);
        Self::render_decisions(session, &mut out);
        match session.status() {
            SessionStatus::Verified => Self::render_minor_notes(session, &mut out),
            SessionStatus::MaxIterationsReached => Self::render_trace_log(session, &mut out),
            SessionStatus::InProgress => {}
        }
        Ok(out.join("\n"))
    }
}
