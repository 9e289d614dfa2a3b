//! Replays the bundled sample transcript end to end.

use std::path::PathBuf;

use ard_coordination::{DebateConfig, DocumentEmitter, MarkdownEmitter, SessionStatus};
use ard_replay::{replay, ReplayStatus, Transcript};

fn manifest_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

#[tokio::test(start_paused = true)]
async fn test_sample_transcript_verifies() {
    let config = DebateConfig::from_toml_str(
        &std::fs::read_to_string(manifest_path("debate.toml")).unwrap(),
    )
    .unwrap();
    let transcript = Transcript::load(&manifest_path("transcripts/offline_sync.json")).unwrap();

    let report = replay(config, transcript).await.unwrap();
    assert_eq!(report.status, ReplayStatus::Completed);
    assert_eq!(report.session.status(), SessionStatus::Verified);
    assert_eq!(report.session.iteration(), 2);
    assert!(report.session.warnings().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs/tracker.md");
    MarkdownEmitter.write_document(&report.session, &path).unwrap();
    let doc = std::fs::read_to_string(&path).unwrap();

    assert!(doc.contains("# tracker — Software Design Document"));
    assert!(doc.contains("- Batched sync with last-writer-wins"));
    assert!(doc.contains("Decision: Batched"));
    assert!(doc.contains("## Reviewer Notes (Minor)"));
    assert!(doc.contains("- **[completeness]** Document the outbox retention window"));
}

#[tokio::test(start_paused = true)]
async fn test_sample_transcript_times_out_at_one_round() {
    let config = DebateConfig {
        max_iterations: 1,
        ..Default::default()
    };
    let transcript = Transcript::load(&manifest_path("transcripts/offline_sync.json")).unwrap();

    let report = replay(config, transcript).await.unwrap();
    assert_eq!(report.session.status(), SessionStatus::MaxIterationsReached);
    let doc = report.document.unwrap();
    assert!(doc.contains("## Trace Log — Max Iterations Reached"));
    assert!(doc.contains("1. [consistency] No conflict policy for edits made on two devices"));
}

#[test]
fn test_missing_transcript_reports_path() {
    let err = Transcript::load(&manifest_path("transcripts/absent.json")).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.json"));
}
