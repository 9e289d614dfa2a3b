//! Reviewer challenges, rounds, and verdicts.

use serde::{Deserialize, Serialize};

/// Overall verdict the reviewer reports for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Draft accepted.
    Verified,
    /// Draft must be revised.
    NeedsRevision,
}

impl Verdict {
    /// Parse the wire form used by the reviewer schema.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verified" => Some(Self::Verified),
            "needs_revision" => Some(Self::NeedsRevision),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::NeedsRevision => write!(f, "needs_revision"),
        }
    }
}

/// What kind of flaw a challenge describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeCategory {
    /// Something the idea needs is missing from the draft.
    Completeness,
    /// The draft contradicts itself.
    Consistency,
    /// The draft leaves a decision open.
    Ambiguity,
}

impl ChallengeCategory {
    pub const ALL: [ChallengeCategory; 3] = [Self::Completeness, Self::Consistency, Self::Ambiguity];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completeness" => Some(Self::Completeness),
            "consistency" => Some(Self::Consistency),
            "ambiguity" => Some(Self::Ambiguity),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChallengeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completeness => write!(f, "completeness"),
            Self::Consistency => write!(f, "consistency"),
            Self::Ambiguity => write!(f, "ambiguity"),
        }
    }
}

/// Severity tier of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks verification.
    Critical,
    /// Advisory only; carried into the final document as a note.
    Minor,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }

    /// Whether this severity blocks verification.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

/// A candidate resolution offered by the reviewer for an ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    /// Short name shown to the human.
    pub label: String,
    /// What choosing this alternative implies.
    pub description: String,
    /// Whether the reviewer recommends this option.
    pub recommended: bool,
}

/// A single flaw raised against a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// 1-indexed position within its round.
    pub id: u32,
    pub category: ChallengeCategory,
    pub severity: Severity,
    pub description: String,
    /// Set by the reviewer when the ambiguity concerns system behavior.
    #[serde(default)]
    pub behavioral: bool,
    /// Candidate resolutions (only meaningful for behavioral ambiguities).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Alternative>,
}

impl Challenge {
    /// Whether this challenge must go through the human decision gate.
    pub fn needs_human_decision(&self) -> bool {
        self.severity == Severity::Critical
            && self.category == ChallengeCategory::Ambiguity
            && self.behavioral
    }
}

/// One reviewer turn's output. Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRound {
    /// Round number (1-indexed, equals the session iteration it was produced in).
    pub round: u32,
    /// Verdict as reported by the reviewer.
    pub verdict: Verdict,
    /// Challenges in id order.
    pub challenges: Vec<Challenge>,
}

impl ChallengeRound {
    /// Whether any challenge in this round is critical.
    pub fn has_critical(&self) -> bool {
        self.challenges.iter().any(|c| c.severity.is_blocking())
    }

    /// Whether this round lets the draft through.
    ///
    /// A round with zero challenges is always accepted; a round with any
    /// critical challenge never is, whatever its counts.
    pub fn accepts_draft(&self) -> bool {
        self.verdict == Verdict::Verified || !self.has_critical()
    }

    /// Minor challenges, in id order.
    pub fn minor_challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges
            .iter()
            .filter(|c| c.severity == Severity::Minor)
    }

    /// Challenges that require a human decision, in id order.
    pub fn gated_challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.iter().filter(|c| c.needs_human_decision())
    }

    /// Per-severity counts as `(critical, minor)`.
    pub fn severity_counts(&self) -> (usize, usize) {
        let critical = self
            .challenges
            .iter()
            .filter(|c| c.severity == Severity::Critical)
            .count();
        (critical, self.challenges.len() - critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(id: u32, category: ChallengeCategory, severity: Severity) -> Challenge {
        Challenge {
            id,
            category,
            severity,
            description: format!("challenge {}", id),
            behavioral: false,
            alternatives: vec![],
        }
    }

    #[test]
    fn test_mixed_round_blocks() {
        let round = ChallengeRound {
            round: 1,
            verdict: Verdict::NeedsRevision,
            challenges: vec![
                challenge(1, ChallengeCategory::Completeness, Severity::Minor),
                challenge(2, ChallengeCategory::Consistency, Severity::Critical),
                challenge(3, ChallengeCategory::Ambiguity, Severity::Minor),
            ],
        };
        assert!(round.has_critical());
        assert!(!round.accepts_draft());
        assert_eq!(round.severity_counts(), (1, 2));
    }

    #[test]
    fn test_empty_round_accepts() {
        let round = ChallengeRound {
            round: 2,
            verdict: Verdict::Verified,
            challenges: vec![],
        };
        assert!(round.accepts_draft());
    }

    #[test]
    fn test_minor_only_round_accepts() {
        let round = ChallengeRound {
            round: 1,
            verdict: Verdict::NeedsRevision,
            challenges: vec![challenge(1, ChallengeCategory::Ambiguity, Severity::Minor)],
        };
        assert!(round.accepts_draft());
        assert_eq!(round.minor_challenges().count(), 1);
    }

    #[test]
    fn test_needs_human_decision_requires_all_three() {
        let mut c = challenge(1, ChallengeCategory::Ambiguity, Severity::Critical);
        assert!(!c.needs_human_decision());
        c.behavioral = true;
        assert!(c.needs_human_decision());
        c.severity = Severity::Minor;
        assert!(!c.needs_human_decision());
        c.severity = Severity::Critical;
        c.category = ChallengeCategory::Consistency;
        assert!(!c.needs_human_decision());
    }

    #[test]
    fn test_wire_parsing() {
        assert_eq!(Verdict::parse("verified"), Some(Verdict::Verified));
        assert_eq!(Verdict::parse("approved"), None);
        assert_eq!(
            ChallengeCategory::parse("ambiguity"),
            Some(ChallengeCategory::Ambiguity)
        );
        assert_eq!(Severity::parse("blocking"), None);
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(Verdict::NeedsRevision.to_string(), "needs_revision");
    }
}
