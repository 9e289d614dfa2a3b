//! Context compactor — bounds the challenge history re-injected into the
//! architect's input.
//!
//! Below the size threshold the history passes through untouched. Above
//! it, the last [`VERBATIM_ROUNDS`] rounds are kept verbatim and every
//! older round is folded into a single summary paragraph. Compaction never
//! touches the session's stored history, only the copy handed to the role.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::challenge::{ChallengeCategory, ChallengeRound};

/// Rounds always kept verbatim at the tail of a compacted history.
pub const VERBATIM_ROUNDS: usize = 3;

/// Compaction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Serialized size (bytes of JSON) above which history is compacted.
    pub threshold_bytes: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: 200_000,
        }
    }
}

/// Challenge history as handed to the architect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactedHistory {
    /// Synthesized paragraph standing in for older rounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Rounds kept verbatim, oldest first.
    pub rounds: Vec<ChallengeRound>,
}

impl CompactedHistory {
    /// Wrap a full history without compacting it.
    pub fn verbatim(rounds: Vec<ChallengeRound>) -> Self {
        Self {
            summary: None,
            rounds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.rounds.is_empty()
    }

    /// The most recent round, if any is kept verbatim.
    pub fn latest_round(&self) -> Option<&ChallengeRound> {
        self.rounds.last()
    }

    /// Size used against the compaction threshold.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

/// Produces the paragraph that replaces evicted rounds.
pub trait HistorySummarizer: Send + Sync {
    /// Summarize `rounds` (oldest first, never empty) into one paragraph.
    fn summarize(&self, rounds: &[ChallengeRound]) -> String;
}

/// Deterministic summarizer: recurring categories and the categories still
/// carrying critical challenges in the newest evicted round.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeSummarizer;

impl HistorySummarizer for ThemeSummarizer {
    fn summarize(&self, rounds: &[ChallengeRound]) -> String {
        let (first, last) = match (rounds.first(), rounds.last()) {
            (Some(f), Some(l)) => (f.round, l.round),
            _ => return String::new(),
        };

        let mut per_category: BTreeMap<ChallengeCategory, (usize, usize)> = BTreeMap::new();
        let (mut critical, mut minor) = (0, 0);
        for round in rounds {
            let (c, m) = round.severity_counts();
            critical += c;
            minor += m;
            for category in ChallengeCategory::ALL {
                let n = round
                    .challenges
                    .iter()
                    .filter(|ch| ch.category == category)
                    .count();
                if n > 0 {
                    let entry = per_category.entry(category).or_default();
                    entry.0 += n;
                    entry.1 += 1;
                }
            }
        }

        let span = if first == last {
            format!("Round {}", first)
        } else {
            format!("Rounds {}-{}", first, last)
        };
        let mut text = format!(
            "{} (summarized): {} challenge(s) raised ({} critical, {} minor).",
            span,
            critical + minor,
            critical,
            minor
        );

        let recurring: Vec<String> = per_category
            .iter()
            .filter(|(_, (_, rounds_seen))| *rounds_seen > 1)
            .map(|(cat, (count, _))| format!("{} ({})", cat, count))
            .collect();
        if !recurring.is_empty() {
            text.push_str(&format!(" Recurring themes: {}.", recurring.join(", ")));
        }

        let mut open: Vec<ChallengeCategory> = rounds
            .last()
            .map(|r| {
                r.challenges
                    .iter()
                    .filter(|c| c.severity.is_blocking())
                    .map(|c| c.category)
                    .collect()
            })
            .unwrap_or_default();
        open.sort();
        open.dedup();
        if open.is_empty() {
            text.push_str(&format!(" No critical issues remained open after round {}.", last));
        } else {
            let names: Vec<String> = open.iter().map(|c| c.to_string()).collect();
            text.push_str(&format!(
                " Unresolved after round {}: {}.",
                last,
                names.join(", ")
            ));
        }
        text
    }
}

/// Compacts challenge histories against a size threshold.
pub struct ContextCompactor {
    config: CompactionConfig,
    summarizer: Box<dyn HistorySummarizer>,
}

impl ContextCompactor {
    /// Compactor with the deterministic [`ThemeSummarizer`].
    pub fn new(config: CompactionConfig) -> Self {
        Self::with_summarizer(config, Box::new(ThemeSummarizer))
    }

    pub fn with_summarizer(config: CompactionConfig, summarizer: Box<dyn HistorySummarizer>) -> Self {
        Self { config, summarizer }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// Compact a full stored history.
    pub fn compact_rounds(&self, rounds: &[ChallengeRound]) -> CompactedHistory {
        self.compact(&CompactedHistory::verbatim(rounds.to_vec()))
    }

    /// Compact a (possibly already compacted) history.
    ///
    /// Idempotent: an input with at most [`VERBATIM_ROUNDS`] verbatim rounds
    /// comes back unchanged, and an existing summary paragraph is kept as-is
    /// with newly evicted rounds appended after it.
    pub fn compact(&self, history: &CompactedHistory) -> CompactedHistory {
        let size = history.serialized_size();
        if size <= self.config.threshold_bytes || history.rounds.len() <= VERBATIM_ROUNDS {
            return history.clone();
        }

        let split = history.rounds.len() - VERBATIM_ROUNDS;
        let (evicted, tail) = history.rounds.split_at(split);
        let fresh = self.summarizer.summarize(evicted);
        let summary = match &history.summary {
            Some(existing) => format!("{} {}", existing, fresh),
            None => fresh,
        };

        let compacted = CompactedHistory {
            summary: Some(summary),
            rounds: tail.to_vec(),
        };
        debug!(
            evicted_rounds = evicted.len(),
            bytes_before = size,
            bytes_after = compacted.serialized_size(),
            "Compacted challenge history"
        );
        compacted
    }
}

impl Default for ContextCompactor {
    fn default() -> Self {
        Self::new(CompactionConfig::default())
    }
}
