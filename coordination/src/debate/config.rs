//! Debate configuration.
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! | Variable              | Field            |
//! |-----------------------|------------------|
//! | `ARD_ARCHITECT_MODEL` | `architect_model`|
//! | `ARD_REVIEWER_MODEL`  | `reviewer_model` |
//! | `ARD_MAX_ITERATIONS`  | `max_iterations` |
//! | `ARD_HITL_ENABLED`    | `hitl_enabled`   |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::compactor::CompactionConfig;
use super::retry::RetryPolicy;

/// Configuration for a debate session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Model identifier handed to the architect adapter.
    pub architect_model: String,
    /// Model identifier handed to the reviewer adapter.
    pub reviewer_model: String,
    /// Maximum architect/reviewer rounds before timing out.
    pub max_iterations: u32,
    /// Transport retry policy shared by both roles.
    pub transport: RetryPolicy,
    /// Whether critical behavioral ambiguities suspend for a human.
    pub hitl_enabled: bool,
    pub compaction: CompactionConfig,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            architect_model: "architect".to_string(),
            reviewer_model: "reviewer".to_string(),
            max_iterations: 5,
            transport: RetryPolicy::default(),
            hitl_enabled: true,
            compaction: CompactionConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl DebateConfig {
    /// Parse from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `ARD_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("ARD_ARCHITECT_MODEL") {
            self.architect_model = model;
        }
        if let Some(model) = lookup("ARD_REVIEWER_MODEL") {
            self.reviewer_model = model;
        }
        if let Some(max) = lookup("ARD_MAX_ITERATIONS") {
            match max.parse() {
                Ok(n) => self.max_iterations = n,
                Err(_) => warn!(value = %max, "Ignoring unparseable ARD_MAX_ITERATIONS"),
            }
        }
        if let Some(val) = lookup("ARD_HITL_ENABLED") {
            self.hitl_enabled = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Reject settings no session can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.transport.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "transport.backoff_multiplier must be >= 1.0".to_string(),
            ));
        }
        if self.compaction.threshold_bytes == 0 {
            return Err(ConfigError::Invalid(
                "compaction.threshold_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DebateConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert!(config.hitl_enabled);
        assert_eq!(config.transport.max_retries, 3);
        assert_eq!(config.compaction.threshold_bytes, 200_000);
    }

    #[test]
    fn test_partial_toml() {
        let config = DebateConfig::from_toml_str(
            r#"
            max_iterations = 3
            hitl_enabled = false

            [transport]
            max_retries = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.max_iterations, 3);
        assert!(!config.hitl_enabled);
        assert_eq!(config.transport.max_retries, 1);
        assert_eq!(config.transport.initial_backoff_ms, 2_000);
        assert_eq!(config.architect_model, "architect");
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = DebateConfig::from_toml_str("max_iterations = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_toml() {
        let err = DebateConfig::from_toml_str("max_iterations = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("ARD_REVIEWER_MODEL", "strict-reviewer"),
            ("ARD_MAX_ITERATIONS", "8"),
            ("ARD_HITL_ENABLED", "0"),
        ]
        .into_iter()
        .collect();
        let mut config = DebateConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.reviewer_model, "strict-reviewer");
        assert_eq!(config.architect_model, "architect");
        assert_eq!(config.max_iterations, 8);
        assert!(!config.hitl_enabled);
    }

    #[test]
    fn test_unparseable_override_ignored() {
        let mut config = DebateConfig::default();
        config.apply_overrides(|k| (k == "ARD_MAX_ITERATIONS").then(|| "lots".to_string()));
        assert_eq!(config.max_iterations, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debate.toml");
        std::fs::write(&path, "architect_model = \"big-architect\"\n").unwrap();
        let config = DebateConfig::load(&path).unwrap();
        assert!(config.architect_model == "big-architect"
            || std::env::var("ARD_ARCHITECT_MODEL").is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = DebateConfig::load(Path::new("/nonexistent/debate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
