//! Error types shared by the quest and game event subsystems.

use thiserror::Error;

/// Errors raised by quest ledger operations.
///
/// Soft misses (a quest that simply isn't there) are reported through
/// `Option`/`bool` returns instead; these variants are for conditions a
/// caller has to escalate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestError {
    /// No template is registered for the requested quest id
    #[error("quest template {0} not found")]
    TemplateNotFound(u32),

    /// The objective ident isn't defined on the quest's template
    #[error("quest {template_id} has no objective '{ident}'")]
    ObjectiveNotFound { template_id: u32, ident: String },

    /// Client and server state disagree about a quest that must exist
    #[error("severe violation: {0}")]
    SevereViolation(String),
}

impl QuestError {
    /// True for errors that indicate desynchronized state and must be
    /// reported as a violation rather than handled locally.
    pub fn is_severe(&self) -> bool {
        matches!(self, QuestError::SevereViolation(_))
    }
}

/// Outcome of a single reward that couldn't be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("reward '{0}' is not implemented")]
    NotImplemented(&'static str),

    #[error("reward failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("invalid game event definition: {0}")]
    InvalidDefinition(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
