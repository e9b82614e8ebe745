//! Server configuration loaded from `server.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::protocol::NoticeType;

/// How an event's live flag is recomputed when a new activation span arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReevaluationPolicy {
    /// Only the span that was just added decides whether the event is live.
    /// An earlier span that still covers "now" does not keep it running.
    #[default]
    NewSpanOnly,
    /// Every registered span is checked.
    AllSpans,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub reevaluation: ReevaluationPolicy,
    /// Placement of the start/end broadcast
    pub notice_type: NoticeType,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            reevaluation: ReevaluationPolicy::default(),
            notice_type: NoticeType::Middle,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root of the quest/event data tree
    pub data_dir: PathBuf,
    /// Default tracing filter, `RUST_LOG` wins when set
    pub log_filter: String,
    pub events: EventConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_filter: "info".to_string(),
            events: EventConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file. Returns `None` if the file
    /// doesn't exist; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
