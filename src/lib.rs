//! Character quest ledgers and time-window game events for the world server.

pub mod character;
pub mod config;
pub mod error;
pub mod event;
pub mod inventory;
pub mod notifier;
pub mod protocol;
pub mod quest;
pub mod world_events;

pub use character::{Character, CharacterRegistry};
pub use config::{ReevaluationPolicy, ServerConfig};
pub use error::{ConfigError, EventError, QuestError, RewardError};
