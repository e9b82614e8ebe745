//! Quest System Module
//!
//! Immutable quest templates loaded from TOML, per-character quest ledgers
//! that own the quest instances, and part-time job track records.

pub mod definition;
pub mod ledger;
pub mod ptj;
pub mod record;
pub mod registry;
pub mod reward;

pub use definition::{ObjectiveKind, ObjectiveTemplate, QuestTemplate, QuestType};
pub use ledger::{QuestLedger, QuestServices};
pub use ptj::{PtjTrackRecord, PtjTracker, PtjType};
pub use record::{ObjectiveProgress, QuestRecord, QuestState};
pub use registry::{QuestRegistry, QuestTemplates};
pub use reward::{LoggedRewardEffects, Reward, RewardEffects};
