//! Quest rewards and the capability that applies them.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::record::QuestRecord;
use crate::error::RewardError;

/// A single reward entry on a quest template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    Gold { amount: i32 },
    Exp { amount: i32 },
    ExplorationExp { amount: i32 },
    Item {
        item_id: u32,
        #[serde(default = "default_count")]
        count: i32,
    },
    Skill { skill_id: u16, rank: u8 },
    Ap { amount: i16 },
    Keyword { keyword: String },
    PtjExp { amount: i32 },
}

fn default_count() -> i32 {
    1
}

impl Reward {
    pub fn kind(&self) -> &'static str {
        match self {
            Reward::Gold { .. } => "gold",
            Reward::Exp { .. } => "exp",
            Reward::ExplorationExp { .. } => "exploration_exp",
            Reward::Item { .. } => "item",
            Reward::Skill { .. } => "skill",
            Reward::Ap { .. } => "ap",
            Reward::Keyword { .. } => "keyword",
            Reward::PtjExp { .. } => "ptj_exp",
        }
    }
}

/// Applies reward effects to a character.
///
/// Each call is independent; the ledger logs and skips failures.
pub trait RewardEffects: Send + Sync {
    fn apply(
        &self,
        character_id: &str,
        quest: &QuestRecord,
        reward: &Reward,
    ) -> Result<(), RewardError>;
}

/// Reward effects for a server without character stat storage wired in.
/// Currency, items, and experience are logged as granted; everything else
/// reports `NotImplemented`.
#[derive(Debug, Default)]
pub struct LoggedRewardEffects;

impl RewardEffects for LoggedRewardEffects {
    fn apply(
        &self,
        character_id: &str,
        quest: &QuestRecord,
        reward: &Reward,
    ) -> Result<(), RewardError> {
        match reward {
            Reward::Gold { amount } => {
                info!("{} receives {} gold from quest {}", character_id, amount, quest.template_id);
            }
            Reward::Exp { amount } | Reward::ExplorationExp { amount } => {
                info!(
                    "{} receives {} {} from quest {}",
                    character_id,
                    amount,
                    reward.kind(),
                    quest.template_id
                );
            }
            Reward::Item { item_id, count } => {
                info!(
                    "{} receives {}x item {} from quest {}",
                    character_id, count, item_id, quest.template_id
                );
            }
            other => return Err(RewardError::NotImplemented(other.kind())),
        }
        Ok(())
    }
}
