//! Server-wide bonuses contributed by running events.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalBonusStat {
    CombatExp,
    SkillTraining,
    ItemDropRate,
    GoldDropRate,
    QuestExp,
    LuckyFinish,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalBonus {
    pub event_id: String,
    pub event_name: String,
    pub stat: GlobalBonusStat,
    pub multiplier: f32,
}

/// Where events register their bonuses. Bonuses are attributed to the
/// event id so an event can withdraw everything it added.
pub trait GlobalBonusRegistry: Send + Sync {
    fn add_bonus(&self, event_id: &str, event_name: &str, stat: GlobalBonusStat, multiplier: f32);

    fn remove_bonuses(&self, event_id: &str);
}

#[derive(Debug, Default)]
pub struct GlobalBonusManager {
    bonuses: DashMap<String, Vec<GlobalBonus>>,
}

impl GlobalBonusManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combined multiplier for a stat and the names of the events
    /// contributing to it. `(1.0, [])` when nothing applies.
    pub fn multiplier(&self, stat: GlobalBonusStat) -> (f32, Vec<String>) {
        let mut total = 1.0;
        let mut names = Vec::new();

        for entry in self.bonuses.iter() {
            for bonus in entry.value().iter().filter(|b| b.stat == stat) {
                total *= bonus.multiplier;
                names.push(bonus.event_name.clone());
            }
        }

        (total, names)
    }

    /// Bonuses currently registered by an event
    pub fn bonuses_for(&self, event_id: &str) -> Vec<GlobalBonus> {
        self.bonuses
            .get(event_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl GlobalBonusRegistry for GlobalBonusManager {
    fn add_bonus(&self, event_id: &str, event_name: &str, stat: GlobalBonusStat, multiplier: f32) {
        self.bonuses
            .entry(event_id.to_string())
            .or_default()
            .push(GlobalBonus {
                event_id: event_id.to_string(),
                event_name: event_name.to_string(),
                stat,
                multiplier,
            });
        info!("Global bonus {:?} x{} added by {}", stat, multiplier, event_id);
    }

    fn remove_bonuses(&self, event_id: &str) {
        if let Some((_, removed)) = self.bonuses.remove(event_id) {
            info!("Removed {} global bonuses of {}", removed.len(), event_id);
        }
    }
}
