use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::inventory::PocketInventory;
use crate::quest::{PtjTracker, QuestLedger, QuestServices};

/// Quest-relevant state of one connected character. Each character owns
/// its own ledger and tracker locks, so characters never contend.
pub struct Character {
    pub id: String,
    pub name: String,
    pub inventory: Arc<PocketInventory>,
    pub quests: QuestLedger,
    pub ptj: PtjTracker,
}

impl Character {
    pub fn new(id: &str, name: &str, services: QuestServices) -> Self {
        let inventory = Arc::new(PocketInventory::new());
        Self {
            id: id.to_string(),
            name: name.to_string(),
            quests: QuestLedger::new(id, services, inventory.clone()),
            inventory,
            ptj: PtjTracker::new(),
        }
    }
}

/// All characters currently loaded on this server
pub struct CharacterRegistry {
    characters: DashMap<String, Arc<Character>>,
    services: QuestServices,
}

impl CharacterRegistry {
    pub fn new(services: QuestServices) -> Self {
        Self {
            characters: DashMap::new(),
            services,
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Character>> {
        self.characters.get(id).map(|entry| entry.value().clone())
    }

    /// Get the character, loading an empty one on first access
    pub fn get_or_create(&self, id: &str, name: &str) -> Arc<Character> {
        self.characters
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("Character {} ({}) loaded", name, id);
                Arc::new(Character::new(id, name, self.services.clone()))
            })
            .value()
            .clone()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Character>> {
        self.characters.remove(id).map(|(_, character)| character)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::ChannelNotifier;
    use crate::quest::record::tests::template;
    use crate::quest::{LoggedRewardEffects, PtjType, QuestRegistry};
    use crate::world_events::WorldEventBus;

    fn services() -> QuestServices {
        let registry = QuestRegistry::new(&std::env::temp_dir());
        registry.insert((*template(1001, &["collect"], vec![])).clone());
        let (notifier, _rx) = ChannelNotifier::new();
        QuestServices {
            templates: Arc::new(registry),
            notifier: Arc::new(notifier),
            rewards: Arc::new(LoggedRewardEffects),
            world_events: Arc::new(WorldEventBus::new(4)),
        }
    }

    #[test]
    fn test_get_or_create_reuses_character() {
        let registry = CharacterRegistry::new(services());
        let a = registry.get_or_create("char_1", "Tarlach");
        let b = registry.get_or_create("char_1", "Tarlach");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("char_1").is_some());
        assert!(registry.get("char_1").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_characters_have_separate_state() {
        let registry = CharacterRegistry::new(services());
        let a = registry.get_or_create("char_1", "Tarlach");
        let b = registry.get_or_create("char_2", "Mari");

        let quest = a.quests.start(1001, false).await.unwrap();
        a.ptj.modify_track_record(PtjType::Church, 1, 1).await;

        assert!(a.inventory.contains(&quest.quest_item));
        assert!(!b.quests.has(1001).await);
        assert!(b.inventory.is_empty());
        assert!(b.ptj.get_track_records().await.is_empty());
    }
}
