use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Pockets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pocket {
    Inventory = 0,
    Quests = 1,
    Temporary = 2,
}

// ============================================================================
// Quest Item
// ============================================================================

/// The scroll item a quest puts into the character's quest pocket.
/// Required to turn the quest in; removed when the quest terminates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestItemRef {
    pub entity_id: Uuid,
    /// Item class of the scroll
    pub item_class: u32,
    pub quest_unique_id: i64,
}

impl QuestItemRef {
    pub fn new(item_class: u32, quest_unique_id: i64) -> Self {
        Self {
            entity_id: Uuid::new_v4(),
            item_class,
            quest_unique_id,
        }
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// The add/remove contract the quest ledger needs from a character's inventory.
pub trait Inventory: Send + Sync {
    /// Put the item into the given pocket. Returns false if it was already there.
    fn add(&self, item: QuestItemRef, pocket: Pocket) -> bool;

    /// Take the item out of whatever pocket holds it. Returns false if missing.
    fn remove(&self, item: &QuestItemRef) -> bool;
}

/// In-memory inventory keyed by item entity id.
#[derive(Debug, Default)]
pub struct PocketInventory {
    items: DashMap<Uuid, (Pocket, QuestItemRef)>,
}

impl PocketInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, item: &QuestItemRef) -> bool {
        self.items.contains_key(&item.entity_id)
    }

    /// Items currently held in a pocket, in no particular order
    pub fn items_in(&self, pocket: Pocket) -> Vec<QuestItemRef> {
        self.items
            .iter()
            .filter(|entry| entry.value().0 == pocket)
            .map(|entry| entry.value().1.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Inventory for PocketInventory {
    fn add(&self, item: QuestItemRef, pocket: Pocket) -> bool {
        if self.items.contains_key(&item.entity_id) {
            return false;
        }
        self.items.insert(item.entity_id, (pocket, item));
        true
    }

    fn remove(&self, item: &QuestItemRef) -> bool {
        self.items.remove(&item.entity_id).is_some()
    }
}
