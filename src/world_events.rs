//! World event reporting (quest completions feed achievements, titles,
//! and other listeners outside the quest core).

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WorldEvent {
    QuestCompleted { character_id: String, template_id: u32 },
}

/// Receives world-level notifications from the quest ledger.
pub trait WorldEvents: Send + Sync {
    fn on_player_completes_quest(&self, character_id: &str, template_id: u32);
}

/// Publishes world events to any number of subscribers.
pub struct WorldEventBus {
    tx: broadcast::Sender<WorldEvent>,
}

impl WorldEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.tx.subscribe()
    }
}

impl WorldEvents for WorldEventBus {
    fn on_player_completes_quest(&self, character_id: &str, template_id: u32) {
        let event = WorldEvent::QuestCompleted {
            character_id: character_id.to_string(),
            template_id,
        };
        // No subscribers is fine
        if self.tx.send(event).is_err() {
            debug!("No world event subscribers for quest {} completion", template_id);
        }
    }
}

/// Logs world events until every sender is gone. A lagging receiver skips
/// what it missed and keeps going. Returns how many events were logged.
pub async fn log_world_events(mut rx: broadcast::Receiver<WorldEvent>) -> usize {
    let mut logged = 0;
    loop {
        match rx.recv().await {
            Ok(WorldEvent::QuestCompleted {
                character_id,
                template_id,
            }) => {
                info!("World: {} completed quest {}", character_id, template_id);
                logged += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("World event log fell behind, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return logged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_reaches_subscriber() {
        let bus = WorldEventBus::new(8);
        let mut rx = bus.subscribe();

        bus.on_player_completes_quest("char_1", 1001);

        assert_eq!(
            rx.try_recv().unwrap(),
            WorldEvent::QuestCompleted {
                character_id: "char_1".to_string(),
                template_id: 1001,
            }
        );
    }

    #[tokio::test]
    async fn test_logger_survives_lag() {
        let bus = WorldEventBus::new(2);
        let rx = bus.subscribe();
        for template_id in 1..=4 {
            bus.on_player_completes_quest("char_1", template_id);
        }
        drop(bus);

        // The two oldest were overwritten, the rest still get logged
        assert_eq!(log_world_events(rx).await, 2);
    }

    #[test]
    fn test_no_subscribers() {
        let bus = WorldEventBus::new(8);
        bus.on_player_completes_quest("char_1", 1001);
    }
}
