//! Per-character quest ledger.
//!
//! Owns the character's quest records keyed by template id and drives the
//! quest lifecycle: start, objective progress, completion and giving up.
//! Every read and write of the record map goes through one mutex, and the
//! collaborator calls of a transition happen while it is held.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::record::{ObjectiveProgress, QuestRecord, QuestState};
use super::registry::QuestTemplates;
use super::reward::RewardEffects;
use crate::error::{QuestError, RewardError};
use crate::inventory::{Inventory, Pocket};
use crate::notifier::Notifier;
use crate::protocol::{QuestInfo, ServerMessage};
use crate::world_events::WorldEvents;

/// Shared collaborators every ledger talks to
#[derive(Clone)]
pub struct QuestServices {
    pub templates: Arc<dyn QuestTemplates>,
    pub notifier: Arc<dyn Notifier>,
    pub rewards: Arc<dyn RewardEffects>,
    pub world_events: Arc<dyn WorldEvents>,
}

pub struct QuestLedger {
    character_id: String,
    services: QuestServices,
    inventory: Arc<dyn Inventory>,
    quests: Mutex<HashMap<u32, QuestRecord>>,
}

impl QuestLedger {
    pub fn new(character_id: &str, services: QuestServices, inventory: Arc<dyn Inventory>) -> Self {
        Self {
            character_id: character_id.to_string(),
            services,
            inventory,
            quests: Mutex::new(HashMap::new()),
        }
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    /// Adds the record, replacing whatever was stored under its template id
    pub async fn add(&self, quest: QuestRecord) {
        self.quests.lock().await.insert(quest.template_id, quest);
    }

    /// True if the character has the quest, complete or not
    pub async fn has(&self, template_id: u32) -> bool {
        self.quests.lock().await.contains_key(&template_id)
    }

    pub async fn get(&self, template_id: u32) -> Option<QuestRecord> {
        self.quests.lock().await.get(&template_id).cloned()
    }

    pub async fn get_by_unique_id(&self, unique_id: i64) -> Option<QuestRecord> {
        self.quests
            .lock()
            .await
            .values()
            .find(|q| q.unique_id == unique_id)
            .cloned()
    }

    /// Like `get_by_unique_id`, for callers where a miss means the client
    /// referenced a quest the server doesn't know about.
    pub async fn get_safe(&self, unique_id: i64) -> Result<QuestRecord, QuestError> {
        self.get_by_unique_id(unique_id).await.ok_or_else(|| {
            QuestError::SevereViolation(format!(
                "{} does not have quest 0x{:016X}",
                self.character_id, unique_id
            ))
        })
    }

    pub async fn is_complete(&self, template_id: u32) -> bool {
        self.quests
            .lock()
            .await
            .get(&template_id)
            .is_some_and(|q| q.state == QuestState::Complete)
    }

    /// Snapshot of all records
    pub async fn get_list(&self) -> Vec<QuestRecord> {
        self.quests.lock().await.values().cloned().collect()
    }

    /// Snapshot of records that aren't complete
    pub async fn get_incomplete_list(&self) -> Vec<QuestRecord> {
        self.quests
            .lock()
            .await
            .values()
            .filter(|q| q.state != QuestState::Complete)
            .cloned()
            .collect()
    }

    /// Starts a fresh instance of the quest. A copy of the same quest that is
    /// still in progress is given up first so the client never shows it twice.
    pub async fn start(&self, template_id: u32, owl: bool) -> Result<QuestRecord, QuestError> {
        let template = self
            .services
            .templates
            .get(template_id)
            .ok_or(QuestError::TemplateNotFound(template_id))?;

        let mut quests = self.quests.lock().await;

        let stale = quests
            .get(&template_id)
            .filter(|q| q.is_in_progress())
            .map(|q| q.unique_id);
        if let Some(unique_id) = stale {
            debug!(
                "{} restarts quest {}, giving up 0x{:016X}",
                self.character_id, template_id, unique_id
            );
            self.give_up_locked(&mut quests, template_id, unique_id);
        }

        let quest = QuestRecord::new(template);
        quests.insert(template_id, quest.clone());

        let notifier = &self.services.notifier;
        if owl {
            notifier.send_to(
                &self.character_id,
                ServerMessage::QuestOwlNew {
                    unique_id: quest.unique_id,
                },
            );
        }

        // Quest item, required to complete the quest
        if !self.inventory.add(quest.quest_item.clone(), Pocket::Quests) {
            warn!(
                "Quest item for 0x{:016X} was already in {}'s inventory",
                quest.unique_id, self.character_id
            );
        }

        notifier.send_to(
            &self.character_id,
            ServerMessage::QuestNew {
                quest: QuestInfo::from(&quest),
            },
        );

        info!(
            "{} started quest {} (0x{:016X})",
            self.character_id, template_id, quest.unique_id
        );
        Ok(quest)
    }

    /// Marks an objective done. Returns false if the character doesn't have
    /// the quest; an objective the template doesn't define is an error.
    pub async fn finish_objective(&self, template_id: u32, ident: &str) -> Result<bool, QuestError> {
        let mut quests = self.quests.lock().await;
        let Some(quest) = quests.get_mut(&template_id) else {
            return Ok(false);
        };

        let progress = quest
            .get_progress_mut(ident)
            .ok_or_else(|| QuestError::ObjectiveNotFound {
                template_id,
                ident: ident.to_string(),
            })?;
        progress.set_done();

        self.services
            .notifier
            .send_to(&self.character_id, ServerMessage::quest_update(quest));

        debug!("{} finished '{}' of quest {}", self.character_id, ident, template_id);
        Ok(true)
    }

    /// Adds to an objective's counter, marking it done once the target is
    /// reached. Returns the updated progress, or `None` if the character
    /// doesn't have the quest.
    pub async fn advance_objective(
        &self,
        template_id: u32,
        ident: &str,
        amount: i32,
    ) -> Result<Option<ObjectiveProgress>, QuestError> {
        let mut quests = self.quests.lock().await;
        let Some(quest) = quests.get_mut(&template_id) else {
            return Ok(None);
        };

        let progress = quest
            .get_progress_mut(ident)
            .ok_or_else(|| QuestError::ObjectiveNotFound {
                template_id,
                ident: ident.to_string(),
            })?;
        if progress.done {
            return Ok(Some(progress.clone()));
        }
        progress.add_progress(amount);
        let snapshot = progress.clone();

        self.services
            .notifier
            .send_to(&self.character_id, ServerMessage::quest_update(quest));

        Ok(Some(snapshot))
    }

    /// Completes the character's copy of the quest, if it's in progress.
    pub async fn complete(&self, template_id: u32, owl: bool) -> bool {
        let mut quests = self.quests.lock().await;
        let Some(unique_id) = quests.get(&template_id).map(|q| q.unique_id) else {
            return false;
        };
        self.complete_locked(&mut quests, template_id, unique_id, owl)
    }

    /// Completes this exact quest instance. Returns false if the ledger
    /// doesn't hold it (anymore) or it's already complete.
    pub async fn complete_quest(&self, quest: &QuestRecord, owl: bool) -> bool {
        let mut quests = self.quests.lock().await;
        self.complete_locked(&mut quests, quest.template_id, quest.unique_id, owl)
    }

    /// Terminates and removes the quest without rewards.
    pub async fn give_up(&self, quest: &QuestRecord) -> bool {
        let mut quests = self.quests.lock().await;
        self.give_up_locked(&mut quests, quest.template_id, quest.unique_id)
    }

    /// True if the quest is in progress with an objective left to do, and
    /// that objective is `objective` when one is given.
    pub async fn is_active(&self, template_id: u32, objective: Option<&str>) -> bool {
        let quests = self.quests.lock().await;
        let Some(quest) = quests.get(&template_id) else {
            return false;
        };

        let Some(current) = quest.current_objective() else {
            return false;
        };

        if let Some(ident) = objective {
            if current.ident != ident {
                return false;
            }
        }

        quest.state == QuestState::InProgress
    }

    fn complete_locked(
        &self,
        quests: &mut HashMap<u32, QuestRecord>,
        template_id: u32,
        unique_id: i64,
        owl: bool,
    ) -> bool {
        let Some(held) = held_in_progress(quests, template_id, unique_id) else {
            return false;
        };

        self.terminate(&held, true, owl);

        if let Some(quest) = quests.get_mut(&template_id) {
            quest.mark_complete();
        }

        info!(
            "{} completed quest {} (0x{:016X})",
            self.character_id, template_id, unique_id
        );
        self.services
            .world_events
            .on_player_completes_quest(&self.character_id, template_id);
        true
    }

    fn give_up_locked(
        &self,
        quests: &mut HashMap<u32, QuestRecord>,
        template_id: u32,
        unique_id: i64,
    ) -> bool {
        let Some(held) = held_in_progress(quests, template_id, unique_id) else {
            return false;
        };

        self.terminate(&held, false, false);
        quests.remove(&template_id);

        info!(
            "{} gave up quest {} (0x{:016X})",
            self.character_id, template_id, unique_id
        );
        true
    }

    /// Shared tail of completing and giving up: rewards (optional), quest
    /// item removal, and clearing the quest from the client's log.
    fn terminate(&self, quest: &QuestRecord, rewards: bool, owl: bool) {
        let notifier = &self.services.notifier;

        if rewards {
            if owl {
                notifier.send_to(
                    &self.character_id,
                    ServerMessage::QuestOwlComplete {
                        unique_id: quest.unique_id,
                    },
                );
            }

            for reward in &quest.template.rewards {
                match self.services.rewards.apply(&self.character_id, quest, reward) {
                    Ok(()) => {}
                    Err(RewardError::NotImplemented(kind)) => {
                        warn!(
                            "Unimplemented: quest {} reward '{}' skipped for {}",
                            quest.template_id, kind, self.character_id
                        );
                    }
                    Err(e) => {
                        error!(
                            "Quest {} reward '{}' failed for {}: {}",
                            quest.template_id,
                            reward.kind(),
                            self.character_id,
                            e
                        );
                    }
                }
            }
        }

        if !self.inventory.remove(&quest.quest_item) {
            warn!(
                "Quest item for 0x{:016X} missing from {}'s inventory",
                quest.unique_id, self.character_id
            );
        }

        notifier.send_to(
            &self.character_id,
            ServerMessage::QuestClear {
                unique_id: quest.unique_id,
            },
        );
    }
}

/// The stored record for `template_id`, if it is the instance `unique_id`
/// and still in progress.
fn held_in_progress(
    quests: &HashMap<u32, QuestRecord>,
    template_id: u32,
    unique_id: i64,
) -> Option<QuestRecord> {
    quests
        .get(&template_id)
        .filter(|q| q.unique_id == unique_id && q.is_in_progress())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::PocketInventory;
    use crate::notifier::{ChannelNotifier, Outbound, Recipient};
    use crate::quest::record::tests::template;
    use crate::quest::registry::QuestRegistry;
    use crate::quest::reward::Reward;
    use crate::world_events::{WorldEvent, WorldEventBus};
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{broadcast, mpsc};

    /// Records applied rewards; keyword rewards aren't implemented.
    #[derive(Default)]
    struct ScriptedRewards {
        applied: StdMutex<Vec<&'static str>>,
    }

    impl RewardEffects for ScriptedRewards {
        fn apply(
            &self,
            _character_id: &str,
            _quest: &QuestRecord,
            reward: &Reward,
        ) -> Result<(), RewardError> {
            match reward {
                Reward::Keyword { .. } => Err(RewardError::NotImplemented("keyword")),
                Reward::Ap { .. } => Err(RewardError::Failed("ap cap reached".into())),
                other => {
                    self.applied.lock().unwrap().push(other.kind());
                    Ok(())
                }
            }
        }
    }

    struct Fixture {
        ledger: QuestLedger,
        inventory: Arc<PocketInventory>,
        rewards: Arc<ScriptedRewards>,
        outbound: mpsc::UnboundedReceiver<Outbound>,
        world: broadcast::Receiver<WorldEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = std::env::temp_dir();
            let registry = QuestRegistry::new(&dir);
            for t in [
                template(1001, &["collect", "report"], vec![
                    Reward::Gold { amount: 100 },
                    Reward::Keyword { keyword: "g1".into() },
                    Reward::Exp { amount: 50 },
                ]),
                template(1002, &["talk"], vec![Reward::Ap { amount: 1 }, Reward::Gold { amount: 5 }]),
            ] {
                registry.insert((*t).clone());
            }

            let (notifier, outbound) = ChannelNotifier::new();
            let bus = Arc::new(WorldEventBus::new(16));
            let world = bus.subscribe();
            let rewards = Arc::new(ScriptedRewards::default());
            let inventory = Arc::new(PocketInventory::new());

            let services = QuestServices {
                templates: Arc::new(registry),
                notifier: Arc::new(notifier),
                rewards: rewards.clone(),
                world_events: bus,
            };

            Self {
                ledger: QuestLedger::new("char_1", services, inventory.clone()),
                inventory,
                rewards,
                outbound,
                world,
            }
        }

        fn drain(&mut self) -> Vec<&'static str> {
            let mut kinds = Vec::new();
            while let Ok(out) = self.outbound.try_recv() {
                assert_eq!(out.recipient, Recipient::Character("char_1".to_string()));
                kinds.push(out.message.type_name());
            }
            kinds
        }
    }

    #[tokio::test]
    async fn test_start_creates_record_item_and_notices() {
        let mut fx = Fixture::new();

        let quest = fx.ledger.start(1001, true).await.unwrap();

        assert_eq!(quest.state, QuestState::InProgress);
        assert!(fx.ledger.has(1001).await);
        assert!(fx.inventory.contains(&quest.quest_item));
        assert_eq!(fx.inventory.items_in(Pocket::Quests).len(), 1);
        assert_eq!(fx.drain(), vec!["questOwlNew", "questNew"]);
    }

    #[tokio::test]
    async fn test_start_without_owl() {
        let mut fx = Fixture::new();
        fx.ledger.start(1001, false).await.unwrap();
        assert_eq!(fx.drain(), vec!["questNew"]);
    }

    #[tokio::test]
    async fn test_start_unknown_template() {
        let fx = Fixture::new();
        assert_eq!(
            fx.ledger.start(9, true).await.unwrap_err(),
            QuestError::TemplateNotFound(9)
        );
        assert!(!fx.ledger.has(9).await);
    }

    #[tokio::test]
    async fn test_restart_replaces_in_progress_quest_without_rewards() {
        let mut fx = Fixture::new();
        let first = fx.ledger.start(1001, false).await.unwrap();
        fx.drain();

        let second = fx.ledger.start(1001, false).await.unwrap();

        assert_ne!(first.unique_id, second.unique_id);
        assert_eq!(fx.ledger.get_list().await.len(), 1);
        assert_eq!(fx.ledger.get(1001).await.unwrap().unique_id, second.unique_id);
        assert!(!fx.inventory.contains(&first.quest_item));
        assert!(fx.inventory.contains(&second.quest_item));
        assert!(fx.rewards.applied.lock().unwrap().is_empty());
        assert_eq!(fx.drain(), vec!["questClear", "questNew"]);
    }

    #[tokio::test]
    async fn test_restart_after_completion_creates_new_instance() {
        let fx = Fixture::new();
        let first = fx.ledger.start(1002, false).await.unwrap();
        assert!(fx.ledger.complete(1002, false).await);

        let second = fx.ledger.start(1002, false).await.unwrap();
        assert_ne!(first.unique_id, second.unique_id);
        assert!(!fx.ledger.is_complete(1002).await);
        assert_eq!(fx.ledger.get_list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_finish_objective() {
        let mut fx = Fixture::new();
        fx.ledger.start(1001, false).await.unwrap();
        fx.drain();

        assert!(fx.ledger.is_active(1001, Some("collect")).await);
        assert!(fx.ledger.finish_objective(1001, "collect").await.unwrap());
        assert_eq!(fx.drain(), vec!["questUpdate"]);

        assert!(!fx.ledger.is_active(1001, Some("collect")).await);
        assert!(fx.ledger.is_active(1001, Some("report")).await);
        assert!(fx.ledger.is_active(1001, None).await);
        assert_eq!(fx.ledger.get(1001).await.unwrap().state, QuestState::InProgress);

        assert!(fx.ledger.complete(1001, false).await);
        assert!(!fx.ledger.is_active(1001, None).await);
    }

    #[tokio::test]
    async fn test_finish_objective_missing_quest_and_objective() {
        let fx = Fixture::new();
        assert!(!fx.ledger.finish_objective(1001, "collect").await.unwrap());

        fx.ledger.start(1001, false).await.unwrap();
        let err = fx.ledger.finish_objective(1001, "dance").await.unwrap_err();
        assert_eq!(
            err,
            QuestError::ObjectiveNotFound {
                template_id: 1001,
                ident: "dance".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_advance_objective() {
        let mut fx = Fixture::new();
        assert_eq!(fx.ledger.advance_objective(1001, "collect", 1).await.unwrap(), None);

        fx.ledger.start(1001, false).await.unwrap();
        fx.drain();

        let progress = fx.ledger.advance_objective(1001, "collect", 2).await.unwrap().unwrap();
        assert_eq!((progress.count, progress.done), (2, false));
        let progress = fx.ledger.advance_objective(1001, "collect", 5).await.unwrap().unwrap();
        assert_eq!((progress.count, progress.done), (3, true));
        assert_eq!(fx.drain(), vec!["questUpdate", "questUpdate"]);

        // Already done, nothing to send
        fx.ledger.advance_objective(1001, "collect", 1).await.unwrap();
        assert!(fx.drain().is_empty());

        assert!(fx.ledger.advance_objective(1001, "dance", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_advance_objective_huge_amount() {
        let fx = Fixture::new();
        fx.ledger.start(1001, false).await.unwrap();
        fx.ledger.advance_objective(1001, "collect", 1).await.unwrap();

        let progress = fx
            .ledger
            .advance_objective(1001, "collect", i32::MAX)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((progress.count, progress.done), (3, true));
        assert!(fx.ledger.is_active(1001, Some("report")).await);
    }

    #[tokio::test]
    async fn test_is_active_false_when_all_done_or_complete() {
        let fx = Fixture::new();
        assert!(!fx.ledger.is_active(1002, None).await);

        fx.ledger.start(1002, false).await.unwrap();
        fx.ledger.finish_objective(1002, "talk").await.unwrap();
        assert!(!fx.ledger.is_active(1002, None).await);
        assert!(!fx.ledger.is_active(1002, Some("talk")).await);

        assert!(fx.ledger.complete(1002, false).await);
        assert!(!fx.ledger.is_active(1002, None).await);
    }

    #[tokio::test]
    async fn test_complete_skips_unimplemented_reward() {
        let mut fx = Fixture::new();
        let quest = fx.ledger.start(1001, false).await.unwrap();
        fx.drain();

        assert!(fx.ledger.complete_quest(&quest, true).await);

        assert_eq!(*fx.rewards.applied.lock().unwrap(), vec!["gold", "exp"]);
        assert!(!fx.inventory.contains(&quest.quest_item));
        assert_eq!(fx.drain(), vec!["questOwlComplete", "questClear"]);
        assert!(fx.ledger.has(1001).await);
        assert!(fx.ledger.is_complete(1001).await);
        assert!(fx.ledger.get(1001).await.unwrap().completed_at.is_some());
        assert_eq!(
            fx.world.try_recv().unwrap(),
            WorldEvent::QuestCompleted {
                character_id: "char_1".to_string(),
                template_id: 1001
            }
        );
    }

    #[tokio::test]
    async fn test_failed_reward_does_not_abort_siblings() {
        let fx = Fixture::new();
        fx.ledger.start(1002, false).await.unwrap();
        assert!(fx.ledger.complete(1002, false).await);
        assert_eq!(*fx.rewards.applied.lock().unwrap(), vec!["gold"]);
    }

    #[tokio::test]
    async fn test_complete_is_terminal() {
        let mut fx = Fixture::new();
        let quest = fx.ledger.start(1002, false).await.unwrap();
        assert!(fx.ledger.complete_quest(&quest, false).await);
        fx.drain();

        assert!(!fx.ledger.complete_quest(&quest, false).await);
        assert!(!fx.ledger.complete(1002, true).await);
        assert!(!fx.ledger.give_up(&quest).await);
        assert_eq!(fx.rewards.applied.lock().unwrap().len(), 1);
        assert!(fx.drain().is_empty());
        assert!(fx.ledger.is_complete(1002).await);
    }

    #[tokio::test]
    async fn test_complete_rejects_stale_instance() {
        let fx = Fixture::new();
        let stale = fx.ledger.start(1001, false).await.unwrap();
        let current = fx.ledger.start(1001, false).await.unwrap();

        assert!(!fx.ledger.complete_quest(&stale, false).await);
        assert!(!fx.ledger.give_up(&stale).await);
        assert!(fx.ledger.complete_quest(&current, false).await);
    }

    #[tokio::test]
    async fn test_missing_quest_completion() {
        let fx = Fixture::new();
        assert!(!fx.ledger.complete(1001, true).await);
        assert!(!fx.ledger.is_complete(1001).await);
    }

    #[tokio::test]
    async fn test_give_up_removes_record() {
        let mut fx = Fixture::new();
        let quest = fx.ledger.start(1001, false).await.unwrap();
        fx.drain();

        assert!(fx.ledger.give_up(&quest).await);

        assert!(!fx.ledger.has(1001).await);
        assert!(!fx.inventory.contains(&quest.quest_item));
        assert!(fx.rewards.applied.lock().unwrap().is_empty());
        assert_eq!(fx.drain(), vec!["questClear"]);
        assert!(fx.world.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_lookup_by_unique_id() {
        let fx = Fixture::new();
        let quest = fx.ledger.start(1001, false).await.unwrap();

        assert_eq!(
            fx.ledger.get_by_unique_id(quest.unique_id).await.unwrap().template_id,
            1001
        );
        assert!(fx.ledger.get_by_unique_id(quest.unique_id + 1).await.is_none());
        assert!(fx.ledger.get_safe(quest.unique_id).await.is_ok());

        let err = fx.ledger.get_safe(quest.unique_id + 1).await.unwrap_err();
        assert!(err.is_severe());
    }

    #[tokio::test]
    async fn test_lists_are_snapshots() {
        let fx = Fixture::new();
        fx.ledger.start(1001, false).await.unwrap();
        fx.ledger.start(1002, false).await.unwrap();
        fx.ledger.complete(1002, false).await;

        let all = fx.ledger.get_list().await;
        let incomplete = fx.ledger.get_incomplete_list().await;
        assert_eq!(all.len(), 2);
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].template_id, 1001);

        fx.ledger.give_up(&incomplete[0]).await;
        assert_eq!(all.len(), 2);
        assert_eq!(fx.ledger.get_list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_upserts_by_template_id() {
        let fx = Fixture::new();
        let t = template(1001, &["collect"], vec![]);
        let a = QuestRecord::new(t.clone());
        let b = QuestRecord::new(t);

        fx.ledger.add(a).await;
        fx.ledger.add(b.clone()).await;

        assert_eq!(fx.ledger.get_list().await.len(), 1);
        assert_eq!(fx.ledger.get(1001).await.unwrap().unique_id, b.unique_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_keep_one_record() {
        let fx = Fixture::new();
        let ledger = Arc::new(fx.ledger);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.start(1001, false).await.unwrap().unique_id
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 32);
        assert_eq!(ledger.get_list().await.len(), 1);
        // Every replaced instance gave its scroll back
        assert_eq!(fx.inventory.len(), 1);
    }
}
