//! Quest Instance Records
//!
//! One `QuestRecord` is one playthrough of a template. Records are owned by
//! a character's `QuestLedger`; anything handed out of the ledger is a copy.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::definition::QuestTemplate;
use crate::inventory::QuestItemRef;

/// First unique id handed out in this process
pub const QUEST_UNIQUE_ID_BASE: i64 = 0x0060_00F0_0000_0000;

static NEXT_QUEST_UNIQUE_ID: AtomicI64 = AtomicI64::new(QUEST_UNIQUE_ID_BASE);

/// Mint a quest unique id. Never repeats within the process.
pub fn next_unique_id() -> i64 {
    NEXT_QUEST_UNIQUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Lifecycle state of a quest record. A quest that hasn't been started has
/// no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestState {
    InProgress,
    Complete,
}

/// Progress on a single objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    pub ident: String,
    pub count: i32,
    pub target: i32,
    pub done: bool,
}

impl ObjectiveProgress {
    pub fn new(ident: &str, target: i32) -> Self {
        Self {
            ident: ident.to_string(),
            count: 0,
            target,
            done: false,
        }
    }

    /// Add to the counter, capped at the target. Returns true if this call
    /// finished the objective.
    pub fn add_progress(&mut self, amount: i32) -> bool {
        if self.done {
            return false;
        }
        self.count = self.count.saturating_add(amount).clamp(0, self.target);
        if self.count >= self.target {
            self.done = true;
            true
        } else {
            false
        }
    }

    /// Mark as done regardless of count
    pub fn set_done(&mut self) {
        self.count = self.target;
        self.done = true;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestRecord {
    pub template_id: u32,
    pub unique_id: i64,
    pub state: QuestState,
    /// Same order as the template's objectives
    pub objectives: Vec<ObjectiveProgress>,
    pub quest_item: QuestItemRef,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub template: Arc<QuestTemplate>,
}

impl QuestRecord {
    /// Instantiate a template with a freshly minted unique id
    pub fn new(template: Arc<QuestTemplate>) -> Self {
        let unique_id = next_unique_id();
        let objectives = template
            .objectives
            .iter()
            .map(|o| ObjectiveProgress::new(&o.ident, o.kind.target_count()))
            .collect();

        Self {
            template_id: template.id,
            unique_id,
            state: QuestState::InProgress,
            objectives,
            quest_item: QuestItemRef::new(template.scroll_id, unique_id),
            started_at: Utc::now(),
            completed_at: None,
            template,
        }
    }

    /// First objective that isn't done yet
    pub fn current_objective(&self) -> Option<&ObjectiveProgress> {
        self.objectives.iter().find(|o| !o.done)
    }

    pub fn get_progress_mut(&mut self, ident: &str) -> Option<&mut ObjectiveProgress> {
        self.objectives.iter_mut().find(|o| o.ident == ident)
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == QuestState::InProgress
    }

    pub(crate) fn mark_complete(&mut self) {
        self.state = QuestState::Complete;
        self.completed_at = Some(Utc::now());
    }

    /// Serialize objectives to JSON for database storage
    pub fn objectives_to_json(&self) -> String {
        serde_json::to_string(&self.objectives).unwrap_or_else(|_| "[]".to_string())
    }

    /// Restore objective progress saved with `objectives_to_json`. Entries
    /// are matched by ident; unknown idents are ignored.
    pub fn objectives_from_json(&mut self, json: &str) -> Result<(), String> {
        let saved: Vec<ObjectiveProgress> =
            serde_json::from_str(json).map_err(|e| format!("Invalid objective JSON: {}", e))?;

        for entry in saved {
            if let Some(progress) = self.get_progress_mut(&entry.ident) {
                progress.count = entry.count.clamp(0, progress.target);
                progress.done = entry.done;
            }
        }
        Ok(())
    }
}
