use serde::{Deserialize, Serialize};

use crate::quest::{QuestRecord, QuestState};

// ============================================================================
// Notice Placement
// ============================================================================

/// Where a server notice is rendered on the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeType {
    Top,
    Middle,
    MiddleTop,
    TopRed,
    MiddleSystem,
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Owl delivery announcing a new quest
    QuestOwlNew { unique_id: i64 },

    /// Full quest info for the quest log
    QuestNew { quest: QuestInfo },

    /// Objective progress changed
    QuestUpdate {
        unique_id: i64,
        objectives: Vec<QuestObjectiveData>,
    },

    /// Owl delivery announcing a completed quest
    QuestOwlComplete { unique_id: i64 },

    /// Remove the quest from the quest log
    QuestClear { unique_id: i64 },

    /// Server-wide notice
    Notice { notice_type: NoticeType, text: String },
}

impl ServerMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::QuestOwlNew { .. } => "questOwlNew",
            ServerMessage::QuestNew { .. } => "questNew",
            ServerMessage::QuestUpdate { .. } => "questUpdate",
            ServerMessage::QuestOwlComplete { .. } => "questOwlComplete",
            ServerMessage::QuestClear { .. } => "questClear",
            ServerMessage::Notice { .. } => "notice",
        }
    }

    pub fn quest_update(quest: &QuestRecord) -> Self {
        ServerMessage::QuestUpdate {
            unique_id: quest.unique_id,
            objectives: QuestObjectiveData::from_record(quest),
        }
    }
}

/// Quest data for the QuestNew message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestInfo {
    pub unique_id: i64,
    pub template_id: u32,
    pub name: String,
    pub description: String,
    pub state: QuestState,
    pub cancelable: bool,
    pub objectives: Vec<QuestObjectiveData>,
}

impl From<&QuestRecord> for QuestInfo {
    fn from(quest: &QuestRecord) -> Self {
        Self {
            unique_id: quest.unique_id,
            template_id: quest.template_id,
            name: quest.template.name.clone(),
            description: quest.template.description.clone(),
            state: quest.state,
            cancelable: quest.template.cancelable,
            objectives: QuestObjectiveData::from_record(quest),
        }
    }
}

/// Objective data for quest messages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestObjectiveData {
    pub ident: String,
    pub description: String,
    pub count: i32,
    pub target: i32,
    pub done: bool,
}

impl QuestObjectiveData {
    fn from_record(quest: &QuestRecord) -> Vec<Self> {
        quest
            .template
            .objectives
            .iter()
            .zip(&quest.objectives)
            .map(|(def, progress)| Self {
                ident: progress.ident.clone(),
                description: def.description.clone(),
                count: progress.count,
                target: progress.target,
                done: progress.done,
            })
            .collect()
    }
}
