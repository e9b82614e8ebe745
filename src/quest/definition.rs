//! Quest Template Structures
//!
//! Templates are deserialized from TOML quest files and are immutable once
//! loaded. Quest records hold an `Arc` to the template they were started from.

use serde::{Deserialize, Serialize};

use super::reward::Reward;

/// A quest template file as it appears on disk
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: u32,
    /// Item class of the quest scroll put into the quest pocket
    pub scroll_id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_quest_type")]
    pub quest_type: String,
    #[serde(default)]
    pub cancelable: bool,
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

fn default_quest_type() -> String {
    "normal".to_string()
}

/// Raw objective as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    pub ident: String,
    #[serde(rename = "type")]
    pub objective_type: String,
    #[serde(default)]
    pub description: String,
    /// Race, NPC name, or item class depending on the type
    pub target: Option<String>,
    /// Item to hand over for deliver objectives
    pub item: Option<u32>,
    #[serde(default = "default_count")]
    pub count: i32,
}

fn default_count() -> i32 {
    1
}

// ============================================================================
// Resolved Template Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestType {
    Normal,
    Collect,
    Repeat,
    Event,
}

impl QuestType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(QuestType::Normal),
            "collect" => Some(QuestType::Collect),
            "repeat" => Some(QuestType::Repeat),
            "event" => Some(QuestType::Event),
            _ => None,
        }
    }
}

/// What has to happen for an objective to be done
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ObjectiveKind {
    /// Collect `amount` items of a class
    Collect { item_id: u32, amount: i32 },
    /// Kill `amount` creatures of a race
    Kill { race: String, amount: i32 },
    /// Talk to an NPC
    Talk { npc: String },
    /// Hand an item to an NPC
    Deliver { item_id: u32, npc: String },
    /// Reach a total level
    ReachLevel { level: i32 },
}

impl ObjectiveKind {
    pub fn from_raw(raw: &RawObjective) -> Result<Self, String> {
        let target = || {
            raw.target
                .clone()
                .ok_or_else(|| format!("Objective '{}' needs a target", raw.ident))
        };
        let item_target = || -> Result<u32, String> {
            let target = target()?;
            target
                .parse()
                .map_err(|_| format!("Objective '{}' has invalid item target '{}'", raw.ident, target))
        };

        match raw.objective_type.to_lowercase().as_str() {
            "collect" => Ok(ObjectiveKind::Collect {
                item_id: item_target()?,
                amount: raw.count,
            }),
            "kill" => Ok(ObjectiveKind::Kill {
                race: target()?,
                amount: raw.count,
            }),
            "talk" | "talk_to" => Ok(ObjectiveKind::Talk { npc: target()? }),
            "deliver" => Ok(ObjectiveKind::Deliver {
                item_id: raw
                    .item
                    .ok_or_else(|| format!("Objective '{}' needs an item", raw.ident))?,
                npc: target()?,
            }),
            "reach_level" | "level" => Ok(ObjectiveKind::ReachLevel { level: raw.count }),
            other => Err(format!(
                "Invalid objective type '{}' for '{}'",
                other, raw.ident
            )),
        }
    }

    /// Counter value at which the objective is done
    pub fn target_count(&self) -> i32 {
        match self {
            ObjectiveKind::Collect { amount, .. } | ObjectiveKind::Kill { amount, .. } => {
                (*amount).max(1)
            }
            ObjectiveKind::Talk { .. }
            | ObjectiveKind::Deliver { .. }
            | ObjectiveKind::ReachLevel { .. } => 1,
        }
    }
}

/// A resolved quest objective
#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveTemplate {
    pub ident: String,
    pub description: String,
    pub kind: ObjectiveKind,
}

/// A fully resolved quest template
#[derive(Debug, Clone, Serialize)]
pub struct QuestTemplate {
    pub id: u32,
    pub scroll_id: u32,
    pub name: String,
    pub description: String,
    pub quest_type: QuestType,
    pub cancelable: bool,
    /// Objectives in definition order
    pub objectives: Vec<ObjectiveTemplate>,
    pub rewards: Vec<Reward>,
}

impl QuestTemplate {
    /// Create a template from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        let quest_type = QuestType::from_str(&raw.quest_type)
            .ok_or_else(|| format!("Invalid quest type '{}'", raw.quest_type))?;

        let mut objectives: Vec<ObjectiveTemplate> = Vec::with_capacity(raw.objectives.len());
        for o in &raw.objectives {
            if objectives.iter().any(|existing| existing.ident == o.ident) {
                return Err(format!(
                    "Quest {} defines objective '{}' twice",
                    raw.id, o.ident
                ));
            }
            objectives.push(ObjectiveTemplate {
                ident: o.ident.clone(),
                description: o.description.clone(),
                kind: ObjectiveKind::from_raw(o)?,
            });
        }

        if objectives.is_empty() {
            return Err(format!("Quest {} has no objectives", raw.id));
        }

        Ok(Self {
            id: raw.id,
            scroll_id: raw.scroll_id,
            name: raw.name.clone(),
            description: raw.description.clone(),
            quest_type,
            cancelable: raw.cancelable,
            objectives,
            rewards: raw.rewards.clone(),
        })
    }

    /// Get objective by ident
    pub fn get_objective(&self, ident: &str) -> Option<&ObjectiveTemplate> {
        self.objectives.iter().find(|o| o.ident == ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK_WOLF: &str = r#"
[quest]
id = 71010
scroll_id = 70084
name = "Collect the Black Wolf's Fomor Scrolls"
type = "collect"
cancelable = true

[[quest.objectives]]
ident = "collect"
type = "collect"
target = "71010"
count = 10
description = "Collect 10 Black Wolf Fomor Scrolls"

[[quest.rewards]]
type = "gold"
amount = 4100
"#;

    #[test]
    fn test_parse_template() {
        let raw: RawQuestFile = toml::from_str(BLACK_WOLF).unwrap();
        let template = QuestTemplate::from_raw(&raw.quest).unwrap();

        assert_eq!(template.id, 71010);
        assert_eq!(template.quest_type, QuestType::Collect);
        assert!(template.cancelable);
        assert_eq!(
            template.objectives[0].kind,
            ObjectiveKind::Collect {
                item_id: 71010,
                amount: 10
            }
        );
        assert_eq!(template.objectives[0].kind.target_count(), 10);
        assert_eq!(template.rewards, vec![Reward::Gold { amount: 4100 }]);
        assert!(template.get_objective("collect").is_some());
        assert!(template.get_objective("talk").is_none());
    }

    #[test]
    fn test_rejects_duplicate_objectives() {
        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = 1
scroll_id = 2
name = "Twice"

[[quest.objectives]]
ident = "talk"
type = "talk"
target = "duncan"

[[quest.objectives]]
ident = "talk"
type = "talk"
target = "duncan"
"#,
        )
        .unwrap();
        assert!(QuestTemplate::from_raw(&raw.quest).is_err());
    }

    #[test]
    fn test_rejects_missing_target() {
        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = 1
scroll_id = 2
name = "No target"

[[quest.objectives]]
ident = "kill"
type = "kill"
count = 3
"#,
        )
        .unwrap();
        let err = QuestTemplate::from_raw(&raw.quest).unwrap_err();
        assert!(err.contains("needs a target"));
    }

    #[test]
    fn test_quest_type_parsing() {
        assert_eq!(QuestType::from_str("repeat"), Some(QuestType::Repeat));
        assert_eq!(QuestType::from_str("Normal"), Some(QuestType::Normal));
        assert_eq!(QuestType::from_str("daily"), None);
    }
}
