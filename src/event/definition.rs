//! Game event definitions loaded from TOML.
//!
//! ```toml
//! [event]
//! id = "double_rainbow"
//! name = "Double Rainbow"
//!
//! [[event.bonuses]]
//! stat = "combat_exp"
//! multiplier = 2.0
//!
//! [[event.schedule]]
//! from = "2026-10-24T00:00:00Z"
//! duration_hours = 48
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::bonus::GlobalBonusStat;
use super::scheduler::{EventScheduler, EventServices, GameEventHooks};
use crate::error::EventError;

#[derive(Debug, Clone, Deserialize)]
pub struct RawEventFile {
    pub event: RawEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bonuses: Vec<BonusDefinition>,
    #[serde(default)]
    pub schedule: Vec<RawScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BonusDefinition {
    pub stat: GlobalBonusStat,
    pub multiplier: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScheduleEntry {
    pub from: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
    pub duration_hours: Option<i64>,
}

/// A resolved event definition
#[derive(Debug, Clone)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    pub bonuses: Vec<BonusDefinition>,
    /// Activation windows as `(from, until)`
    pub windows: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl EventDefinition {
    pub fn from_raw(raw: &RawEvent) -> Result<Self, String> {
        let mut windows = Vec::with_capacity(raw.schedule.len());
        for (i, entry) in raw.schedule.iter().enumerate() {
            let until = match (entry.until, entry.duration_hours) {
                (Some(until), _) => until,
                (None, Some(hours)) => Duration::try_hours(hours)
                    .and_then(|duration| entry.from.checked_add_signed(duration))
                    .ok_or_else(|| {
                        format!(
                            "Schedule entry {} of '{}' has out of range duration_hours {}",
                            i, raw.id, hours
                        )
                    })?,
                (None, None) => {
                    return Err(format!(
                        "Schedule entry {} of '{}' needs until or duration_hours",
                        i, raw.id
                    ));
                }
            };
            if until < entry.from {
                return Err(format!(
                    "Schedule entry {} of '{}' ends before it starts",
                    i, raw.id
                ));
            }
            windows.push((entry.from, until));
        }

        Ok(Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            bonuses: raw.bonuses.clone(),
            windows,
        })
    }

    /// Build the controller for this event, with hooks that register the
    /// configured bonuses while it runs.
    pub fn build(&self, services: EventServices) -> Result<Arc<EventScheduler>, EventError> {
        let hooks = BonusHooks {
            bonuses: self.bonuses.clone(),
        };
        EventScheduler::new(&self.id, &self.name, services, Box::new(hooks)).map(Arc::new)
    }

    /// Hand every activation window to the event's timer
    pub fn schedule(&self, event: &Arc<EventScheduler>) {
        for (from, until) in &self.windows {
            event.schedule_event(*from, *until);
        }
    }
}

/// Registers the event's bonuses on start and withdraws them on end
#[derive(Debug, Clone)]
pub struct BonusHooks {
    pub bonuses: Vec<BonusDefinition>,
}

impl GameEventHooks for BonusHooks {
    fn on_start(&self, event: &EventScheduler) {
        for bonus in &self.bonuses {
            event.add_global_bonus(bonus.stat, bonus.multiplier);
        }
    }

    fn on_end(&self, event: &EventScheduler) {
        event.remove_global_bonuses();
    }
}

/// Load every event definition below `<data_dir>/events`
pub fn load_event_definitions(data_dir: &Path) -> Result<Vec<EventDefinition>, String> {
    let events_dir = data_dir.join("events");

    if !events_dir.exists() {
        warn!("Events directory does not exist: {:?}", events_dir);
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(&events_dir)
        .map_err(|e| format!("Failed to read events directory: {}", e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut definitions = Vec::new();
    for path in paths {
        let loaded = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))
            .and_then(|content| {
                toml::from_str::<RawEventFile>(&content)
                    .map_err(|e| format!("Failed to parse {:?}: {}", path, e))
            })
            .and_then(|raw| EventDefinition::from_raw(&raw.event));

        match loaded {
            Ok(definition) => {
                info!(
                    "Loaded event: {} ({}), {} windows",
                    definition.name,
                    definition.id,
                    definition.windows.len()
                );
                definitions.push(definition);
            }
            Err(e) => warn!("Failed to load event {:?}: {}", path, e),
        }
    }

    Ok(definitions)
}
