//! Quest Template Registry
//!
//! Loads and caches quest templates from TOML files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use super::definition::{QuestTemplate, RawQuestFile};

/// Source of immutable quest templates, keyed by template id.
pub trait QuestTemplates: Send + Sync {
    fn get(&self, template_id: u32) -> Option<Arc<QuestTemplate>>;
}

/// Registry for all quest templates
pub struct QuestRegistry {
    templates: DashMap<u32, Arc<QuestTemplate>>,
    /// Base directory for quest data
    data_dir: PathBuf,
}

impl QuestRegistry {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            templates: DashMap::new(),
            data_dir: data_dir.join("quests"),
        }
    }

    /// Load all quest templates from the data directory
    pub fn load_all(&self) -> Result<usize, String> {
        info!("Loading quests from {:?}", self.data_dir);

        if !self.data_dir.exists() {
            warn!("Quest directory does not exist: {:?}", self.data_dir);
            return Ok(0);
        }

        let mut paths = Vec::new();
        Self::collect_quest_files(&self.data_dir, &mut paths)?;

        let mut count = 0;
        for path in paths {
            match self.load_quest_file(&path) {
                Ok(()) => count += 1,
                Err(e) => warn!("Failed to load quest {:?}: {}", path, e),
            }
        }

        info!("Loaded {} quest templates", count);
        Ok(count)
    }

    /// Recursively collect TOML files below a directory. Symlinked
    /// directories are not followed.
    fn collect_quest_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), String> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| format!("Failed to stat {:?}: {}", path, e))?;

            if file_type.is_dir() {
                Self::collect_quest_files(&path, paths)?;
            } else if file_type.is_symlink() && path.is_dir() {
                warn!("Skipping symlinked quest directory {:?}", path);
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(())
    }

    /// Load a single quest file
    fn load_quest_file(&self, path: &Path) -> Result<(), String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

        let raw: RawQuestFile = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

        let template = QuestTemplate::from_raw(&raw.quest)?;
        if self.templates.contains_key(&template.id) {
            warn!("Duplicate quest id {} in {:?}, overwriting", template.id, path);
        }

        info!("Loaded quest: {} ({})", template.name, template.id);
        self.insert(template);
        Ok(())
    }

    /// Register a template that didn't come from disk
    pub fn insert(&self, template: QuestTemplate) {
        self.templates.insert(template.id, Arc::new(template));
    }

    pub fn count(&self) -> usize {
        self.templates.len()
    }
}

impl QuestTemplates for QuestRegistry {
    fn get(&self, template_id: u32) -> Option<Arc<QuestTemplate>> {
        self.templates.get(&template_id).map(|entry| entry.value().clone())
    }
}
