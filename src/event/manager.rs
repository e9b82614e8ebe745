//! Registry of all game events known to the server.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use super::scheduler::EventScheduler;
use super::span::ActivationSpan;

#[derive(Default)]
pub struct GameEventManager {
    events: DashMap<String, Arc<EventScheduler>>,
}

impl GameEventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event under its id. Returns the event it replaced, if any.
    pub fn register(&self, event: Arc<EventScheduler>) -> Option<Arc<EventScheduler>> {
        let id = event.id().to_string();
        let replaced = self.events.insert(id.clone(), event);
        if replaced.is_some() {
            warn!("Game event '{}' registered twice, replacing", id);
        } else {
            info!("Registered game event '{}'", id);
        }
        replaced
    }

    /// Remove an event and end it if it's running
    pub async fn unregister(&self, id: &str) -> Option<Arc<EventScheduler>> {
        let (_, event) = self.events.remove(id)?;
        event.end().await;
        info!("Unregistered game event '{}'", id);
        Some(event)
    }

    pub fn get(&self, id: &str) -> Option<Arc<EventScheduler>> {
        self.events.get(id).map(|entry| entry.value().clone())
    }

    /// Route a span to the event that owns it. Returns false if no such
    /// event is registered.
    pub async fn add_activation_span(&self, span: ActivationSpan) -> bool {
        let Some(event) = self.get(&span.id) else {
            warn!("Activation span for unknown game event '{}'", span.id);
            return false;
        };
        event.add_activation_span(span).await;
        true
    }

    pub async fn is_active(&self, id: &str) -> bool {
        match self.get(id) {
            Some(event) => event.is_active().await,
            None => false,
        }
    }

    /// Ids of all events whose live flag is set
    pub async fn active_events(&self) -> Vec<String> {
        let events: Vec<Arc<EventScheduler>> =
            self.events.iter().map(|entry| entry.value().clone()).collect();

        let mut active = Vec::new();
        for event in events {
            if event.is_active().await {
                active.push(event.id().to_string());
            }
        }
        active.sort();
        active
    }

    pub fn ids(&self) -> Vec<String> {
        self.events.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.events.len()
    }
}
