//! Game event controller.
//!
//! An `EventScheduler` turns the activation spans registered for one event
//! into a live on/off flag, announces transitions server-wide, and lets the
//! event attach global bonuses while it runs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::bonus::{GlobalBonusRegistry, GlobalBonusStat};
use super::span::ActivationSpan;
use super::timer::Timer;
use crate::config::ReevaluationPolicy;
use crate::error::EventError;
use crate::notifier::Notifier;
use crate::protocol::{NoticeType, ServerMessage};

/// Event-specific behavior run on transitions.
///
/// Hooks run while the event's lock is held, after the live flag has
/// flipped and before the notice goes out.
pub trait GameEventHooks: Send + Sync {
    fn on_start(&self, _event: &EventScheduler) {}

    fn on_end(&self, _event: &EventScheduler) {}
}

/// Hooks for events that only announce themselves
#[derive(Debug, Default)]
pub struct NoHooks;

impl GameEventHooks for NoHooks {}

/// Collaborators shared by all events
#[derive(Clone)]
pub struct EventServices {
    pub notifier: Arc<dyn Notifier>,
    pub bonuses: Arc<dyn GlobalBonusRegistry>,
    pub timer: Arc<dyn Timer>,
    pub policy: ReevaluationPolicy,
    pub notice_type: NoticeType,
}

#[derive(Debug, Default)]
struct EventState {
    spans: Vec<ActivationSpan>,
    is_active: bool,
}

pub struct EventScheduler {
    id: String,
    name: String,
    services: EventServices,
    hooks: Box<dyn GameEventHooks>,
    state: Mutex<EventState>,
}

impl EventScheduler {
    pub fn new(
        id: &str,
        name: &str,
        services: EventServices,
        hooks: Box<dyn GameEventHooks>,
    ) -> Result<Self, EventError> {
        if id.trim().is_empty() || name.trim().is_empty() {
            return Err(EventError::InvalidDefinition(format!(
                "id or name not set (id '{}', name '{}')",
                id, name
            )));
        }

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            services,
            hooks,
            state: Mutex::new(EventState::default()),
        })
    }

    /// Stable identity, also used to attribute global bonuses
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name used in notices
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.is_active
    }

    pub async fn spans(&self) -> Vec<ActivationSpan> {
        self.state.lock().await.spans.clone()
    }

    /// Registers a span and re-evaluates the live flag against the current time.
    pub async fn add_activation_span(&self, span: ActivationSpan) {
        self.add_activation_span_at(span, Utc::now()).await;
    }

    /// Registers a span and re-evaluates the live flag as of `now`.
    ///
    /// With `NewSpanOnly` the decision looks at the new span alone, so a
    /// future span ends an event that an older span still covers.
    pub async fn add_activation_span_at(&self, span: ActivationSpan, now: DateTime<Utc>) {
        if span.id != self.id {
            warn!("Span for '{}' added to event '{}'", span.id, self.id);
        }

        let mut state = self.state.lock().await;
        let live = match self.services.policy {
            ReevaluationPolicy::NewSpanOnly => span.contains(now),
            ReevaluationPolicy::AllSpans => {
                span.contains(now) || state.spans.iter().any(|s| s.contains(now))
            }
        };

        debug!(
            "Event '{}' span {} - {} added ({} total)",
            self.id,
            span.start,
            span.end,
            state.spans.len() + 1
        );
        state.spans.push(span);

        if live {
            self.start_locked(&mut state);
        } else {
            self.end_locked(&mut state);
        }
    }

    /// True if any registered span covers `time`
    pub async fn is_active_time(&self, time: DateTime<Utc>) -> bool {
        self.state
            .lock()
            .await
            .spans
            .iter()
            .any(|s| s.contains(time))
    }

    /// Starts the event if it isn't running yet
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        self.start_locked(&mut state);
    }

    /// Ends the event if it's running
    pub async fn end(&self) {
        let mut state = self.state.lock().await;
        self.end_locked(&mut state);
    }

    /// Ends the event unless some span still covers `now`.
    pub async fn expire_at(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        if state.spans.iter().any(|s| s.contains(now)) {
            debug!("Event '{}' still covered at {}, not expiring", self.id, now);
            return;
        }
        self.end_locked(&mut state);
    }

    fn start_locked(&self, state: &mut EventState) {
        if state.is_active {
            return;
        }

        state.is_active = true;
        self.hooks.on_start(self);

        info!("Event '{}' started", self.id);
        self.services.notifier.broadcast(ServerMessage::Notice {
            notice_type: self.services.notice_type,
            text: format!("The {} Event is now in progress.", self.name),
        });
    }

    fn end_locked(&self, state: &mut EventState) {
        if !state.is_active {
            return;
        }

        state.is_active = false;
        self.hooks.on_end(self);

        info!("Event '{}' ended", self.id);
        self.services.notifier.broadcast(ServerMessage::Notice {
            notice_type: self.services.notice_type,
            text: format!("The {} Event has ended.", self.name),
        });
    }

    pub fn add_global_bonus(&self, stat: GlobalBonusStat, multiplier: f32) {
        self.services
            .bonuses
            .add_bonus(&self.id, &self.name, stat, multiplier);
    }

    /// Withdraws every bonus this event registered, whatever the stat
    pub fn remove_global_bonuses(&self) {
        self.services.bonuses.remove_bonuses(&self.id);
    }

    /// Asks the timer to activate the event for `[from, until)`. The span is
    /// registered once `from` is reached, and the event is expired at `until`.
    /// Jobs evaluate at no earlier than their scheduled time, since the wall
    /// clock may trail the timer's wake-up.
    pub fn schedule_event(self: &Arc<Self>, from: DateTime<Utc>, until: DateTime<Utc>) {
        let span = ActivationSpan::new(&self.id, from, until);

        let event = Arc::clone(self);
        self.services.timer.schedule_at(
            from,
            async move {
                event
                    .add_activation_span_at(span, from.max(Utc::now()))
                    .await;
            }
            .boxed(),
        );

        let event = Arc::clone(self);
        self.services.timer.schedule_at(
            until,
            async move {
                event.expire_at(until.max(Utc::now())).await;
            }
            .boxed(),
        );

        info!("Event '{}' scheduled for {} - {}", self.id, from, until);
    }

    pub fn schedule_event_for(self: &Arc<Self>, from: DateTime<Utc>, duration: Duration) {
        self.schedule_event(from, from + duration);
    }
}
