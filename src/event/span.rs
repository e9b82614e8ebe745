use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A half-open window `[start, end)` in which an event is meant to be live.
/// `start <= end` isn't enforced; a degenerate span simply never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationSpan {
    /// Id of the event the span belongs to
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActivationSpan {
    pub fn new(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            start,
            end,
        }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.end
    }
}
