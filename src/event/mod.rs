//! Game Event Module
//!
//! Time-window driven server events (bonus weekends, festivals) and the
//! global bonus registry they feed.

pub mod bonus;
pub mod definition;
pub mod manager;
pub mod scheduler;
pub mod span;
pub mod timer;

pub use bonus::{GlobalBonus, GlobalBonusManager, GlobalBonusRegistry, GlobalBonusStat};
pub use definition::{BonusHooks, EventDefinition, load_event_definitions};
pub use manager::GameEventManager;
pub use scheduler::{EventScheduler, EventServices, GameEventHooks, NoHooks};
pub use span::ActivationSpan;
pub use timer::{Job, TokioTimer, Timer};
