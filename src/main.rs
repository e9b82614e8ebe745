use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use isometric_worldstate::event::{
    EventServices, GameEventManager, GlobalBonusManager, GlobalBonusStat, TokioTimer,
    load_event_definitions,
};
use isometric_worldstate::notifier::{ChannelNotifier, Outbound, Recipient};
use isometric_worldstate::quest::{LoggedRewardEffects, QuestRegistry, QuestServices};
use isometric_worldstate::world_events::{WorldEventBus, log_world_events};
use isometric_worldstate::{CharacterRegistry, ServerConfig};

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
struct AppState {
    characters: Arc<CharacterRegistry>,
    quest_registry: Arc<QuestRegistry>,
    events: Arc<GameEventManager>,
    bonuses: Arc<GlobalBonusManager>,
    world_events: Arc<WorldEventBus>,
}

impl AppState {
    fn new(config: &ServerConfig, notifier: ChannelNotifier) -> Self {
        let data_dir = config.data_dir.as_path();
        let notifier = Arc::new(notifier);

        // Load quest templates from TOML files
        let quest_registry = Arc::new(QuestRegistry::new(data_dir));
        if let Err(e) = quest_registry.load_all() {
            error!("Failed to load quest registry: {}", e);
        }

        let world_events = Arc::new(WorldEventBus::new(256));
        let quest_services = QuestServices {
            templates: quest_registry.clone(),
            notifier: notifier.clone(),
            rewards: Arc::new(LoggedRewardEffects),
            world_events: world_events.clone(),
        };

        // Register and schedule game events
        let bonuses = Arc::new(GlobalBonusManager::new());
        let event_services = EventServices {
            notifier,
            bonuses: bonuses.clone(),
            timer: Arc::new(TokioTimer),
            policy: config.events.reevaluation,
            notice_type: config.events.notice_type,
        };

        let events = Arc::new(GameEventManager::new());
        match load_event_definitions(data_dir) {
            Ok(definitions) => {
                for definition in definitions {
                    match definition.build(event_services.clone()) {
                        Ok(event) => {
                            events.register(event.clone());
                            definition.schedule(&event);
                        }
                        Err(e) => warn!("Skipping event '{}': {}", definition.id, e),
                    }
                }
            }
            Err(e) => error!("Failed to load game events: {}", e),
        }

        Self {
            characters: Arc::new(CharacterRegistry::new(quest_services)),
            quest_registry,
            events,
            bonuses,
            world_events,
        }
    }
}

/// Hands outbound messages to the transport. Until a client transport is
/// attached they are logged as JSON.
async fn drain_outbound(mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(out) = rx.recv().await {
        let payload = match serde_json::to_string(&out.message) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode {} message: {}", out.message.type_name(), e);
                continue;
            }
        };
        match out.recipient {
            Recipient::Character(id) => info!("-> {}: {}", id, payload),
            Recipient::Everyone => info!("-> *: {}", payload),
        }
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("server.toml"));

    let loaded = match ServerConfig::load(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    if !found {
        warn!("Config file {:?} not found, using defaults", config_path);
    }

    let (notifier, outbound) = ChannelNotifier::new();
    tokio::spawn(drain_outbound(outbound));

    let state = AppState::new(&config, notifier);
    info!(
        "World state ready: {} quest templates, {} game events, {} characters",
        state.quest_registry.count(),
        state.events.count(),
        state.characters.len()
    );

    // Log quest completions reported to the world
    tokio::spawn(log_world_events(state.world_events.subscribe()));

    // Periodic status report (every 60 seconds)
    let status_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;

            let active = status_state.events.active_events().await;
            if active.is_empty() {
                continue;
            }
            let (exp, sources) = status_state.bonuses.multiplier(GlobalBonusStat::CombatExp);
            info!(
                "Active events: {} (combat exp x{} from {:?})",
                active.join(", "),
                exp,
                sources
            );
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down, ending running events");
    for id in state.events.ids() {
        state.events.unregister(&id).await;
    }
}
