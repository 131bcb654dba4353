/// Button board and diagnostic log.
pub mod buttons;
/// Lock-in celebration gate.
pub mod celebration;
/// Snapshot diffing.
pub mod edge;
/// Timed display effects.
pub mod effects;
/// Immutable game snapshot.
pub mod snapshot;
mod sse;
/// Owned effect deadlines.
pub mod timer;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::game_store::GameStore,
    serial::link::SerialLink,
    state::{buttons::ButtonHub, effects::EffectsView, snapshot::Snapshot},
};

pub use self::sse::SseHub;

/// Reference-counted handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state shared by the HTTP layer and the display session.
pub struct AppState {
    config: AppConfig,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    public_sse: SseHub,
    buttons: Arc<ButtonHub>,
    serial: Mutex<Option<SerialLink>>,
    winner: watch::Sender<Option<usize>>,
    latest: RwLock<Option<Snapshot>>,
    effects: watch::Sender<EffectsView>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a store answers.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded, _rx) = watch::channel(true);
        let (winner, _rx) = watch::channel(None);
        let (effects, _rx) = watch::channel(EffectsView::default());
        Arc::new(Self {
            public_sse: SseHub::new(config.sse_capacity),
            buttons: Arc::new(ButtonHub::new(
                config.buzzers.button_count,
                config.buzzers.log_capacity,
            )),
            config,
            game_store: RwLock::new(None),
            serial: Mutex::new(None),
            winner,
            latest: RwLock::new(None),
            effects,
            degraded,
        })
    }

    /// Configuration the service was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install the store implementation used by the session and health checks.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        let mut guard = self.game_store.write().await;
        *guard = Some(store);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, logging transitions only.
    pub fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
        if changed {
            if value {
                warn!("store unreachable; entering degraded mode");
            } else {
                info!("store reachable; leaving degraded mode");
            }
        }
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Button board, link status and diagnostic log.
    pub fn buttons(&self) -> &Arc<ButtonHub> {
        &self.buttons
    }

    /// Slot owning the serial link, if one is open.
    pub fn serial(&self) -> &Mutex<Option<SerialLink>> {
        &self.serial
    }

    /// Externally designated winner.
    pub fn winner(&self) -> Option<usize> {
        *self.winner.borrow()
    }

    /// Replace the designated winner, returning the previous value.
    pub fn set_winner(&self, winner: Option<usize>) -> Option<usize> {
        self.winner.send_replace(winner)
    }

    /// Subscribe to winner changes.
    pub fn winner_watcher(&self) -> watch::Receiver<Option<usize>> {
        self.winner.subscribe()
    }

    /// Last good snapshot, if any poll succeeded yet.
    pub async fn latest_snapshot(&self) -> Option<Snapshot> {
        self.latest.read().await.clone()
    }

    /// Replace the last good snapshot.
    pub async fn store_snapshot(&self, snapshot: Snapshot) {
        *self.latest.write().await = Some(snapshot);
    }

    /// Drop the last good snapshot when the session ends.
    pub async fn clear_snapshot(&self) {
        self.latest.write().await.take();
    }

    /// Effects currently on screen.
    pub fn effects(&self) -> EffectsView {
        self.effects.borrow().clone()
    }

    /// Publish the effects currently on screen.
    pub fn publish_effects(&self, view: EffectsView) {
        self.effects.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}
