//! Display session: one cooperative task polling the store and driving effects.
//!
//! Snapshot ticks, sound-cue ticks, effect expiries and winner changes are
//! multiplexed with a biased `select!`, so every handler runs to completion
//! before the next one starts and an overrunning fetch delays, rather than
//! overlaps, the following cycle.

use std::time::Duration;

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{Instant, Interval, interval},
};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    services::{poller::SnapshotPoller, sse_events},
    state::{
        SharedState,
        edge::{EdgeDetector, EdgeEvent},
        effects::{DisplayCue, EffectChannel, EffectDurations, EffectOrchestrator},
        snapshot::GameStatus,
        timer::wait_until,
    },
};

/// Cadence and effect lengths of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Period of the full snapshot poll.
    pub snapshot_interval: Duration,
    /// Period of the cue-token poll.
    pub sound_interval: Duration,
    /// Effect lengths.
    pub durations: EffectDurations,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            snapshot_interval: config.polling.snapshot_interval,
            sound_interval: config.polling.sound_interval,
            durations: config.effects,
        }
    }
}

/// Owner of a running session task. Dropping it aborts the task.
pub struct SessionHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Ask the loop to tear down and wait until it has.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "display session ended abnormally");
            }
        }
    }

    /// Whether the loop already stopped.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start the display session loop for the game followed by `poller`.
pub fn spawn(state: SharedState, poller: SnapshotPoller, settings: SessionSettings) -> SessionHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run(state, poller, settings, shutdown_rx));
    SessionHandle {
        shutdown: Some(shutdown_tx),
        task: Some(task),
    }
}

async fn run(
    state: SharedState,
    poller: SnapshotPoller,
    settings: SessionSettings,
    mut shutdown: oneshot::Receiver<()>,
) {
    info!(
        game_id = %poller.game_id(),
        snapshot_interval = ?settings.snapshot_interval,
        sound_interval = ?settings.sound_interval,
        "display session started"
    );

    let mut snapshot_tick = interval(settings.snapshot_interval);
    let mut sound_tick = interval(settings.sound_interval);
    let mut winner = state.winner_watcher();
    let mut session = Session::new(state, poller, settings.durations);

    let initial = *winner.borrow_and_update();
    if initial.is_some() {
        session.on_winner(initial);
    }

    loop {
        let deadline = session.effects.next_deadline();
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = wait_until(deadline) => session.on_expiry(),
            changed = winner.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *winner.borrow_and_update();
                session.on_winner(current);
            }
            _ = snapshot_tick.tick() => session.poll_snapshot().await,
            _ = sound_tick.tick() => session.poll_sound_cues().await,
        }
    }

    session.teardown(snapshot_tick, sound_tick).await;
}

struct Session {
    state: SharedState,
    poller: SnapshotPoller,
    detector: EdgeDetector,
    effects: EffectOrchestrator,
}

impl Session {
    fn new(state: SharedState, poller: SnapshotPoller, durations: EffectDurations) -> Self {
        Self {
            state,
            poller,
            detector: EdgeDetector::new(),
            effects: EffectOrchestrator::new(durations),
        }
    }

    fn on_expiry(&mut self) {
        let cues = self.effects.expire(Instant::now());
        self.publish(&[], &cues);
    }

    fn on_winner(&mut self, winner: Option<usize>) {
        let cues = self.effects.set_winner(winner, Instant::now());
        self.publish(&[], &cues);
    }

    async fn poll_snapshot(&mut self) {
        let snapshot = match self.poller.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "snapshot poll failed; keeping last good snapshot");
                self.state.update_degraded(true);
                return;
            }
        };
        self.state.update_degraded(false);

        let now = Instant::now();
        let mut cues = self.effects.expire(now);
        let flash_active = self.effects.is_active(EffectChannel::StrikeFlash);
        let mut edges = self.detector.reconcile(snapshot.clone(), flash_active);

        if snapshot.status == GameStatus::Playing {
            match self.poller.fetch_revealed().await {
                Ok(revealed) => edges.extend(self.detector.observe_revealed(revealed)),
                Err(err) => {
                    warn!(error = %err, "revealed answers poll failed");
                    self.state.update_degraded(true);
                }
            }
        }

        let now = Instant::now();
        cues.extend(self.effects.sync_snapshot(&snapshot));
        cues.extend(self.effects.apply_edges(&edges, now));

        if !edges.is_empty() {
            debug!(count = edges.len(), "snapshot edges detected");
        }
        sse_events::broadcast_snapshot(&self.state, &snapshot);
        self.state.store_snapshot(snapshot).await;
        self.publish(&edges, &cues);
    }

    async fn poll_sound_cues(&mut self) {
        let tokens = match self.poller.fetch_sound_cues().await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "sound cue poll failed");
                self.state.update_degraded(true);
                return;
            }
        };
        self.state.update_degraded(false);

        let now = Instant::now();
        let mut cues = self.effects.expire(now);
        let edges = self.detector.observe_cues(&tokens);
        cues.extend(self.effects.apply_edges(&edges, now));
        self.publish(&edges, &cues);
    }

    fn publish(&self, edges: &[EdgeEvent], cues: &[DisplayCue]) {
        sse_events::broadcast_edges(&self.state, edges);
        sse_events::broadcast_display_cues(&self.state, cues);
        self.state.publish_effects(self.effects.view());
    }

    /// Cancel, in order, the snapshot interval, the sound interval, the effect
    /// timers, then the serial reader and its port.
    async fn teardown(mut self, snapshot_tick: Interval, sound_tick: Interval) {
        drop(snapshot_tick);
        drop(sound_tick);

        let cues = self.effects.cancel_all();
        self.publish(&[], &cues);

        let link = self.state.serial().lock().await.take();
        if let Some(link) = link {
            link.release().await;
        }

        self.detector.reset();
        self.state.clear_snapshot().await;
        info!(game_id = %self.poller.game_id(), "display session stopped");
    }
}
