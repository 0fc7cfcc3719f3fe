//! Fixed-period driver for the sync engine
//!
//! Two triggers feed the same engine: a frame-rate interval and, when the
//! host provides one, a time-update channel from the player. Either alone
//! keeps highlighting correct if the other is throttled; the engine ignores
//! ticks that see an unchanged clock position.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::engine::{SyncEngine, TickTrigger};

/// Sync engine shared between the orchestrator and its ticker task
pub type SharedSyncEngine = Arc<Mutex<SyncEngine>>;

/// Wrap an engine for sharing with a ticker
pub fn shared(engine: SyncEngine) -> SharedSyncEngine {
    Arc::new(Mutex::new(engine))
}

/// Spawn the tick loop for the engine's current generation
///
/// The task exits as soon as the engine's generation changes (pause, resume,
/// restart or reset), so it never ticks against state it was not started
/// for. `time_updates` carries the player's position on each time-update
/// event; the value itself is not used because the engine re-reads its clock.
pub fn spawn_ticker(
    engine: SharedSyncEngine,
    period: Duration,
    mut time_updates: Option<watch::Receiver<f64>>,
) -> JoinHandle<()> {
    let generation = engine.lock().generation();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let trigger = match time_updates.as_mut() {
                Some(rx) => tokio::select! {
                    _ = interval.tick() => Some(TickTrigger::Frame),
                    changed = rx.changed() => changed.ok().map(|_| TickTrigger::TimeUpdate),
                },
                None => {
                    interval.tick().await;
                    Some(TickTrigger::Frame)
                }
            };

            let Some(trigger) = trigger else {
                tracing::debug!("Time-update channel closed, continuing on frame ticks");
                time_updates = None;
                continue;
            };

            let mut guard = engine.lock();
            if guard.generation() != generation {
                tracing::debug!(generation, "Ticker generation expired");
                break;
            }
            guard.tick(trigger);
        }
    })
}
