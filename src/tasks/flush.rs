//! Write-Behind Flush Task
//!
//! The single worker that periodically persists the share cache.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::persistence::PersistenceManager;

/// Spawns the background task that calls `flush_to_disk` every `interval`.
///
/// The first flush happens one interval after spawning. The task exits when
/// `shutdown` flips to true, its sender is dropped, or the manager itself
/// has been dropped. Runs are never concurrent: the next tick is measured
/// from the end of the previous flush.
pub fn spawn_flush_task(
    manager: Weak<PersistenceManager>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        info!(
            "Starting metadata flush task with interval of {} seconds",
            period.as_secs()
        );

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(manager) = manager.upgrade() else {
                        debug!("persistence manager dropped, flush task exiting");
                        break;
                    };
                    manager.flush_to_disk().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("flush task received shutdown");
                        break;
                    }
                }
            }
        }
    })
}
