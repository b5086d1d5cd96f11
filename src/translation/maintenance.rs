/*!
 * Periodic cache eviction.
 */

use log::{debug, error, info};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use super::cache::TranslationCache;

/// Handle to a running cleanup task
#[derive(Debug)]
pub struct CleanupTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<usize>,
}

impl CleanupTask {
    /// Spawn a task evicting rows older than `max_days` every `every`
    ///
    /// The first pass runs immediately. Must be called inside a tokio runtime.
    pub fn spawn(cache: TranslationCache, max_days: u32, every: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut removed_total = 0usize;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match cache.cleanup(max_days).await {
                            Ok(removed) => {
                                removed_total += removed;
                                if removed > 0 {
                                    info!("Scheduled cleanup removed {} cache entries", removed);
                                } else {
                                    debug!("Scheduled cleanup found nothing to remove");
                                }
                            }
                            Err(e) => error!("Scheduled cache cleanup failed: {}", e),
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }

            removed_total
        });

        Self { shutdown, handle }
    }

    /// Stop the task and return how many rows it removed
    pub async fn shutdown(self) -> usize {
        let _ = self.shutdown.send(true);
        match self.handle.await {
            Ok(removed) => removed,
            Err(e) => {
                error!("Cleanup task ended abnormally: {}", e);
                0
            }
        }
    }
}
