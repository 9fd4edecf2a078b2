//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache items. Reads only
//! discover expiry lazily, so without the sweep unread expired items would
//! hold memory indefinitely.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Floor applied to the sweep interval so a zero interval cannot spin.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running sweep. Dropping it stops the sweep.
#[derive(Debug)]
pub struct SweepHandle {
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stops the sweep.
    pub fn stop(self) {
        self.task.abort();
        info!("Expiry sweep stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a background task that periodically sweeps expired cache items.
///
/// The task runs in an infinite loop, sleeping for `interval` between runs
/// and taking the store's write lock only for the sweep itself. Intervals
/// below [`MIN_SWEEP_INTERVAL`] are raised to it.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(CacheStore::new(None, TtlTiers::default())));
/// let sweep = spawn_sweep_task(store.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep.stop();
/// ```
pub fn spawn_sweep_task(store: Arc<RwLock<CacheStore>>, interval: Duration) -> SweepHandle {
    if interval < MIN_SWEEP_INTERVAL {
        warn!(requested_ms = interval.as_millis() as u64, "sweep interval too small, clamping");
    }
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    let task = tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting expiry sweep");

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut store = store.write().await;
                store.cleanup_expired()
            };

            if removed > 0 {
                info!(removed, "Expiry sweep removed expired items");
            } else {
                debug!("Expiry sweep found no expired items");
            }
        }
    });

    SweepHandle { task }
}
