//! Retention housekeeping (spec §4.6) — periodically trims old completed
//! and dead-lettered job rows. Observability only, never correctness
//! load-bearing.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::queue::JobQueue;

/// Spawn a background task that sweeps the queue's retention window every
/// `interval`. Intended to be called once from `cli worker` alongside the
/// job workers.
pub fn spawn_retention_sweeper(queue: Arc<JobQueue>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match queue.trim_retention().await {
                Ok(()) => info!("retention sweep completed"),
                Err(err) => error!(%err, "retention sweep failed"),
            }
        }
    })
}
