//! Background eviction of expired idle connections.
//!
//! # Responsibilities
//! - Periodically close idle links past the idle timeout
//! - Publish pool occupancy gauges
//! - Stop when the shutdown broadcast fires

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::pool::Pool;
use crate::store::Connector;

pub struct IdleReaper<C: Connector> {
    pool: Pool<C>,
    interval: Duration,
}

impl<C: Connector> IdleReaper<C> {
    pub fn new(pool: Pool<C>) -> Self {
        let interval = pool.config().reap_interval();
        Self { pool, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Idle connection reaper starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.pool.is_closed() {
                        break;
                    }
                    self.pool.reap_idle();
                    let status = self.pool.status();
                    metrics::record_pool_state(status.idle, status.live);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Idle reaper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
