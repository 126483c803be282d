//! Bounded pool of backing store connections.
//!
//! # Responsibilities
//! - Hand out one exclusive link per command, opening links lazily
//! - Block callers while every permitted link is checked out
//! - Keep at most `max_idle` links warm, evicting ones idle too long
//! - Close everything on shutdown and refuse later acquisitions

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::schema::{HealthCheckPolicy, PoolConfig};
use crate::observability::metrics;
use crate::pool::health::{AlwaysProbe, FreshnessWindow, HealthCheck, HealthVerdict, NeverProbe};
use crate::pool::{PoolError, PoolStatus};
use crate::store::Connector;

/// Counts one open link. Dropping it (with the link) lowers the live count.
#[derive(Debug)]
struct LiveSlot {
    live: Arc<AtomicUsize>,
}

impl LiveSlot {
    fn open(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self { live: Arc::clone(live) }
    }
}

impl Drop for LiveSlot {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A link parked in the idle set.
struct IdleConnection<T> {
    conn: T,
    slot: LiveSlot,
    returned_at: Instant,
    verified_at: Instant,
}

/// A link checked out by one command.
///
/// Hand it back with [`Pool::release`]. Dropping it instead closes the link,
/// which is the right outcome for a command cancelled mid-flight.
pub struct PooledConnection<T> {
    // Field order is drop order: the link and its live slot go before the
    // permit, so a waiter woken by the permit never sees a stale live count.
    conn: T,
    slot: LiveSlot,
    permit: OwnedSemaphorePermit,
    verified_at: Instant,
    broken: bool,
}

impl<T> PooledConnection<T> {
    /// The underlying link.
    pub fn connection(&mut self) -> &mut T {
        &mut self.conn
    }

    /// Record a successful round-trip; it counts as a liveness check.
    pub fn mark_verified(&mut self) {
        self.verified_at = Instant::now();
    }

    /// Mark the link unusable so `release` closes it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Time since the link last proved itself alive.
    pub fn since_verified(&self) -> Duration {
        self.verified_at.elapsed()
    }
}

struct PoolState<T> {
    /// Oldest first; the back is the most recently returned link.
    idle: Vec<IdleConnection<T>>,
}

struct PoolInner<C: Connector> {
    connector: C,
    config: PoolConfig,
    health: Arc<dyn HealthCheck<C::Connection>>,
    permits: Arc<Semaphore>,
    state: Mutex<PoolState<C::Connection>>,
    live: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl<C: Connector> PoolInner<C> {
    fn lock_state(&self) -> MutexGuard<'_, PoolState<C::Connection>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Shared handle to the connection pool. Cloning is cheap.
pub struct Pool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> Pool<C> {
    /// Create a pool using the health policy named in `config`.
    pub fn new(connector: C, config: PoolConfig) -> Self {
        let health: Arc<dyn HealthCheck<C::Connection>> = match config.health_check {
            HealthCheckPolicy::FreshnessWindow => Arc::new(FreshnessWindow::new(
                config.health_check_freshness(),
                config.probe_timeout(),
            )),
            HealthCheckPolicy::AlwaysProbe => Arc::new(AlwaysProbe {
                probe_timeout: config.probe_timeout(),
            }),
            HealthCheckPolicy::NeverProbe => Arc::new(NeverProbe),
        };
        Self::with_health_check(connector, config, health)
    }

    /// Create a pool with a custom health policy.
    pub fn with_health_check(
        connector: C,
        config: PoolConfig,
        health: Arc<dyn HealthCheck<C::Connection>>,
    ) -> Self {
        tracing::info!(
            max_total = config.max_total_connections,
            max_idle = config.max_idle_connections,
            idle_timeout = ?config.idle_timeout(),
            policy = ?config.health_check,
            "Connection pool created"
        );

        Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(config.max_total_connections)),
                state: Mutex::new(PoolState {
                    idle: Vec::with_capacity(config.max_idle_connections),
                }),
                live: Arc::new(AtomicUsize::new(0)),
                closed: AtomicBool::new(false),
                connector,
                config,
                health,
            }),
        }
    }

    /// Check out a link, waiting while `max_total` links are in use.
    pub async fn acquire(&self) -> Result<PooledConnection<C::Connection>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        // The permit may have been granted just before shutdown closed the
        // semaphore.
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        if let Some(idle) = self.take_idle() {
            return Ok(PooledConnection {
                conn: idle.conn,
                slot: idle.slot,
                permit,
                verified_at: idle.verified_at,
                broken: false,
            });
        }

        let slot = LiveSlot::open(&self.inner.live);
        match self.inner.connector.connect().await {
            Ok(conn) if self.is_closed() => {
                metrics::record_pool_connect(true);
                metrics::record_pool_discard("shutdown", 1);
                drop(conn);
                drop(slot);
                Err(PoolError::Closed)
            }
            Ok(conn) => {
                metrics::record_pool_connect(true);
                tracing::debug!(live = self.inner.live.load(Ordering::SeqCst), "Opened pooled connection");
                Ok(PooledConnection {
                    conn,
                    slot,
                    permit,
                    verified_at: Instant::now(),
                    broken: false,
                })
            }
            Err(e) => {
                metrics::record_pool_connect(false);
                tracing::warn!(error = %e, "Failed to open store connection");
                drop(slot);
                Err(PoolError::Connect(e))
            }
        }
    }

    /// Pop the newest idle link, closing any that outlived the idle timeout.
    fn take_idle(&self) -> Option<IdleConnection<C::Connection>> {
        let idle_timeout = self.inner.config.idle_timeout();
        let mut state = self.inner.lock_state();

        let before = state.idle.len();
        state.idle.retain(|c| c.returned_at.elapsed() < idle_timeout);
        let expired = before - state.idle.len();
        if expired > 0 {
            metrics::record_pool_discard("idle_timeout", expired);
        }

        state.idle.pop()
    }

    /// Hand a link back. It rejoins the idle set only if it is healthy and
    /// there is room; otherwise it is closed.
    pub async fn release(&self, mut pooled: PooledConnection<C::Connection>) {
        if pooled.broken {
            metrics::record_pool_discard("broken", 1);
            return;
        }
        if self.is_closed() {
            metrics::record_pool_discard("shutdown", 1);
            return;
        }

        let since_verified = pooled.since_verified();
        match self.inner.health.check(&mut pooled.conn, since_verified).await {
            HealthVerdict::Fresh => {}
            HealthVerdict::Verified => pooled.mark_verified(),
            HealthVerdict::Failed => {
                metrics::record_pool_discard("unhealthy", 1);
                return;
            }
        }

        let PooledConnection {
            conn,
            slot,
            permit,
            verified_at,
            ..
        } = pooled;

        let mut state = self.inner.lock_state();
        let rejected = if self.is_closed() {
            Some("shutdown")
        } else if state.idle.len() >= self.inner.config.max_idle_connections {
            Some("idle_full")
        } else {
            None
        };
        if let Some(reason) = rejected {
            drop(state);
            drop(conn);
            drop(slot);
            drop(permit);
            metrics::record_pool_discard(reason, 1);
            return;
        }

        state.idle.push(IdleConnection {
            conn,
            slot,
            returned_at: Instant::now(),
            verified_at,
        });
        // Free the permit while the link is visibly idle, so the next
        // acquirer reuses it instead of dialing a new one.
        drop(permit);
    }

    /// Close idle links older than the idle timeout. Returns how many closed.
    pub fn reap_idle(&self) -> usize {
        let idle_timeout = self.inner.config.idle_timeout();
        let mut state = self.inner.lock_state();
        let before = state.idle.len();
        state.idle.retain(|c| c.returned_at.elapsed() < idle_timeout);
        let reaped = before - state.idle.len();
        drop(state);

        if reaped > 0 {
            metrics::record_pool_discard("idle_timeout", reaped);
            tracing::debug!(reaped, "Evicted expired idle connections");
        }
        reaped
    }

    /// Close every idle link and refuse further acquisitions. Links still
    /// checked out are closed when they are released. Safe to call twice.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.permits.close();

        let drained: Vec<_> = self.inner.lock_state().idle.drain(..).collect();
        let closed = drained.len();
        drop(drained);

        tracing::info!(
            closed_idle = closed,
            still_live = self.inner.live.load(Ordering::SeqCst),
            "Connection pool shut down"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Snapshot of pool occupancy.
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.lock_state();
        let idle = state.idle.len();
        let live = self.inner.live.load(Ordering::SeqCst);
        drop(state);

        PoolStatus {
            live,
            idle,
            checked_out: live.saturating_sub(idle),
            max_total: self.inner.config.max_total_connections,
            max_idle: self.inner.config.max_idle_connections,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}
