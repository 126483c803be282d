//! Connection pool subsystem.
//!
//! # Data Flow
//! ```text
//! Command needs a link
//!     → manager.rs acquire (wait for a checkout permit)
//!         → reuse newest idle link, dropping expired ones
//!         → or open a new one through the Connector
//!     → command runs on the PooledConnection
//!     → manager.rs release
//!         → health.rs decides: fresh, probe, or discard
//!         → back to idle (up to max_idle) or closed
//!
//! reaper.rs: periodic sweep of idle links past idle_timeout
//! ```
//!
//! # Invariants
//! - live connections <= max_total at all times
//! - idle connections <= max_idle at all times
//! - a link is owned by the idle set or by exactly one command, never both
//!
//! # Design Decisions
//! - Checkouts are bounded by a semaphore so saturated callers wait, not fail
//! - Closing the semaphore on shutdown fails every waiter instead of hanging it
//! - The state lock is never held across an await

pub mod health;
pub mod manager;
pub mod reaper;

pub use health::{AlwaysProbe, FreshnessWindow, HealthCheck, HealthVerdict, NeverProbe};
pub use manager::{Pool, PooledConnection};
pub use reaper::IdleReaper;

use serde::Serialize;

use crate::store::StoreError;

/// Errors returned by [`Pool::acquire`].
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool has been shut down.
    #[error("connection pool is shut down")]
    Closed,

    /// Opening a new link failed.
    #[error("failed to open store connection: {0}")]
    Connect(#[from] StoreError),
}

/// Point-in-time view of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Open links, idle or checked out (including ones being dialed).
    pub live: usize,
    /// Links parked in the idle set.
    pub idle: usize,
    /// Links held by in-flight commands.
    pub checked_out: usize,
    pub max_total: usize,
    pub max_idle: usize,
}
