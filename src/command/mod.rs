//! Store command subsystem.
//!
//! # Data Flow
//! ```text
//! Handler calls get/set
//!     → executor.rs acquires a pooled link
//!     → one GET or SET round-trip, bounded by the command timeout
//!     → link released in every outcome
//!     → Result returned to the handler, which picks the wire format
//! ```
//!
//! # Design Decisions
//! - Exactly one attempt per request; no retries
//! - A miss is `Ok(None)`, never an error
//! - Failures are logged here, with operation and key, before returning

pub mod executor;

pub use executor::CommandExecutor;

use crate::pool::PoolError;
use crate::store::StoreError;

/// Why a store command did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No connection could be obtained.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The round-trip itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store answered a write with something other than `OK`.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}
