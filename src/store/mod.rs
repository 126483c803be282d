//! Backing store subsystem.
//!
//! # Data Flow
//! ```text
//! Pool needs a new link
//!     → Connector::connect (one authenticated link per call)
//!     → StoreConnection (GET / SET / PING round-trips)
//!     → StoreError on I/O, protocol or timeout failure
//! ```
//!
//! # Design Decisions
//! - The pool only sees these traits, so tests can swap in an in-memory store
//! - Values are raw bytes here; base64 lives in the HTTP layer
//! - A connection is used by exactly one command at a time

pub mod client;

use async_trait::async_trait;

pub use client::{RedisConnection, RedisConnector};

/// The canonical reply a store sends to acknowledge a write.
pub const OK_REPLY: &str = "OK";

/// Errors produced while talking to the backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The link could not be opened or broke mid-command.
    #[error("connection error: {0}")]
    Connection(String),

    /// The store answered, but with an error or a reply of the wrong shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No reply arrived within the deadline.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The configured store address is unusable.
    #[error("invalid store url: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    /// Whether the link that produced this error must not be reused.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Timeout(_))
    }
}

/// Status reply returned by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetReply(pub String);

impl SetReply {
    /// True when the store acknowledged the write with `OK`.
    pub fn is_ok(&self) -> bool {
        self.0 == OK_REPLY
    }
}

/// A single exclusive link to the backing store.
#[async_trait]
pub trait StoreConnection: Send + 'static {
    /// Read a value. `Ok(None)` means the key does not exist.
    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write `value` under `key` and return the store's status reply.
    async fn set(&mut self, key: &str, value: &[u8]) -> Result<SetReply, StoreError>;

    /// Liveness probe.
    async fn ping(&mut self) -> Result<(), StoreError>;
}

/// Opens new links to the backing store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: StoreConnection;

    async fn connect(&self) -> Result<Self::Connection, StoreError>;
}
