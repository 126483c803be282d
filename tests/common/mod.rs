//! Shared utilities for integration tests: an in-memory backing store with
//! knobs for latency and failure injection.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis_http_proxy::config::{PoolConfig, ProxyConfig};
use redis_http_proxy::store::{Connector, SetReply, StoreConnection, StoreError};
use redis_http_proxy::Pool;

#[derive(Default)]
struct StoreInner {
    data: Mutex<HashMap<String, Vec<u8>>>,
    delay: Mutex<Duration>,
    connect_delay: Mutex<Duration>,
    set_reply: Mutex<Option<String>>,
    connects: AtomicUsize,
    pings: AtomicUsize,
    open: AtomicUsize,
    max_open: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_connect: AtomicBool,
    fail_commands: AtomicBool,
    protocol_errors: AtomicBool,
    fail_pings: AtomicBool,
}

/// In-memory stand-in for the backing store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { store: self.clone() }
    }

    pub fn insert(&self, key: &str, value: &[u8]) {
        self.inner.data.lock().unwrap().insert(key.to_string(), value.to_vec());
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.data.lock().unwrap().get(key).cloned()
    }

    /// Every command sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = delay;
    }

    /// Every new connection takes this long to open.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.inner.connect_delay.lock().unwrap() = delay;
    }

    /// Answer SET with this status instead of OK.
    pub fn set_reply(&self, reply: &str) {
        *self.inner.set_reply.lock().unwrap() = Some(reply.to_string());
    }

    pub fn fail_connect(&self, fail: bool) {
        self.inner.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Commands fail as if the link broke.
    pub fn fail_commands(&self, fail: bool) {
        self.inner.fail_commands.store(fail, Ordering::SeqCst);
    }

    /// Commands fail with an error reply; the link stays usable.
    pub fn protocol_errors(&self, fail: bool) {
        self.inner.protocol_errors.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pings(&self, fail: bool) {
        self.inner.fail_pings.store(fail, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.inner.pings.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn open(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Highest number of connections ever open at once.
    pub fn max_open(&self) -> usize {
        self.inner.max_open.load(Ordering::SeqCst)
    }

    /// Highest number of commands ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    async fn begin_command(&self) -> Result<InFlight, StoreError> {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight { store: self.clone() };

        let delay = *self.inner.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.inner.fail_commands.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection reset by peer".into()));
        }
        if self.inner.protocol_errors.load(Ordering::SeqCst) {
            return Err(StoreError::Protocol(
                "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
            ));
        }
        Ok(guard)
    }
}

struct InFlight {
    store: MemoryStore,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.store.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MemoryConnector {
    store: MemoryStore,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, StoreError> {
        let inner = &self.store.inner;
        let delay = *inner.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if inner.fail_connect.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".into()));
        }
        inner.connects.fetch_add(1, Ordering::SeqCst);
        let open = inner.open.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_open.fetch_max(open, Ordering::SeqCst);
        Ok(MemoryConnection {
            store: self.store.clone(),
        })
    }
}

pub struct MemoryConnection {
    store: MemoryStore,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.store.inner.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let _guard = self.store.begin_command().await?;
        Ok(self.store.value(key))
    }

    async fn set(&mut self, key: &str, value: &[u8]) -> Result<SetReply, StoreError> {
        let _guard = self.store.begin_command().await?;
        if let Some(reply) = self.store.inner.set_reply.lock().unwrap().clone() {
            return Ok(SetReply(reply));
        }
        self.store.insert(key, value);
        Ok(SetReply("OK".into()))
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.store.inner.pings.fetch_add(1, Ordering::SeqCst);
        if self.store.inner.fail_pings.load(Ordering::SeqCst) {
            Err(StoreError::Connection("broken pipe".into()))
        } else {
            Ok(())
        }
    }
}

pub fn pool_config(max_total: usize, max_idle: usize) -> PoolConfig {
    PoolConfig {
        max_total_connections: max_total,
        max_idle_connections: max_idle,
        ..PoolConfig::default()
    }
}

pub fn memory_pool(store: &MemoryStore, config: PoolConfig) -> Pool<MemoryConnector> {
    Pool::new(store.connector(), config)
}

/// Proxy config suitable for in-process tests.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.store.command_timeout_ms = 1_000;
    config
}
