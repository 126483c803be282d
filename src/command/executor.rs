//! GET/SET execution over pooled connections.

use std::time::{Duration, Instant};

use tokio::time::{self, error::Elapsed};

use crate::command::CommandError;
use crate::observability::metrics;
use crate::pool::{Pool, PoolStatus, PooledConnection};
use crate::store::{Connector, StoreConnection, StoreError};

/// Runs single store commands on behalf of request handlers.
pub struct CommandExecutor<C: Connector> {
    pool: Pool<C>,
    command_timeout: Duration,
}

impl<C: Connector> Clone for CommandExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            command_timeout: self.command_timeout,
        }
    }
}

impl<C: Connector> CommandExecutor<C> {
    pub fn new(pool: Pool<C>, command_timeout: Duration) -> Self {
        Self { pool, command_timeout }
    }

    pub fn pool(&self) -> &Pool<C> {
        &self.pool
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Read `key`. `Ok(None)` is a miss.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommandError> {
        let start = Instant::now();
        let result = match self.pool.acquire().await {
            Ok(mut pooled) => {
                let outcome = time::timeout(self.command_timeout, pooled.connection().get(key)).await;
                let result = self.settle(&mut pooled, outcome);
                self.pool.release(pooled).await;
                result
            }
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(Some(value)) => {
                metrics::record_command("GET", "hit", start);
                tracing::debug!(key = %key, bytes = value.len(), "GET hit");
            }
            Ok(None) => {
                metrics::record_command("GET", "miss", start);
                tracing::debug!(key = %key, "GET miss");
            }
            Err(e) => {
                metrics::record_command("GET", "error", start);
                tracing::error!(key = %key, error = %e, "GET failed");
            }
        }
        result
    }

    /// Write `value` under `key`. Succeeds only on the store's `OK` reply.
    pub async fn set(&self, key: &str, value: &[u8]) -> Result<(), CommandError> {
        let start = Instant::now();
        let result = match self.pool.acquire().await {
            Ok(mut pooled) => {
                let outcome =
                    time::timeout(self.command_timeout, pooled.connection().set(key, value)).await;
                let result = self.settle(&mut pooled, outcome);
                self.pool.release(pooled).await;
                result.and_then(|reply| {
                    if reply.is_ok() {
                        Ok(())
                    } else {
                        Err(CommandError::UnexpectedReply(reply.0))
                    }
                })
            }
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(()) => {
                metrics::record_command("SET", "ok", start);
                tracing::debug!(key = %key, bytes = value.len(), "SET successful");
            }
            Err(e) => {
                metrics::record_command("SET", "error", start);
                tracing::error!(key = %key, bytes = value.len(), error = %e, "SET failed");
            }
        }
        result
    }

    /// Fold a round-trip outcome into a result and flag the link's health.
    fn settle<T>(
        &self,
        pooled: &mut PooledConnection<C::Connection>,
        outcome: Result<Result<T, StoreError>, Elapsed>,
    ) -> Result<T, CommandError> {
        match outcome {
            Ok(Ok(value)) => {
                pooled.mark_verified();
                Ok(value)
            }
            Ok(Err(e)) => {
                // A store-side error reply leaves the link usable.
                if e.is_connection_error() {
                    pooled.mark_broken();
                }
                Err(CommandError::Store(e))
            }
            Err(_) => {
                pooled.mark_broken();
                Err(CommandError::Store(StoreError::Timeout(self.command_timeout)))
            }
        }
    }
}
