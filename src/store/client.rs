//! Redis-backed store connections.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, Value};
use url::Url;

use crate::store::{Connector, SetReply, StoreConnection, StoreError};

/// Opens connections to a Redis server described by a `redis://` or
/// `rediss://` URL (host, port, credentials and db all come from the URL).
#[derive(Debug, Clone)]
pub struct RedisConnector {
    client: redis::Client,
    connect_timeout: Duration,
    display_url: String,
}

impl RedisConnector {
    /// Create a connector. No network traffic happens until `connect`.
    pub fn new(url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            client,
            connect_timeout,
            display_url: redact_url(url),
        })
    }

    /// The store URL with any password masked, safe for logs.
    pub fn display_url(&self) -> &str {
        &self.display_url
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Connection = RedisConnection;

    async fn connect(&self) -> Result<RedisConnection, StoreError> {
        let fut = self.client.get_multiplexed_async_connection();
        let conn = match tokio::time::timeout(self.connect_timeout, fut).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(StoreError::Connection(e.to_string())),
            Err(_) => return Err(StoreError::Timeout(self.connect_timeout)),
        };
        tracing::debug!(url = %self.display_url, "Opened store connection");
        Ok(RedisConnection { conn })
    }
}

/// One Redis link. The pool hands it to a single command at a time.
pub struct RedisConnection {
    conn: MultiplexedConnection,
}

#[async_trait]
impl StoreConnection for RedisConnection {
    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<Vec<u8>>>(&mut self.conn)
            .await
            .map_err(classify)
    }

    async fn set(&mut self, key: &str, value: &[u8]) -> Result<SetReply, StoreError> {
        let reply = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<_, Value>(&mut self.conn)
            .await
            .map_err(classify)?;

        Ok(match reply {
            Value::Okay => SetReply(crate::store::OK_REPLY.to_string()),
            Value::Status(status) => SetReply(status),
            other => SetReply(format!("{:?}", other)),
        })
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.conn)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// Split driver errors into "link is dead" and "store said no".
fn classify(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Protocol(err.to_string())
    }
}

/// Mask the password component of a store URL.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparsable url>".to_string(),
    }
}
