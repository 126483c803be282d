//! Liveness policy applied when a connection is handed back.
//!
//! The pool asks the policy about every returned link, passing how long ago
//! the link last proved itself alive (a successful command or probe). The
//! default [`FreshnessWindow`] only probes links that have been quiet longer
//! than the window, so busy links skip the extra round-trip.

use std::time::Duration;

use async_trait::async_trait;

use crate::store::StoreConnection;

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    /// Recently verified; reused without a probe.
    Fresh,
    /// A probe just succeeded.
    Verified,
    /// The link is dead and must be closed.
    Failed,
}

impl HealthVerdict {
    pub fn is_alive(self) -> bool {
        self != HealthVerdict::Failed
    }
}

/// Decides whether a link may go back into the idle set.
#[async_trait]
pub trait HealthCheck<T: StoreConnection>: Send + Sync {
    async fn check(&self, conn: &mut T, since_verified: Duration) -> HealthVerdict;
}

/// Probe only when the link has been quiet for at least `window`.
#[derive(Debug, Clone)]
pub struct FreshnessWindow {
    pub window: Duration,
    pub probe_timeout: Duration,
}

impl FreshnessWindow {
    pub fn new(window: Duration, probe_timeout: Duration) -> Self {
        Self { window, probe_timeout }
    }
}

#[async_trait]
impl<T: StoreConnection> HealthCheck<T> for FreshnessWindow {
    async fn check(&self, conn: &mut T, since_verified: Duration) -> HealthVerdict {
        if since_verified < self.window {
            return HealthVerdict::Fresh;
        }
        probe(conn, self.probe_timeout).await
    }
}

/// Probe every returned link.
#[derive(Debug, Clone)]
pub struct AlwaysProbe {
    pub probe_timeout: Duration,
}

#[async_trait]
impl<T: StoreConnection> HealthCheck<T> for AlwaysProbe {
    async fn check(&self, conn: &mut T, _since_verified: Duration) -> HealthVerdict {
        probe(conn, self.probe_timeout).await
    }
}

/// Trust every returned link.
#[derive(Debug, Clone, Default)]
pub struct NeverProbe;

#[async_trait]
impl<T: StoreConnection> HealthCheck<T> for NeverProbe {
    async fn check(&self, _conn: &mut T, _since_verified: Duration) -> HealthVerdict {
        HealthVerdict::Fresh
    }
}

async fn probe<T: StoreConnection>(conn: &mut T, timeout: Duration) -> HealthVerdict {
    match tokio::time::timeout(timeout, conn.ping()).await {
        Ok(Ok(())) => HealthVerdict::Verified,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Store liveness probe failed");
            HealthVerdict::Failed
        }
        Err(_) => {
            tracing::warn!(timeout = ?timeout, "Store liveness probe timed out");
            HealthVerdict::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SetReply, StoreError};

    struct Probed {
        pings: usize,
        alive: bool,
    }

    #[async_trait]
    impl StoreConnection for Probed {
        async fn get(&mut self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }

        async fn set(&mut self, _key: &str, _value: &[u8]) -> Result<SetReply, StoreError> {
            Ok(SetReply("OK".into()))
        }

        async fn ping(&mut self) -> Result<(), StoreError> {
            self.pings += 1;
            if self.alive {
                Ok(())
            } else {
                Err(StoreError::Connection("broken pipe".into()))
            }
        }
    }

    fn conn(alive: bool) -> Probed {
        Probed { pings: 0, alive }
    }

    #[tokio::test]
    async fn freshness_window_skips_probe_for_recent_links() {
        let policy = FreshnessWindow::new(Duration::from_secs(60), Duration::from_secs(1));
        let mut c = conn(false);

        let verdict = policy.check(&mut c, Duration::from_secs(5)).await;
        assert_eq!(verdict, HealthVerdict::Fresh);
        assert_eq!(c.pings, 0);
    }

    #[tokio::test]
    async fn freshness_window_probes_quiet_links() {
        let policy = FreshnessWindow::new(Duration::from_secs(60), Duration::from_secs(1));

        let mut alive = conn(true);
        assert_eq!(policy.check(&mut alive, Duration::from_secs(61)).await, HealthVerdict::Verified);
        assert_eq!(alive.pings, 1);

        let mut dead = conn(false);
        assert_eq!(policy.check(&mut dead, Duration::from_secs(61)).await, HealthVerdict::Failed);
    }

    #[tokio::test]
    async fn always_and_never_probe() {
        let mut c = conn(true);
        let always = AlwaysProbe { probe_timeout: Duration::from_secs(1) };
        assert_eq!(always.check(&mut c, Duration::ZERO).await, HealthVerdict::Verified);
        assert_eq!(c.pings, 1);

        let mut dead = conn(false);
        assert!(NeverProbe.check(&mut dead, Duration::from_secs(3600)).await.is_alive());
        assert_eq!(dead.pings, 0);
    }
}
