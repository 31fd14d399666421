//! Connection admission: a per-IP token-bucket rate limiter plus a global
//! connection-count semaphore (spec §5). Idle per-IP buckets are reaped
//! periodically so long-running servers don't grow the keyed limiter's map
//! without bound.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use vox_foundation::config::RateLimitConfig;

type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

fn nonzero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n.max(1)).expect("max(1) is never zero")
}

/// Holding this open counts the caller against the global connection limit;
/// dropping it releases the slot.
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

pub struct ConnectionGate {
    limiter: Option<Arc<KeyedLimiter>>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl ConnectionGate {
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = if config.enabled {
            let quota = Quota::per_second(nonzero(config.requests_per_second)).allow_burst(nonzero(config.burst_size));
            Some(Arc::new(RateLimiter::keyed(quota)))
        } else {
            None
        };
        Self {
            limiter,
            semaphore: Arc::new(tokio::sync::Semaphore::new(config.max_connections.max(1) as usize)),
        }
    }

    /// Checks the per-IP bucket and takes one global connection slot.
    /// Returns `None` when the caller should be rejected.
    pub async fn admit(&self, peer: IpAddr) -> Option<ConnectionPermit> {
        if let Some(limiter) = &self.limiter {
            if limiter.check_key(&peer).is_err() {
                tracing::debug!(%peer, "rate limit rejected connection");
                return None;
            }
        }
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(ConnectionPermit { _permit: permit })
    }

    /// Spawns a background task that periodically drops idle per-IP
    /// buckets from the keyed limiter's map.
    pub fn spawn_cleanup(&self, interval: Duration) {
        let Some(limiter) = self.limiter.clone() else { return };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                limiter.retain_recent();
            }
        });
    }
}
