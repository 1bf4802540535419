//! Provider endpoints as seen by the rate-limited endpoint pool.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// The wire shape of an endpoint: plain HTTP RPC, a WebSocket stream, or gRPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Http,
    WebSocket,
    Grpc,
}

/// A named endpoint the pool may select among, plus the bookkeeping the
/// selection algorithm and disable/recover policy need.
///
/// `disabled_until`/`last_request_at` are wall-clock `Instant`s rather than
/// `serde`-able timestamps: endpoints are runtime-only state, never
/// persisted (only the whale registry and emitted-token set are).
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub url: String,
    pub kind: EndpointKind,
    pub weight: i64,
    pub rate_limit_per_second: f64,
    pub priority: u32,
    pub consecutive_errors: u32,
    pub disabled_until: Option<Instant>,
    pub last_request_at: Option<Instant>,
    /// Weighted round-robin accumulator; see the selection algorithm in `endpoint_pool`.
    pub current_weight: i64,
}

impl ProviderEndpoint {
    pub fn new(url: impl Into<String>, kind: EndpointKind, weight: i64, rate_limit_per_second: f64, priority: u32) -> Self {
        Self {
            url: url.into(),
            kind,
            weight,
            rate_limit_per_second,
            priority,
            consecutive_errors: 0,
            disabled_until: None,
            last_request_at: None,
            current_weight: 0,
        }
    }

    pub fn is_disabled(&self, now: Instant) -> bool {
        matches!(self.disabled_until, Some(until) if until > now)
    }

    pub fn min_interval(&self) -> Duration {
        if self.rate_limit_per_second <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / self.rate_limit_per_second)
        }
    }

    pub fn is_rate_eligible(&self, now: Instant) -> bool {
        match self.last_request_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval(),
        }
    }
}
