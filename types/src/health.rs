//! Channel health bookkeeping and the aggregated `/health` snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Connecting,
    Active,
    Degraded,
    Disabled,
}

/// Per-channel bookkeeping, updated by the owning Ingress and read only by
/// the Watchdog (and, through it, the `/health` endpoint).
#[derive(Debug, Clone)]
pub struct ChannelHealthRecord {
    pub channel_id: String,
    pub last_message_at: Option<Instant>,
    pub reconnect_count: u64,
    pub fast_close_count: u64,
    pub state: ChannelState,
}

impl ChannelHealthRecord {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            last_message_at: None,
            reconnect_count: 0,
            fast_close_count: 0,
            state: ChannelState::Connecting,
        }
    }

    pub fn age_seconds(&self, now: Instant) -> Option<f64> {
        self.last_message_at
            .map(|t| now.saturating_duration_since(t).as_secs_f64())
    }
}

/// The JSON body `/health` serves: per-channel age plus the pipeline-wide
/// counters the Watchdog rule in §4.8 asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub channels: HashMap<String, ChannelHealthSummary>,
    pub reservation_count: u64,
    pub rate_limit_pool_size: usize,
    pub emitted_token_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelHealthSummary {
    pub last_message_age_seconds: Option<f64>,
    pub reconnect_count: u64,
    pub fast_close_count: u64,
    pub state: ChannelState,
}

/// Whoever assembles the aggregated `/health` snapshot (the Watchdog)
/// implements this so the webhook ingress can serve it without depending
/// on the watchdog crate directly.
pub trait HealthSnapshotProvider: Send + Sync {
    fn snapshot(&self) -> HealthSnapshot;
}

impl From<&ChannelHealthRecord> for ChannelHealthSummary {
    fn from(r: &ChannelHealthRecord) -> Self {
        Self {
            last_message_age_seconds: r.age_seconds(Instant::now()),
            reconnect_count: r.reconnect_count,
            fast_close_count: r.fast_close_count,
            state: r.state,
        }
    }
}
