//! Watchdog (§4.8): observes and alarms, never acts. A 30 s periodic task
//! inspects every ingress channel's `last_message_at`; it never restarts a
//! channel itself, since each Ingress owns its own reconnect policy.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use types::{ChannelHealthRecord, ChannelHealthSummary, HealthSnapshot, HealthSnapshotProvider};

const WAKE_INTERVAL: Duration = Duration::from_secs(30);
const SILENCE_THRESHOLD: Duration = Duration::from_secs(300);
const ALERT_REPEAT_INTERVAL: Duration = Duration::from_secs(60);

/// What the silence check found, independent of logging or throttling, so
/// the decision is testable without capturing log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SilenceStatus {
    Quiet,
    AllSilent,
    OneSilent { channel_id: String },
}

/// Pure classification of a channel-health snapshot against the 5-minute
/// silence rule (§4.8). A channel with no messages yet counts as silent.
pub fn silence_status(records: &[ChannelHealthRecord], now: Instant) -> SilenceStatus {
    if records.is_empty() {
        return SilenceStatus::Quiet;
    }

    let silent: Vec<&ChannelHealthRecord> = records
        .iter()
        .filter(|r| r.age_seconds(now).map(|age| age >= SILENCE_THRESHOLD.as_secs_f64()).unwrap_or(true))
        .collect();

    if silent.len() == records.len() {
        SilenceStatus::AllSilent
    } else if silent.len() == 1 && records.len() > 1 {
        SilenceStatus::OneSilent { channel_id: silent[0].channel_id.clone() }
    } else {
        SilenceStatus::Quiet
    }
}

pub struct Watchdog {
    channels: Vec<Arc<dyn ingress::Ingress>>,
    emitted: Arc<registry::EmittedTokenRegistry>,
    counters: telemetry::Counters,
    pool_size: usize,
    last_alert: Mutex<Option<Instant>>,
}

impl Watchdog {
    pub fn new(channels: Vec<Arc<dyn ingress::Ingress>>, emitted: Arc<registry::EmittedTokenRegistry>, counters: telemetry::Counters, pool_size: usize) -> Self {
        Self { channels, emitted, counters, pool_size, last_alert: Mutex::new(None) }
    }

    /// Wake every 30 s and re-check channel silence until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(WAKE_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.check(),
            }
        }
    }

    fn check(&self) {
        let now = Instant::now();
        let records: Vec<ChannelHealthRecord> = self.channels.iter().map(|c| c.health()).collect();
        match silence_status(&records, now) {
            SilenceStatus::Quiet => {}
            SilenceStatus::AllSilent => self.alert_throttled(|| tracing::error!("all ingress channels silent for >= 5 minutes")),
            SilenceStatus::OneSilent { channel_id } => {
                self.alert_throttled(|| tracing::warn!(channel = %channel_id, "one ingress channel silent for >= 5 minutes while others are active"))
            }
        }
    }

    /// Repeats an alarm log at most once per `ALERT_REPEAT_INTERVAL`,
    /// shared across both alarm kinds per §4.8's "every 60 s" cadence.
    fn alert_throttled(&self, log: impl FnOnce()) {
        let now = Instant::now();
        let mut last_alert = self.last_alert.lock().expect("watchdog alert-throttle lock poisoned");
        if let Some(last) = *last_alert {
            if now.duration_since(last) < ALERT_REPEAT_INTERVAL {
                return;
            }
        }
        *last_alert = Some(now);
        log();
    }
}

impl HealthSnapshotProvider for Watchdog {
    fn snapshot(&self) -> HealthSnapshot {
        let channels = self
            .channels
            .iter()
            .map(|c| {
                let record = c.health();
                (record.channel_id.clone(), ChannelHealthSummary::from(&record))
            })
            .collect();

        HealthSnapshot {
            channels,
            reservation_count: self.counters.get(telemetry::names::RESERVATIONS),
            rate_limit_pool_size: self.pool_size,
            emitted_token_count: self.emitted.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use types::{ChannelState, Candidate};

    fn record(channel_id: &str, last_message_at: Option<Instant>) -> ChannelHealthRecord {
        ChannelHealthRecord {
            channel_id: channel_id.to_string(),
            last_message_at,
            reconnect_count: 0,
            fast_close_count: 0,
            state: ChannelState::Active,
        }
    }

    #[test]
    fn all_channels_fresh_is_quiet() {
        let now = Instant::now();
        let records = vec![record("a", Some(now)), record("b", Some(now))];
        assert_eq!(silence_status(&records, now), SilenceStatus::Quiet);
    }

    #[test]
    fn every_channel_silent_raises_all_silent() {
        let now = Instant::now();
        let stale = now - Duration::from_secs(400);
        let records = vec![record("a", Some(stale)), record("b", Some(stale))];
        assert_eq!(silence_status(&records, now), SilenceStatus::AllSilent);
    }

    #[test]
    fn single_stale_channel_among_fresh_ones_raises_one_silent() {
        let now = Instant::now();
        let stale = now - Duration::from_secs(400);
        let records = vec![record("a", Some(stale)), record("b", Some(now))];
        assert_eq!(silence_status(&records, now), SilenceStatus::OneSilent { channel_id: "a".to_string() });
    }

    #[test]
    fn channel_with_no_messages_yet_counts_as_silent() {
        let now = Instant::now();
        let records = vec![record("a", None), record("b", Some(now))];
        assert_eq!(silence_status(&records, now), SilenceStatus::OneSilent { channel_id: "a".to_string() });
    }

    struct FakeIngress {
        health: ChannelHealthRecord,
    }

    #[async_trait]
    impl ingress::Ingress for FakeIngress {
        async fn start(&self, _sink: mpsc::Sender<Candidate>) {}
        async fn stop(&self) {}
        fn health(&self) -> ChannelHealthRecord {
            self.health.clone()
        }
    }

    #[test]
    fn snapshot_assembles_channel_and_registry_counts() {
        let dir = tempdir().unwrap();
        let emitted = Arc::new(registry::EmittedTokenRegistry::load(dir.path().join("emitted.json"), 500));
        emitted.reserve_for_emission("MINT_X");
        emitted
            .finish_emission("MINT_X", &types::EmissionOutcome::Bought { position_handle: "pos-1".to_string() })
            .unwrap();

        let channels: Vec<Arc<dyn ingress::Ingress>> = vec![Arc::new(FakeIngress { health: record("primary", None) })];
        let watchdog = Watchdog::new(channels, emitted, telemetry::Counters::new(), 2);

        let snapshot = watchdog.snapshot();
        assert_eq!(snapshot.emitted_token_count, 1);
        assert_eq!(snapshot.rate_limit_pool_size, 2);
        assert!(snapshot.channels.contains_key("primary"));
    }
}
