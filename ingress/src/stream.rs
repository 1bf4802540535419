//! Variant A: Binary-Stream Ingress (§4.4) — a long-lived bidirectional
//! stream to a provider, subscribed to transactions mentioning any tracked
//! whale wallet. The wire protocol itself is provider-specific and treated
//! as an external primitive: this module owns only the keepalive and
//! reconnect policy against whatever `StreamSource` it is handed.

use crate::{try_forward, Ingress};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use types::{Candidate, ChannelHealthRecord, ChannelPayload, ChannelState, StreamTxEnvelope};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
const FAST_RECONNECT_DELAY: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum StreamError {
    /// The provider reset the stream; reconnect within 0.5 s, not backoff —
    /// this error class is specifically the fast-reconnect path (§4.4).
    ResetStream,
    /// Any other network failure; reconnect with exponential backoff.
    Network(String),
}

/// One open connection to the provider.
#[async_trait]
pub trait StreamConnection: Send {
    async fn recv(&mut self) -> Result<StreamTxEnvelope, StreamError>;
    /// Answer a keepalive. An error here is treated like any other network
    /// failure and triggers a reconnect.
    async fn ping(&mut self) -> Result<(), StreamError>;
}

/// Opens connections to a specific provider. The actual transport (the
/// real websocket/gRPC client) lives outside this crate; tests substitute
/// a scripted connection.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StreamConnection>, StreamError>;
}

fn backoff_for_attempt(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt.min(5)).unwrap_or(32);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

pub struct BinaryStreamIngress {
    channel_id: String,
    source: Arc<dyn StreamSource>,
    counters: telemetry::Counters,
    health: Mutex<ChannelHealthRecord>,
    cancel: CancellationToken,
    stopped: Notify,
}

impl BinaryStreamIngress {
    pub fn new(channel_id: impl Into<String>, source: Arc<dyn StreamSource>, counters: telemetry::Counters) -> Self {
        let channel_id = channel_id.into();
        Self {
            health: Mutex::new(ChannelHealthRecord::new(channel_id.clone())),
            channel_id,
            source,
            counters,
            cancel: CancellationToken::new(),
            stopped: Notify::new(),
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.health.lock().expect("health lock poisoned").state = state;
    }

    fn record_message(&self) {
        let mut health = self.health.lock().expect("health lock poisoned");
        health.last_message_at = Some(std::time::Instant::now());
        health.state = ChannelState::Active;
    }

    fn record_reconnect(&self, fast: bool) {
        let mut health = self.health.lock().expect("health lock poisoned");
        health.reconnect_count += 1;
        if fast {
            health.fast_close_count += 1;
        }
        health.state = ChannelState::Degraded;
    }
}

#[async_trait]
impl Ingress for BinaryStreamIngress {
    async fn start(&self, sink: mpsc::Sender<Candidate>) {
        let mut attempt: u32 = 0;

        'reconnect: loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.set_state(ChannelState::Connecting);
            let mut conn = match self.source.connect().await {
                Ok(conn) => conn,
                Err(_) => {
                    self.record_reconnect(false);
                    let delay = backoff_for_attempt(attempt);
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue 'reconnect,
                        _ = self.cancel.cancelled() => break 'reconnect,
                    }
                }
            };
            attempt = 0;
            self.set_state(ChannelState::Active);

            let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
            keepalive.tick().await; // first tick fires immediately

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break 'reconnect,
                    _ = keepalive.tick() => {
                        if conn.ping().await.is_err() {
                            self.record_reconnect(false);
                            continue 'reconnect;
                        }
                    }
                    msg = conn.recv() => match msg {
                        Ok(envelope) => {
                            self.record_message();
                            let candidate = Candidate {
                                payload: ChannelPayload::Raw(envelope),
                                arrival_timestamp: unix_now(),
                                channel_id: self.channel_id.clone(),
                            };
                            try_forward(&sink, candidate, &self.counters);
                        }
                        Err(StreamError::ResetStream) => {
                            self.record_reconnect(true);
                            tokio::select! {
                                _ = tokio::time::sleep(FAST_RECONNECT_DELAY) => continue 'reconnect,
                                _ = self.cancel.cancelled() => break 'reconnect,
                            }
                        }
                        Err(StreamError::Network(reason)) => {
                            tracing::warn!(channel = %self.channel_id, reason, "stream network error");
                            self.record_reconnect(false);
                            let delay = backoff_for_attempt(attempt);
                            attempt = attempt.saturating_add(1);
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => continue 'reconnect,
                                _ = self.cancel.cancelled() => break 'reconnect,
                            }
                        }
                    }
                }
            }
        }

        self.set_state(ChannelState::Disabled);
        self.stopped.notify_one();
    }

    async fn stop(&self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(15), self.stopped.notified()).await;
    }

    fn health(&self) -> ChannelHealthRecord {
        self.health.lock().expect("health lock poisoned").clone()
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
