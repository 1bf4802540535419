//! Ingress channels (§4.4): long-lived sources of candidate transactions,
//! all implementing the same `Ingress` contract so the Supervisor can fan
//! them into one merged input without caring which variant produced a
//! given candidate.

pub mod stream;
pub mod webhook;

use async_trait::async_trait;
use tokio::sync::mpsc;
use types::{Candidate, ChannelHealthRecord};

/// Non-blocking delivery into the Supervisor's merged input. `try_send`
/// either succeeds or the candidate is dropped and a counter incremented —
/// the read loop must never block on a full sink (§4.4).
pub fn try_forward(sink: &mpsc::Sender<Candidate>, candidate: Candidate, counters: &telemetry::Counters) {
    if sink.try_send(candidate).is_err() {
        counters.incr(telemetry::names::DROPPED_FRAMES);
        tracing::warn!("supervisor input full, dropping candidate");
    }
}

#[async_trait]
pub trait Ingress: Send + Sync {
    /// Begin streaming candidates into `sink`. Returns once the channel has
    /// been asked to stop (or fails outright at startup).
    async fn start(&self, sink: mpsc::Sender<Candidate>);

    /// Terminate and clean up. Must return within 15 s (§4.4, §5).
    async fn stop(&self);

    fn health(&self) -> ChannelHealthRecord;
}
