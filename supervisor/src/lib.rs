//! Channel Supervisor (§4.5): fans every Ingress channel into one bounded
//! queue, applies the full decode → dedup → classify → resolve → emit
//! pipeline per candidate, and owns no transaction state of its own — a
//! candidate that survives every stage is gone (emitted or dropped) by the
//! time `handle` returns.

use classifier::ClassifierThresholds;
use emission::{EmissionBoundary, TradeExecutor};
use platform_resolver::AddressDeriver;
use registry::{EmittedTokenRegistry, WhaleRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use types::{Candidate, ChannelPayload, EmissionOutcome};

/// How long the Supervisor keeps draining its input queue after a
/// shutdown signal before giving up (§5).
const DRAIN_BOUND: Duration = Duration::from_secs(5);

pub struct Supervisor<E: TradeExecutor> {
    dedup: dedup::SignalDedup,
    blacklist: HashSet<String>,
    whales: Arc<WhaleRegistry>,
    emitted: Arc<EmittedTokenRegistry>,
    thresholds: ClassifierThresholds,
    deriver: Arc<dyn AddressDeriver>,
    target_platform: Option<String>,
    emission: Arc<EmissionBoundary<E>>,
    counters: telemetry::Counters,
}

impl<E: TradeExecutor> Supervisor<E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dedup_capacity: usize,
        blacklist: HashSet<String>,
        whales: Arc<WhaleRegistry>,
        emitted: Arc<EmittedTokenRegistry>,
        thresholds: ClassifierThresholds,
        deriver: Arc<dyn AddressDeriver>,
        target_platform: Option<String>,
        emission: Arc<EmissionBoundary<E>>,
        counters: telemetry::Counters,
    ) -> Self {
        Self {
            dedup: dedup::SignalDedup::new(dedup_capacity),
            blacklist,
            whales,
            emitted,
            thresholds,
            deriver,
            target_platform,
            emission,
            counters,
        }
    }

    /// Consume `input` until `cancel` fires, then drain whatever remains
    /// (bounded to `DRAIN_BOUND`) before returning.
    pub async fn run(&self, mut input: mpsc::Receiver<Candidate>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                candidate = input.recv() => match candidate {
                    Some(candidate) => self.handle(candidate).await,
                    None => return,
                },
            }
        }

        let _ = tokio::time::timeout(DRAIN_BOUND, self.drain(&mut input)).await;
    }

    async fn drain(&self, input: &mut mpsc::Receiver<Candidate>) {
        while let Some(candidate) = input.recv().await {
            self.handle(candidate).await;
        }
    }

    /// One pass of the algorithm in §4.5: decode (if raw), dedup, classify,
    /// resolve, emit. Any failure at any stage drops the candidate; nothing
    /// here ever propagates an error past this function.
    async fn handle(&self, candidate: Candidate) {
        let parsed = match &candidate.payload {
            ChannelPayload::Raw(envelope) => decoder::decode(envelope, &self.blacklist),
            ChannelPayload::Enriched(tx) => decoder::decode_enriched(tx, &self.blacklist),
        };
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(channel = %candidate.channel_id, error = %err, "dropping candidate at decode");
                return;
            }
        };

        if let Some(mint) = decoder::received_mint(&parsed) {
            if !self.dedup.try_reserve(&parsed.signature, &mint) {
                tracing::debug!(signature = %parsed.signature, "dropping duplicate signal");
                return;
            }
        }

        let buy = match classifier::classify(&parsed, &self.whales, &self.blacklist, self.thresholds, unix_now(), &self.emitted) {
            Ok(buy) => buy,
            Err(_reason) => return,
        };

        let intent = match platform_resolver::resolve(buy, &parsed, self.deriver.as_ref(), self.target_platform.as_deref()) {
            Some(intent) => intent,
            None => return,
        };

        self.counters.incr(telemetry::names::RESERVATIONS);
        match self.emission.emit(intent).await {
            EmissionOutcome::Bought { .. } => self.counters.incr(telemetry::names::EMISSIONS),
            EmissionOutcome::Failed { .. } => self.counters.incr(telemetry::names::EMISSION_FAILURES),
        }
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
