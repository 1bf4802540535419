//! The whale-copy signal pipeline (§2): wires the Rate-Limited Endpoint
//! Pool, the two ingress variants, the Channel Supervisor, the Watchdog,
//! and the Shared-State Registry into one runnable unit.
//!
//! The trade executor, the PDA-derivation capability, and the two
//! Binary-Stream providers are external collaborators (§1) and are
//! supplied by the embedder at [`Pipeline::build`] time; nothing in this
//! crate constructs them.

use anyhow::Context;
use endpoint_pool::EndpointPool;
use ingress::stream::{BinaryStreamIngress, StreamSource};
use ingress::webhook::WebhookIngress;
use ingress::Ingress;
use platform_resolver::AddressDeriver;
use registry::{EmittedTokenRegistry, PurchaseHistory, WhaleRegistry};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use supervisor::Supervisor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use types::{Candidate, HealthSnapshot, HealthSnapshotProvider, ProviderEndpoint};
use watchdog::Watchdog;

/// Capacity of the Supervisor's input queue (§5's "bounded, capacity 1024").
const SUPERVISOR_QUEUE_CAPACITY: usize = 1024;

/// Binds a `WebhookIngress` to the pipeline's health snapshot before the
/// snapshot's only implementation (the Watchdog) exists yet: the Watchdog
/// needs the webhook channel in its channel list to report on it, and the
/// webhook needs the Watchdog to answer `/health` — so the provider is
/// handed to the webhook as this empty cell and bound once the Watchdog is
/// built.
struct DeferredHealthProvider {
    inner: OnceLock<Arc<dyn HealthSnapshotProvider>>,
}

impl DeferredHealthProvider {
    fn new() -> Self {
        Self { inner: OnceLock::new() }
    }

    fn bind(&self, provider: Arc<dyn HealthSnapshotProvider>) {
        let _ = self.inner.set(provider);
    }
}

impl HealthSnapshotProvider for DeferredHealthProvider {
    fn snapshot(&self) -> HealthSnapshot {
        match self.inner.get() {
            Some(provider) => provider.snapshot(),
            None => HealthSnapshot {
                channels: HashMap::new(),
                reservation_count: 0,
                rate_limit_pool_size: 0,
                emitted_token_count: 0,
            },
        }
    }
}

/// The assembled pipeline. Built once via [`Pipeline::build`], run once via
/// [`Pipeline::run`].
pub struct Pipeline<E: emission::TradeExecutor> {
    ingress: Vec<Arc<dyn Ingress>>,
    supervisor: Arc<Supervisor<E>>,
    watchdog: Arc<Watchdog>,
    endpoint_pool: Arc<EndpointPool>,
    input_tx: mpsc::Sender<Candidate>,
    input_rx: Mutex<Option<mpsc::Receiver<Candidate>>>,
}

impl<E: emission::TradeExecutor + 'static> Pipeline<E> {
    /// Assemble every component from `config` plus the collaborators the
    /// spec places out of scope (§1): the two independent Binary-Stream
    /// providers (§4.4 "runs two parallel instances"), the PDA-derivation
    /// capability, and the trade executor itself. `state_dir` holds the
    /// persisted `emitted_tokens.json` and `purchased_history.json` (§4.9).
    pub fn build(
        config: &config::Config,
        primary_sources: [Arc<dyn StreamSource>; 2],
        deriver: Arc<dyn AddressDeriver>,
        executor: E,
        state_dir: &Path,
    ) -> anyhow::Result<Self> {
        let whales = Arc::new(
            WhaleRegistry::load(config.whale_copy.wallets_file.clone())
                .context("failed to load whale registry")?,
        );
        let emitted = Arc::new(EmittedTokenRegistry::load(
            state_dir.join("emitted_tokens.json"),
            config.dedup.emitted_token_capacity,
        ));
        let history = Arc::new(PurchaseHistory::load(state_dir.join("purchased_history.json")));
        let counters = telemetry::Counters::new();

        let endpoints: Vec<ProviderEndpoint> = config
            .rpc
            .providers
            .iter()
            .map(|p| ProviderEndpoint::new(p.url.clone(), p.kind, p.weight, p.rate_limit, p.priority))
            .collect();
        let endpoint_pool = Arc::new(EndpointPool::new(endpoints));

        let emission = Arc::new(emission::EmissionBoundary::new(executor, emitted.clone(), history));

        let thresholds = classifier::ClassifierThresholds {
            min_buy_amount: config.whale_copy.min_buy_amount,
            time_window_seconds: (config.whale_copy.time_window_minutes * 60) as i64,
        };

        let supervisor = Arc::new(Supervisor::new(
            config.dedup.signature_capacity,
            config.stablecoin_blacklist(),
            whales,
            emitted.clone(),
            thresholds,
            deriver,
            config.effective_target_platform().map(|s| s.to_string()),
            emission,
            counters.clone(),
        ));

        let [source_a, source_b] = primary_sources;
        let primary_a: Arc<dyn Ingress> = Arc::new(BinaryStreamIngress::new("primary-a", source_a, counters.clone()));
        let primary_b: Arc<dyn Ingress> = Arc::new(BinaryStreamIngress::new("primary-b", source_b, counters.clone()));

        let deferred_health = Arc::new(DeferredHealthProvider::new());
        let webhook: Arc<dyn Ingress> = Arc::new(WebhookIngress::new(
            config.webhook.port,
            "webhook",
            counters.clone(),
            deferred_health.clone(),
        ));

        let ingress: Vec<Arc<dyn Ingress>> = vec![primary_a, primary_b, webhook];

        let watchdog = Arc::new(Watchdog::new(ingress.clone(), emitted, counters, endpoint_pool.size()));
        deferred_health.bind(watchdog.clone());

        let (input_tx, input_rx) = mpsc::channel(SUPERVISOR_QUEUE_CAPACITY);

        Ok(Self {
            ingress,
            supervisor,
            watchdog,
            endpoint_pool,
            input_tx,
            input_rx: Mutex::new(Some(input_rx)),
        })
    }

    /// The rate-limited endpoint pool backing any outbound RPC an embedder's
    /// `StreamSource`/`TradeExecutor` implementation needs to make (§4.1 is
    /// "the only shared external-IO gatekeeper").
    pub fn endpoint_pool(&self) -> &Arc<EndpointPool> {
        &self.endpoint_pool
    }

    /// Run every ingress channel, the Supervisor, and the Watchdog until
    /// `cancel` fires, then stop each ingress channel and drain the
    /// Supervisor's queue (§5: "cooperatively respond ... within 15
    /// seconds"). Must be called at most once per `Pipeline`.
    pub async fn run(&self, cancel: CancellationToken) {
        let input_rx = self
            .input_rx
            .lock()
            .expect("pipeline input receiver mutex poisoned")
            .take()
            .expect("Pipeline::run called more than once");

        let mut ingress_handles = Vec::with_capacity(self.ingress.len());
        for channel in &self.ingress {
            let channel = channel.clone();
            let tx = self.input_tx.clone();
            ingress_handles.push(tokio::spawn(async move { channel.start(tx).await }));
        }

        let supervisor = self.supervisor.clone();
        let supervisor_cancel = cancel.clone();
        let supervisor_handle = tokio::spawn(async move { supervisor.run(input_rx, supervisor_cancel).await });

        let watchdog = self.watchdog.clone();
        let watchdog_cancel = cancel.clone();
        let watchdog_handle = tokio::spawn(async move { watchdog.run(watchdog_cancel).await });

        cancel.cancelled().await;
        tracing::info!("shutdown signal received, stopping ingress channels");

        for channel in &self.ingress {
            channel.stop().await;
        }
        for handle in ingress_handles {
            let _ = handle.await;
        }
        let _ = supervisor_handle.await;
        let _ = watchdog_handle.await;
        tracing::info!("pipeline shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingress::stream::{StreamConnection, StreamError};
    use platform_resolver::NoopAddressDeriver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;
    use types::{BuyIntent, EmissionOutcome};

    struct NeverConnects;

    #[async_trait]
    impl StreamSource for NeverConnects {
        async fn connect(&self) -> Result<Box<dyn StreamConnection>, StreamError> {
            Err(StreamError::Network("no transport configured in test".to_string()))
        }
    }

    struct NoopExecutor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl emission::TradeExecutor for NoopExecutor {
        async fn execute(&self, intent: &BuyIntent) -> EmissionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            EmissionOutcome::Bought { position_handle: format!("pos-{}", intent.buy.token_mint) }
        }
    }

    fn write_whales(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("whales.json");
        std::fs::write(&path, r#"{"WALLET_A": {"label": "alpha", "win_rate": 0.7, "source": "manual"}}"#).unwrap();
        path
    }

    fn test_config(dir: &std::path::Path) -> config::Config {
        let mut cfg = config::Config::default();
        cfg.whale_copy.wallets_file = write_whales(dir);
        cfg.webhook.port = 0;
        cfg
    }

    #[tokio::test]
    async fn build_wires_two_stream_channels_and_one_webhook_channel() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let sources: [Arc<dyn StreamSource>; 2] = [Arc::new(NeverConnects), Arc::new(NeverConnects)];
        let executor = NoopExecutor { calls: AtomicUsize::new(0) };

        let pipeline = Pipeline::build(&config, sources, Arc::new(NoopAddressDeriver), executor, dir.path()).unwrap();

        assert_eq!(pipeline.ingress.len(), 3);
    }

    #[tokio::test]
    async fn run_stops_every_channel_within_the_shutdown_bound() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let sources: [Arc<dyn StreamSource>; 2] = [Arc::new(NeverConnects), Arc::new(NeverConnects)];
        let executor = NoopExecutor { calls: AtomicUsize::new(0) };

        let pipeline = Pipeline::build(&config, sources, Arc::new(NoopAddressDeriver), executor, dir.path()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), pipeline.run(cancel)).await;
        assert!(result.is_ok(), "pipeline did not shut down within the bound");
    }
}
