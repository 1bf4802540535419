//! End-to-end scenario tests for the whale-copy signal pipeline (§8).
//!
//! The real trade executor, chain client, and Binary-Stream providers are
//! external collaborators (§1) that the core only consumes through typed
//! traits. This crate supplies in-memory fakes for those traits so the six
//! concrete scenarios in `spec.md` §8 can run without a real chain or a
//! real executor.

use async_trait::async_trait;
use classifier::ClassifierThresholds;
use emission::{EmissionBoundary, TradeExecutor};
use platform_resolver::NoopAddressDeriver;
use registry::{EmittedTokenRegistry, PurchaseHistory, WhaleRegistry};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use supervisor::Supervisor;
use types::{
    BuyIntent, Candidate, ChannelPayload, EmissionOutcome, LoadedAddresses, RawInstruction, StreamTxBody, StreamTxEnvelope,
    StreamTxMeta, TokenBalance,
};

pub const WHALE_WALLET: &str = "WALLET_A";
pub const WHALE_LABEL: &str = "alpha";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// A `TradeExecutor` that always reports `Bought` and records every intent
/// it was handed into shared state a test keeps a handle to, since
/// `Supervisor`/`EmissionBoundary` take ownership of the executor itself.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    intents: Arc<Mutex<Vec<BuyIntent>>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TradeExecutor for RecordingExecutor {
    async fn execute(&self, intent: &BuyIntent) -> EmissionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.intents.lock().expect("recording executor lock poisoned").push(intent.clone());
        EmissionOutcome::Bought { position_handle: format!("pos-{}", intent.buy.token_mint) }
    }
}

impl RecordingExecutor {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn intents(&self) -> Vec<BuyIntent> {
        self.intents.lock().expect("recording executor lock poisoned").clone()
    }
}

/// Writes a whale registry document containing exactly `WHALE_WALLET`, and
/// returns the loaded `WhaleRegistry`.
pub fn whale_registry(dir: &std::path::Path) -> Arc<WhaleRegistry> {
    whale_registry_multi(dir, &[(WHALE_WALLET, WHALE_LABEL)])
}

/// Writes a whale registry document containing every `(wallet, label)`
/// pair given, for scenarios that need more than one tracked whale (§8
/// scenario 6: a second whale buying the same already-emitted mint).
pub fn whale_registry_multi(dir: &std::path::Path, wallets: &[(&str, &str)]) -> Arc<WhaleRegistry> {
    let path = dir.join("whales.json");
    let entries: Vec<String> = wallets
        .iter()
        .map(|(wallet, label)| format!(r#""{wallet}": {{"label": "{label}", "win_rate": 0.7, "source": "manual"}}"#))
        .collect();
    std::fs::write(&path, format!("{{{}}}", entries.join(","))).unwrap();
    Arc::new(WhaleRegistry::load(path).unwrap())
}

/// Assembles a `Supervisor` wired exactly as `pipeline::Pipeline::build`
/// would, but without any network-facing ingress or endpoint pool, so a
/// test can push `Candidate`s straight into `handle`/`run`. Returns the
/// supervisor plus handles onto the registries a test needs to assert
/// against or to reconstruct across a simulated restart.
pub fn build_supervisor(
    dir: &std::path::Path,
    whales: Arc<WhaleRegistry>,
    executor: RecordingExecutor,
    emitted_capacity: usize,
) -> (Supervisor<RecordingExecutor>, Arc<EmittedTokenRegistry>) {
    let emitted = Arc::new(EmittedTokenRegistry::load(dir.join("emitted_tokens.json"), emitted_capacity));
    let history = Arc::new(PurchaseHistory::load(dir.join("purchased_history.json")));
    let emission = Arc::new(EmissionBoundary::new(executor, emitted.clone(), history));

    let supervisor = Supervisor::new(
        5000,
        HashSet::from([USDC_MINT.to_string()]),
        whales.clone(),
        emitted.clone(),
        ClassifierThresholds { min_buy_amount: 0.4, time_window_seconds: 300 },
        Arc::new(NoopAddressDeriver),
        None,
        emission,
        telemetry::Counters::new(),
    );
    (supervisor, emitted)
}

/// Builds a qualifying pump.fun buy envelope for `WHALE_WALLET` receiving
/// `amount_sol` worth of `mint`, dated `block_time` seconds since the
/// epoch, under `signature`. Mirrors scenario 1 in §8.
pub fn whale_buy_envelope(signature: &str, mint: &str, amount_sol: f64, block_time: Option<i64>) -> StreamTxEnvelope {
    let lamports_spent = (amount_sol * 1_000_000_000.0).round() as u64;
    StreamTxEnvelope {
        signature: signature.to_string(),
        slot: 1,
        meta: StreamTxMeta {
            pre_balances: vec![10_000_000_000, 0],
            post_balances: vec![10_000_000_000 - lamports_spent, 0],
            pre_token_balances: vec![],
            post_token_balances: vec![TokenBalance { owner: WHALE_WALLET.to_string(), mint: mint.to_string(), ui_amount: 100.0 }],
            log_messages: vec![
                "Program 6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P invoke [1]".to_string(),
                "Program log: Instruction: Buy".to_string(),
            ],
            err: None,
            loaded_addresses: LoadedAddresses::default(),
        },
        transaction: StreamTxBody {
            message_version: 0,
            account_keys: vec![WHALE_WALLET.to_string(), "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P".to_string()],
            recent_blockhash: "abc".to_string(),
            instructions: vec![RawInstruction {
                program_id_index: 1,
                account_indices: vec![0],
                data: vec![102, 6, 61, 18, 1, 218, 235, 234],
            }],
            address_table_lookups: vec![],
            block_time,
        },
    }
}

pub fn candidate(envelope: StreamTxEnvelope, channel_id: &str) -> Candidate {
    Candidate { payload: ChannelPayload::Raw(envelope), arrival_timestamp: 0, channel_id: channel_id.to_string() }
}
