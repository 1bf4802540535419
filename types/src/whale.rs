//! Whale registry entries, the raw and platform-enriched signal types, and
//! the emission/history shapes the registry persists.

use crate::platform::Platform;
use serde::{Deserialize, Serialize};

/// One entry in the whale registry document, keyed externally by wallet
/// address (see `registry::WhaleRegistry`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleEntry {
    pub label: String,
    pub win_rate: Option<f64>,
    pub source: Option<String>,
}

/// The raw signal produced by the Whale Classifier once a `ParsedTx` has
/// passed every filter in the decision procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleBuy {
    pub whale_wallet: String,
    pub token_mint: String,
    pub amount_sol: f64,
    pub signature: String,
    pub block_time: Option<i64>,
    pub age_seconds: Option<i64>,
    pub platform: Platform,
    pub whale_label: String,
}

/// Platform-specific accounts the executor needs. Which fields are
/// populated depends on `platform`; AMM/unknown platforms leave all of
/// these empty and let the executor fall back to an aggregator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformAccounts {
    pub bonding_curve: Option<String>,
    pub pool_state: Option<String>,
    pub vault_base: Option<String>,
    pub vault_quote: Option<String>,
    pub global_config: Option<String>,
}

/// The fully-enriched signal handed to the Emission Boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyIntent {
    #[serde(flatten)]
    pub buy: WhaleBuy,
    pub accounts: PlatformAccounts,
}

/// What the external trade executor hands back from `emit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EmissionOutcome {
    Bought { position_handle: String },
    Failed { reason: String },
}

/// One entry in the append-only purchase history file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub mint: String,
    pub timestamp: i64,
    pub whale_label: String,
    pub amount_sol: f64,
    pub signature: String,
}
