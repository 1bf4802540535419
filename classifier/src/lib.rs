//! Whale Classifier (§4.6): the strict-order decision procedure that turns
//! a `ParsedTx` into a raw `WhaleBuy`, or drops it. Every rule below is a
//! pure function of its arguments plus the shared registries — the only
//! side effect anywhere in this crate is the final reservation against the
//! emitted-token set, which must be the last thing that happens.

use registry::{EmittedTokenRegistry, WhaleRegistry};
use std::collections::HashSet;
use types::{ParsedTx, Platform, WhaleBuy};

/// Tunables the caller supplies from configuration; kept separate from the
/// `config` crate so this crate stays decoupled from file I/O.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierThresholds {
    pub min_buy_amount: f64,
    pub time_window_seconds: i64,
}

/// Which rule in the decision procedure dropped the candidate, for the
/// debug log line §4.6 calls for. Never surfaced as an error — a drop is
/// an ordinary outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    TransactionFailed,
    UnknownWallet,
    NotABuy,
    NoQualifyingMint,
    BelowThreshold,
    TooStale,
    AlreadyEmitted,
}

impl DropReason {
    fn as_str(&self) -> &'static str {
        match self {
            DropReason::TransactionFailed => "transaction failed on-chain",
            DropReason::UnknownWallet => "fee payer is not a tracked whale",
            DropReason::NotABuy => "transaction is not a buy",
            DropReason::NoQualifyingMint => "no received mint, or received mint is blacklisted",
            DropReason::BelowThreshold => "amount below minimum buy threshold",
            DropReason::TooStale => "transaction older than the time window",
            DropReason::AlreadyEmitted => "mint already emitted or currently buying",
        }
    }
}

const AMM_PROGRAM_IDS: &[&str] = &[
    types::program_ids::PUMPSWAP,
    types::program_ids::RAYDIUM_AMM,
    types::program_ids::JUPITER,
];

/// A transaction is a "buy" if any log line matches one of the three forms
/// in §4.6. Plain transfers and close-account transactions never match.
fn is_buy(parsed: &ParsedTx) -> bool {
    parsed.log_messages.iter().any(|line| {
        let lower = line.to_lowercase();
        if lower.starts_with("program log:") && lower.contains("instruction: buy") {
            return true;
        }
        if lower.contains("instruction: swap") || lower.contains("ray_log") {
            return true;
        }
        AMM_PROGRAM_IDS
            .iter()
            .any(|id| line.contains(id) && (lower.contains("swap") || lower.contains("buy")))
    })
}

/// Run the full decision procedure against `parsed`. `now_unix` is passed
/// in rather than read from the clock so the procedure stays a pure
/// function of its arguments and can be tested deterministically.
pub fn classify(
    parsed: &ParsedTx,
    whales: &WhaleRegistry,
    blacklist: &HashSet<String>,
    thresholds: ClassifierThresholds,
    now_unix: i64,
    emitted: &EmittedTokenRegistry,
) -> Result<WhaleBuy, DropReason> {
    if !parsed.succeeded {
        return Err(drop(DropReason::TransactionFailed, parsed));
    }

    let whale = whales.get(&parsed.fee_payer).ok_or_else(|| drop(DropReason::UnknownWallet, parsed))?;

    if !is_buy(parsed) {
        return Err(drop(DropReason::NotABuy, parsed));
    }

    let mint = decoder::received_mint(parsed)
        .filter(|mint| !blacklist.contains(mint))
        .ok_or_else(|| drop(DropReason::NoQualifyingMint, parsed))?;

    let amount_sol = parsed.amount_sol();
    if amount_sol < thresholds.min_buy_amount {
        return Err(drop(DropReason::BelowThreshold, parsed));
    }

    let age_seconds = parsed.age_seconds(now_unix);
    if let Some(age) = age_seconds {
        if age > thresholds.time_window_seconds {
            return Err(drop(DropReason::TooStale, parsed));
        }
    }

    if !emitted.reserve_for_emission(&mint) {
        return Err(drop(DropReason::AlreadyEmitted, parsed));
    }

    Ok(WhaleBuy {
        whale_wallet: parsed.fee_payer.clone(),
        token_mint: mint,
        amount_sol,
        signature: parsed.signature.clone(),
        block_time: parsed.block_time,
        age_seconds,
        platform: Platform::Unknown,
        whale_label: whale.label,
    })
}

fn drop(reason: DropReason, parsed: &ParsedTx) -> DropReason {
    tracing::debug!(signature = %parsed.signature, rule = reason.as_str(), "dropping candidate");
    reason
}
