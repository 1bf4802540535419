//! Pure, synchronous decoding of a streaming-provider transaction envelope
//! into the neutral `ParsedTx` shape every downstream component consumes.
//!
//! Nothing in this crate touches `tokio`, the filesystem, or the network.
//! Given identical input, `decode` must always produce byte-for-byte
//! identical output — no timestamps, no randomness, no environment reads.

use std::collections::HashSet;
use thiserror::Error;
use types::{EnrichedTx, ParsedTx, StreamTxEnvelope, TokenBalance};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Structural violation: mismatched array lengths, unparseable
    /// instruction data. Caller should log at debug and drop.
    #[error("malformed transaction: {0}")]
    MalformedTx(String),
    /// The received token is not interesting (e.g. blacklisted). Caller
    /// drops silently.
    #[error("uninteresting transaction")]
    Uninteresting,
    /// The transaction's error field was set. Caller drops silently.
    #[error("transaction failed on-chain")]
    FailedTx,
}

/// Discriminator bytes (first 8 bytes of instruction data) recognized as a
/// buy/swap instruction for a given launchpad program. This is a small,
/// intentionally incomplete table: anything not listed here falls through
/// to the universal balance-diff method.
fn is_known_buy_discriminator(program_id: &str, data: &[u8]) -> bool {
    if data.len() < 8 {
        return false;
    }
    let discriminator = &data[0..8];
    match program_id {
        types::program_ids::PUMP_FUN => discriminator == [102, 6, 61, 18, 1, 218, 235, 234],
        types::program_ids::LETS_BONK => discriminator == [102, 6, 61, 18, 1, 218, 235, 235],
        types::program_ids::BAGS => discriminator == [102, 6, 61, 18, 1, 218, 235, 236],
        _ => false,
    }
}

/// Expand the transaction's account-key list with any addresses resolved
/// from lookup tables by the provider, in `(static, writable, readonly)`
/// order. This is the address-lookup-table expansion step; it must run
/// before any instruction-index or balance-diff logic below.
fn expand_account_keys(envelope: &StreamTxEnvelope) -> Vec<String> {
    let mut keys = envelope.transaction.account_keys.clone();
    keys.extend(envelope.meta.loaded_addresses.writable.iter().cloned());
    keys.extend(envelope.meta.loaded_addresses.readonly.iter().cloned());
    keys
}

/// Decode a raw streaming-provider envelope into a `ParsedTx`, applying the
/// blacklist short-circuit inline (§4.2: "Blacklist filter inside decoder").
pub fn decode(envelope: &StreamTxEnvelope, stablecoin_blacklist: &HashSet<String>) -> Result<ParsedTx, DecodeError> {
    if envelope.meta.err.is_some() {
        return Err(DecodeError::FailedTx);
    }

    let account_keys = expand_account_keys(envelope);
    if account_keys.is_empty() {
        return Err(DecodeError::MalformedTx("no account keys".to_string()));
    }

    let pre = &envelope.meta.pre_balances;
    let post = &envelope.meta.post_balances;
    if pre.len() != post.len() || pre.len() != account_keys.len() {
        return Err(DecodeError::MalformedTx(
            "pre/post balances misaligned with account keys".to_string(),
        ));
    }

    let fee_payer = account_keys[0].clone();
    let invoked_program_ids = invoked_program_ids(envelope, &account_keys);

    let received_mint = detect_received_mint(envelope, &fee_payer, &account_keys);

    if let Some(mint) = &received_mint {
        if stablecoin_blacklist.contains(mint) {
            return Err(DecodeError::Uninteresting);
        }
    }

    Ok(ParsedTx {
        signature: envelope.signature.clone(),
        block_time: envelope.transaction.block_time,
        fee_payer,
        account_keys,
        pre_balances: pre.clone(),
        post_balances: post.clone(),
        pre_token_balances: envelope.meta.pre_token_balances.clone(),
        post_token_balances: envelope.meta.post_token_balances.clone(),
        log_messages: envelope.meta.log_messages.clone(),
        succeeded: true,
        invoked_program_ids,
    })
}

/// Normalize a webhook-enriched transaction into the same neutral
/// `ParsedTx` shape the binary-stream decoder produces, so the Supervisor
/// can dedup and the Classifier can filter without caring which Ingress
/// variant a candidate arrived on (the sum-type normalization point called
/// for at the Ingress boundary).
///
/// The webhook payload never carries a raw balance ledger or account-key
/// list, only already-resolved transfers, so this reconstructs the two
/// fields `ParsedTx` needs from them: `amount_sol()` is recovered by
/// synthesizing a two-element balance pair whose difference equals the
/// fee payer's total outgoing native transfer, and the received mint is
/// recovered from `token_transfers` addressed to the fee payer. A
/// qualifying token transfer also stands in for the missing log line the
/// buy-detection rule looks for.
pub fn decode_enriched(tx: &EnrichedTx, stablecoin_blacklist: &HashSet<String>) -> Result<ParsedTx, DecodeError> {
    let spent_lamports: u64 = tx
        .native_transfers
        .iter()
        .filter(|t| t.from_user_account == tx.fee_payer)
        .map(|t| t.amount)
        .sum();

    let post_token_balances: Vec<TokenBalance> = tx
        .token_transfers
        .iter()
        .filter(|t| t.to_user_account == tx.fee_payer)
        .map(|t| TokenBalance { owner: tx.fee_payer.clone(), mint: t.mint.clone(), ui_amount: t.token_amount })
        .collect();

    let received_mint = post_token_balances
        .iter()
        .find(|tb| tb.ui_amount > 0.0)
        .map(|tb| tb.mint.clone());

    if let Some(mint) = &received_mint {
        if stablecoin_blacklist.contains(mint) {
            return Err(DecodeError::Uninteresting);
        }
    }

    let log_messages = if post_token_balances.iter().any(|tb| tb.ui_amount > 0.0) {
        vec!["Program log: Instruction: Buy".to_string()]
    } else {
        Vec::new()
    };

    Ok(ParsedTx {
        signature: tx.signature.clone(),
        block_time: Some(tx.timestamp),
        fee_payer: tx.fee_payer.clone(),
        account_keys: vec![tx.fee_payer.clone()],
        pre_balances: vec![spent_lamports],
        post_balances: vec![0],
        pre_token_balances: Vec::new(),
        post_token_balances,
        log_messages,
        succeeded: true,
        invoked_program_ids: HashSet::new(),
    })
}

fn invoked_program_ids(envelope: &StreamTxEnvelope, account_keys: &[String]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for line in &envelope.meta.log_messages {
        if let Some(rest) = line.strip_prefix("Program ") {
            if let Some(id) = rest.strip_suffix(" invoke").or_else(|| {
                rest.split_once(" invoke").map(|(id, _)| id)
            }) {
                ids.insert(id.to_string());
            }
        }
    }
    for instr in &envelope.transaction.instructions {
        if let Some(id) = account_keys.get(instr.program_id_index as usize) {
            ids.insert(id.clone());
        }
    }
    ids
}

/// The position within an instruction's `account_indices` that holds the
/// token mint account, for each launchpad's buy instruction. The buyer is
/// already known as the transaction's fee payer and the amount always
/// comes from the balance-diff invariant (§3), so the mint position is the
/// only thing method 1 needs per program.
fn known_mint_account_position(program_id: &str) -> Option<usize> {
    match program_id {
        types::program_ids::PUMP_FUN => Some(2),
        types::program_ids::LETS_BONK => Some(1),
        types::program_ids::BAGS => Some(3),
        _ => None,
    }
}

/// Method 1 from §4.2: when an instruction's program ID and discriminator
/// match a known launchpad buy, resolve the mint straight off that
/// instruction's known account-index position rather than inferring it
/// from balances.
fn discriminator_received_mint(envelope: &StreamTxEnvelope, account_keys: &[String]) -> Option<String> {
    envelope.transaction.instructions.iter().find_map(|instr| {
        let program_id = account_keys.get(instr.program_id_index as usize)?;
        if !is_known_buy_discriminator(program_id, &instr.data) {
            return None;
        }
        let position = known_mint_account_position(program_id)?;
        let mint_account_index = *instr.account_indices.get(position)?;
        account_keys.get(mint_account_index as usize).cloned()
    })
}

/// Applies the two parsing methods from §4.2 in order: the
/// instruction-discriminator method first, falling back to the universal
/// balance-diff method only when no instruction matched a known launchpad
/// buy discriminator (or its account layout didn't carry enough accounts
/// to resolve a mint).
fn detect_received_mint(envelope: &StreamTxEnvelope, fee_payer: &str, account_keys: &[String]) -> Option<String> {
    discriminator_received_mint(envelope, account_keys).or_else(|| balance_diff_received_mint(envelope, fee_payer))
}

fn balance_diff_received_mint(envelope: &StreamTxEnvelope, fee_payer: &str) -> Option<String> {
    received_mint_from_balances(&envelope.meta.pre_token_balances, &envelope.meta.post_token_balances, fee_payer)
}

/// The same universal balance-diff rule, exposed for callers that only
/// hold a decoded `ParsedTx` and no longer have the original envelope —
/// the classifier uses this to recover the token mint a whale received.
pub fn received_mint(parsed: &ParsedTx) -> Option<String> {
    received_mint_from_balances(&parsed.pre_token_balances, &parsed.post_token_balances, &parsed.fee_payer)
}

fn received_mint_from_balances(pre: &[TokenBalance], post: &[TokenBalance], fee_payer: &str) -> Option<String> {
    let pre_zero_or_absent = |mint: &str| -> bool {
        pre.iter()
            .find(|tb| tb.owner == fee_payer && tb.mint == mint)
            .map(|tb| tb.ui_amount == 0.0)
            .unwrap_or(true)
    };

    post.iter()
        .find(|tb: &&TokenBalance| tb.owner == fee_payer && tb.ui_amount > 0.0 && pre_zero_or_absent(&tb.mint))
        .map(|tb| tb.mint.clone())
}

/// The fixed base fee component (lamports per signature), used only for
/// reporting a net-of-fee figure; the classifier's threshold comparison
/// always uses the gross `amount_sol` on `ParsedTx`, never this.
pub const BASE_FEE_LAMPORTS_PER_SIGNATURE: u64 = 5000;
