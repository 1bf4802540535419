//! Transaction shapes: the neutral decoded view (`ParsedTx`) and the two
//! wire shapes that feed it (`StreamTxEnvelope` from the binary-stream
//! ingress, `EnrichedTx` from the HTTP webhook ingress).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A token balance entry attributed to one account, as seen after (or
/// before) a transaction executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub owner: String,
    pub mint: String,
    pub ui_amount: f64,
}

/// Neutral, decoded view of a transaction. Produced only by the decoder;
/// every downstream component reads this and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTx {
    pub signature: String,
    pub block_time: Option<i64>,
    pub fee_payer: String,
    pub account_keys: Vec<String>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
    pub succeeded: bool,
    pub invoked_program_ids: HashSet<String>,
}

impl ParsedTx {
    /// `amount_sol` as defined in the data model: gross lamports spent by
    /// the fee payer, including the transaction fee, in SOL.
    pub fn amount_sol(&self) -> f64 {
        let pre = self.pre_balances.first().copied().unwrap_or(0);
        let post = self.post_balances.first().copied().unwrap_or(0);
        pre.saturating_sub(post) as f64 / 1_000_000_000.0
    }

    pub fn age_seconds(&self, now_unix: i64) -> Option<i64> {
        self.block_time.map(|bt| now_unix - bt)
    }
}

/// An unexpanded account-lookup-table reference, as carried on a v0+ message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressLookupTableRef {
    pub account_key: String,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// One instruction as delivered on the wire: indices into `account_keys`
/// (pre- or post-lookup-table expansion, see `message_version`) plus the
/// raw instruction data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// The binary-stream provider envelope described in the external-interface
/// contract: `signature`, `slot`, `meta`, and `transaction`. The decoder's
/// job is to turn this into a `ParsedTx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTxEnvelope {
    pub signature: String,
    pub slot: u64,
    pub meta: StreamTxMeta,
    pub transaction: StreamTxBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTxMeta {
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
    /// Non-empty means the transaction failed.
    pub err: Option<String>,
    /// Addresses resolved from on-chain lookup tables by the provider
    /// itself, in the order the runtime appends them: writable then
    /// readonly. The decoder only concatenates these onto the static
    /// account keys — it never resolves a lookup table itself, which
    /// would require a network round trip.
    #[serde(default)]
    pub loaded_addresses: LoadedAddresses,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadedAddresses {
    pub writable: Vec<String>,
    pub readonly: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTxBody {
    pub message_version: u8,
    pub account_keys: Vec<String>,
    pub recent_blockhash: String,
    pub instructions: Vec<RawInstruction>,
    pub address_table_lookups: Vec<AddressLookupTableRef>,
    pub block_time: Option<i64>,
}

/// A single native SOL transfer, as carried in a webhook-enriched payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransfer {
    pub from_user_account: String,
    pub to_user_account: String,
    pub amount: u64,
}

/// A single token transfer, as carried in a webhook-enriched payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub to_user_account: String,
    pub mint: String,
    pub token_amount: f64,
}

/// The Ingress boundary's sum type: a candidate is either raw stream bytes
/// awaiting decode, or already enriched by the webhook provider. Both
/// variants normalize to `ParsedTx` before the Supervisor's dedup step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelPayload {
    Raw(StreamTxEnvelope),
    Enriched(EnrichedTx),
}

/// One candidate delivered by an Ingress channel into the Supervisor's
/// merged input: `(payload, arrival_timestamp, channel_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub payload: ChannelPayload,
    pub arrival_timestamp: i64,
    pub channel_id: String,
}

/// The HTTP webhook payload shape: one pre-enriched transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTx {
    pub signature: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub fee_payer: String,
    #[serde(default)]
    pub native_transfers: Vec<NativeTransfer>,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
    /// Optional platform hints; free-form, forwarded but not required.
    #[serde(default)]
    pub events: Option<serde_json::Value>,
}
