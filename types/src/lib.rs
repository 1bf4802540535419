//! Shared data model for the whale-copy signal pipeline.
//!
//! Every type that crosses a component boundary — endpoint pool, decoder,
//! dedup, ingress, classifier, platform resolver, registry, emission — lives
//! here so no two crates invent their own shape for the same concept.

pub mod endpoint;
pub mod health;
pub mod platform;
pub mod tx;
pub mod whale;

pub use endpoint::{EndpointKind, ProviderEndpoint};
pub use health::{ChannelHealthRecord, ChannelHealthSummary, ChannelState, HealthSnapshot, HealthSnapshotProvider};
pub use platform::{platform_for_program_id, program_ids, resolve_platform, Platform};
pub use tx::{
    AddressLookupTableRef, Candidate, ChannelPayload, EnrichedTx, LoadedAddresses, NativeTransfer, ParsedTx, RawInstruction,
    StreamTxBody, StreamTxEnvelope, StreamTxMeta, TokenBalance, TokenTransfer,
};
pub use whale::{BuyIntent, EmissionOutcome, PurchaseRecord, WhaleBuy, WhaleEntry};
