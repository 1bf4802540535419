//! Emission Boundary: the single typed handoff to the external trade
//! executor, described in §4.10. The executor itself is out of scope
//! (§1) — this crate specifies only the `TradeExecutor` contract it must
//! satisfy and the bookkeeping that follows its response.

use async_trait::async_trait;
use registry::{EmittedTokenRegistry, PurchaseHistory};
use std::sync::Arc;
use types::{BuyIntent, EmissionOutcome, PurchaseRecord};

/// The external trade executor's contract. Implementers sign and submit
/// the actual transaction; the core never introspects `position_handle`.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute(&self, intent: &BuyIntent) -> EmissionOutcome;
}

/// Wires a `TradeExecutor` to the registry: on `Bought`, the mint is added
/// to the persistent emitted-token set and an append-only history entry is
/// written; on `Failed`, the mint is simply released (§4.10's critical
/// invariant — future signals for the same mint remain eligible).
pub struct EmissionBoundary<E: TradeExecutor> {
    executor: E,
    emitted: Arc<EmittedTokenRegistry>,
    history: Arc<PurchaseHistory>,
}

impl<E: TradeExecutor> EmissionBoundary<E> {
    pub fn new(executor: E, emitted: Arc<EmittedTokenRegistry>, history: Arc<PurchaseHistory>) -> Self {
        Self { executor, emitted, history }
    }

    /// `emit(buy_intent) -> EmissionOutcome`. The caller must have already
    /// reserved `intent.buy.token_mint` via `EmittedTokenRegistry::reserve_for_emission`
    /// (the Whale Classifier does this as the last step of its decision
    /// procedure); this method only finalizes that reservation.
    pub async fn emit(&self, intent: BuyIntent) -> EmissionOutcome {
        let outcome = self.executor.execute(&intent).await;

        if let Err(err) = self.emitted.finish_emission(&intent.buy.token_mint, &outcome) {
            tracing::error!(mint = %intent.buy.token_mint, error = %err, "failed to persist emission outcome");
        }

        if let EmissionOutcome::Bought { .. } = &outcome {
            let record = PurchaseRecord {
                mint: intent.buy.token_mint.clone(),
                timestamp: intent.buy.block_time.unwrap_or_default(),
                whale_label: intent.buy.whale_label.clone(),
                amount_sol: intent.buy.amount_sol,
                signature: intent.buy.signature.clone(),
            };
            if let Err(err) = self.history.append(record) {
                tracing::error!(error = %err, "failed to append purchase history");
            }
        }

        outcome
    }
}
