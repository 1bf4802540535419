//! Platform Resolver (§4.7): tags the detected platform on a passed
//! `WhaleBuy` and derives the platform-specific accounts the executor
//! needs, producing a ready-to-emit `BuyIntent`.
//!
//! Deriving the actual program-derived addresses is blockchain-protocol
//! work the core treats as an external primitive (§1: "PDA derivation...
//! assumed as primitives available through an abstract `ChainClient`
//! capability") — this crate only decides *which* derivation to invoke,
//! via the `AddressDeriver` trait, and never computes a PDA itself.

use types::{BuyIntent, ParsedTx, Platform, PlatformAccounts, WhaleBuy};

/// The abstract capability that knows how to derive program-derived
/// accounts for a platform. Implementations live outside the core (they
/// depend on the real chain-math primitives); tests use a stub.
pub trait AddressDeriver: Send + Sync {
    fn derive(&self, platform: Platform, token_mint: &str, creator: Option<&str>) -> PlatformAccounts;
}

/// A deriver that always returns empty accounts — correct for `unknown`
/// and AMM platforms per §4.7, and usable as a null object in tests or in
/// configurations that only ever trade through the Jupiter fallback.
pub struct NoopAddressDeriver;

impl AddressDeriver for NoopAddressDeriver {
    fn derive(&self, _platform: Platform, _token_mint: &str, _creator: Option<&str>) -> PlatformAccounts {
        PlatformAccounts::default()
    }
}

/// Resolve the platform for `parsed` and combine it with `buy` (which
/// carries a placeholder `platform` from the classifier) to produce a
/// `BuyIntent`. Returns `None` if `target_platform` is set and does not
/// match — the whole-pipeline config key `whale_copy.target_platform`.
pub fn resolve(mut buy: WhaleBuy, parsed: &ParsedTx, deriver: &dyn AddressDeriver, target_platform: Option<&str>) -> Option<BuyIntent> {
    let platform = types::resolve_platform(parsed.invoked_program_ids.iter());

    if let Some(target) = target_platform {
        if platform.as_str() != target {
            return None;
        }
    }

    buy.platform = platform;
    let accounts = match platform {
        Platform::Unknown | Platform::Pumpswap | Platform::RaydiumAmm | Platform::Jupiter => PlatformAccounts::default(),
        launchpad => deriver.derive(launchpad, &buy.token_mint, None),
    };

    Some(BuyIntent { buy, accounts })
}
