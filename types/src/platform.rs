//! The enumerated platform tags the platform resolver assigns.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    PumpFun,
    LetsBonk,
    Bags,
    Pumpswap,
    RaydiumAmm,
    Jupiter,
    Unknown,
}

impl Platform {
    /// Launchpads carry richer structure than AMMs and typically represent
    /// first-buys; the resolver prefers them on a multi-match.
    pub fn is_launchpad(&self) -> bool {
        matches!(self, Platform::PumpFun | Platform::LetsBonk | Platform::Bags)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::PumpFun => "pump_fun",
            Platform::LetsBonk => "lets_bonk",
            Platform::Bags => "bags",
            Platform::Pumpswap => "pumpswap",
            Platform::RaydiumAmm => "raydium_amm",
            Platform::Jupiter => "jupiter",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical program IDs the decoder's instruction-discriminator method
/// and the platform resolver's program-ID scan both key off of. Kept in
/// one place so the two components can never drift apart on which ID
/// means which platform.
pub mod program_ids {
    pub const PUMP_FUN: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";
    pub const LETS_BONK: &str = "LanMV9sAd7wArD4vJFi2qDdfnVhFxYSUg6eADduJ3uj";
    pub const BAGS: &str = "dbcij3LWUppWqq96dh6gJWwBifmcGfLSB5D4DuSMaqN";
    pub const PUMPSWAP: &str = "PSwapMdSai8tjrEXcxFeQth87xC4rRsa4VA5mhGhXkP";
    pub const RAYDIUM_AMM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
    pub const JUPITER: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
}

/// Map a single program ID to its platform tag, or `None` if unrecognized.
pub fn platform_for_program_id(program_id: &str) -> Option<Platform> {
    match program_id {
        program_ids::PUMP_FUN => Some(Platform::PumpFun),
        program_ids::LETS_BONK => Some(Platform::LetsBonk),
        program_ids::BAGS => Some(Platform::Bags),
        program_ids::PUMPSWAP => Some(Platform::Pumpswap),
        program_ids::RAYDIUM_AMM => Some(Platform::RaydiumAmm),
        program_ids::JUPITER => Some(Platform::Jupiter),
        _ => None,
    }
}

/// Resolve a platform tag from a set of invoked program IDs, preferring
/// launchpads over AMMs on a multi-match (see `platform_resolver`).
pub fn resolve_platform<'a>(invoked_program_ids: impl IntoIterator<Item = &'a String>) -> Platform {
    let mut best: Option<Platform> = None;
    for id in invoked_program_ids {
        if let Some(platform) = platform_for_program_id(id) {
            best = Some(match best {
                Some(current) if current.is_launchpad() => current,
                _ => platform,
            });
        }
    }
    best.unwrap_or(Platform::Unknown)
}
