// config/src/lib.rs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::EndpointKind;

/// Mints that are hard-coded into the blacklist and can never be removed by
/// user configuration. `stablecoin_filter` may only add to this set.
pub const BUILT_IN_STABLECOINS: &[&str] = &[
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", // USDC
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", // USDT
    "So11111111111111111111111111111111111111112", // wrapped SOL
    "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",   // mSOL
    "7dHbWXmci3dT8UFYWYZweBLXgycu7Y3iL6trKn1Y7ARj", // stSOL
    "J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn", // jitoSOL
    "bSo13r4TkiE4KumL71LsHTPpL2euBYLFx6h9HP3piy1",   // bSOL
    "USD1ttGY1N17NEEHLmELoaybftRBUSErhqYiQzvEmuB",  // USD1
    "USDH1SM1ojwWUga67PGrgFWUHibbjqMvuMaDkRJTgkX",  // USDH
];

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config file not found at: {0}")]
    NotFound(PathBuf),
    /// `stablecoin_filter` carried a `-<mint>` entry attempting to remove a
    /// built-in stablecoin from the blacklist. Built-ins can only be added
    /// to, never subtracted.
    #[error("stablecoin_filter attempts to remove built-in stablecoin: {0}")]
    BuiltInStablecoinRemoval(String),
}

/// Whale-copy master settings (the `whale_copy.*` keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleCopyConfig {
    pub enabled: bool,
    pub wallets_file: PathBuf,
    pub min_buy_amount: f64,
    pub time_window_minutes: u64,
    pub target_platform: Option<String>,
}

impl Default for WhaleCopyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wallets_file: PathBuf::from("whales.json"),
            min_buy_amount: 0.4,
            time_window_minutes: 5,
            target_platform: None,
        }
    }
}

/// One entry of `rpc.providers[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub url: String,
    pub kind: EndpointKind,
    pub weight: i64,
    pub rate_limit: f64,
    pub priority: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcConfig {
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { port: 8787 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    pub signature_capacity: usize,
    pub emitted_token_capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            signature_capacity: 5000,
            emitted_token_capacity: 500,
        }
    }
}

/// Logging configuration; `level` is forwarded to `logging::init` as a
/// fallback `RUST_LOG` directive when the environment variable is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// The complete, validated set of configuration keys the core recognizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub whale_copy: WhaleCopyConfig,
    #[serde(default)]
    pub stablecoin_filter: Vec<String>,
    #[serde(default)]
    pub whale_all_platforms: bool,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whale_copy: WhaleCopyConfig::default(),
            stablecoin_filter: Vec::new(),
            whale_all_platforms: false,
            rpc: RpcConfig::default(),
            webhook: WebhookConfig::default(),
            dedup: DedupConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`, rejecting a config
    /// that attempts to remove a built-in stablecoin (see `validate`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a `stablecoin_filter` entry of the form `-<mint>` naming a
    /// built-in stablecoin: that's an attempted removal, and the built-in
    /// blacklist can never be removed from, only added to.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in &self.stablecoin_filter {
            if let Some(mint) = entry.strip_prefix('-') {
                if BUILT_IN_STABLECOINS.contains(&mint) {
                    return Err(ConfigError::BuiltInStablecoinRemoval(mint.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Save this configuration as a pretty-printed TOML file at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Returns the default config file path: `{config_dir()}/whale-copy/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("whale-copy");
        Ok(config_dir.join("config.toml"))
    }

    /// Built-in blacklist mints plus whatever the user added. The built-ins
    /// are always present; `stablecoin_filter` can only grow this set.
    pub fn stablecoin_blacklist(&self) -> HashSet<String> {
        let mut set: HashSet<String> = BUILT_IN_STABLECOINS.iter().map(|s| s.to_string()).collect();
        set.extend(self.stablecoin_filter.iter().filter(|entry| !entry.starts_with('-')).cloned());
        set
    }

    /// The effective platform restriction: `None` means "all platforms",
    /// honoring `whale_all_platforms` overriding `target_platform`.
    pub fn effective_target_platform(&self) -> Option<&str> {
        if self.whale_all_platforms {
            None
        } else {
            self.whale_copy.target_platform.as_deref()
        }
    }
}
