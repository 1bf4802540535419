//! The tracked-whale map: `wallet_address -> {label, win_rate, source}`.
//! Loaded at startup from a JSON document, read-only in steady state,
//! mutated only by an explicit `reload`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;
use types::WhaleEntry;

#[derive(Debug, Error)]
pub enum WhaleRegistryError {
    #[error("failed to read whale registry file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse whale registry file: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct WhaleRegistry {
    path: PathBuf,
    wallets: RwLock<HashMap<String, WhaleEntry>>,
}

impl WhaleRegistry {
    /// Load the registry document at `path`. Unlike the emitted-token set,
    /// this is required startup configuration: a missing or corrupt
    /// document is a fatal config error (exit code 1), not something the
    /// pipeline degrades gracefully from.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, WhaleRegistryError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        let wallets: HashMap<String, WhaleEntry> = serde_json::from_str(&contents)?;
        Ok(Self {
            path,
            wallets: RwLock::new(wallets),
        })
    }

    /// Re-read the registry document from disk, replacing the in-memory
    /// map. Explicit admin operation; never called from the hot path.
    pub fn reload(&self) -> Result<(), WhaleRegistryError> {
        let contents = std::fs::read_to_string(&self.path)?;
        let wallets: HashMap<String, WhaleEntry> = serde_json::from_str(&contents)?;
        *self.wallets.write().expect("whale registry lock poisoned") = wallets;
        Ok(())
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.wallets.read().expect("whale registry lock poisoned").contains_key(wallet)
    }

    pub fn get(&self, wallet: &str) -> Option<WhaleEntry> {
        self.wallets.read().expect("whale registry lock poisoned").get(wallet).cloned()
    }

    pub fn len(&self) -> usize {
        self.wallets.read().expect("whale registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write(contents: &str) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(&file, contents).unwrap();
        file
    }

    #[test]
    fn load_parses_wallet_map() {
        let file = write(r#"{"WALLET_A": {"label": "alpha", "win_rate": 0.7, "source": "manual"}}"#);
        let registry = WhaleRegistry::load(file.path()).unwrap();
        assert!(registry.contains("WALLET_A"));
        assert_eq!(registry.get("WALLET_A").unwrap().label, "alpha");
        assert!(!registry.contains("WALLET_B"));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(WhaleRegistry::load("/nonexistent/whales.json").is_err());
    }

    #[test]
    fn reload_replaces_the_in_memory_map() {
        let file = write(r#"{"WALLET_A": {"label": "alpha", "win_rate": null, "source": null}}"#);
        let registry = WhaleRegistry::load(file.path()).unwrap();
        assert!(registry.contains("WALLET_A"));

        std::fs::write(file.path(), r#"{"WALLET_B": {"label": "beta", "win_rate": null, "source": null}}"#).unwrap();
        registry.reload().unwrap();
        assert!(!registry.contains("WALLET_A"));
        assert!(registry.contains("WALLET_B"));
    }
}
