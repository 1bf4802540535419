//! Append-only purchase history (`purchased_history.json`), written via
//! the same atomic-replace pattern as the emitted-token set. Only written
//! on a successful emission (§4.10).

use crate::atomic;
use std::path::PathBuf;
use std::sync::Mutex;
use types::PurchaseRecord;

pub struct PurchaseHistory {
    path: PathBuf,
    records: Mutex<Vec<PurchaseRecord>>,
}

impl PurchaseHistory {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = atomic::read_with_fallback(&path, |s| serde_json::from_str::<Vec<PurchaseRecord>>(s).ok())
            .unwrap_or_else(|| {
                if path.exists() {
                    tracing::error!(path = %path.display(), "purchase history corrupt in both primary and backup; starting empty");
                }
                Vec::new()
            });
        Self {
            path,
            records: Mutex::new(records),
        }
    }

    pub fn append(&self, record: PurchaseRecord) -> std::io::Result<()> {
        let snapshot = {
            let mut records = self.records.lock().expect("purchase history lock poisoned");
            records.push(record);
            records.clone()
        };
        let contents = serde_json::to_vec_pretty(&snapshot)?;
        atomic::write_atomic(&self.path, &contents)
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("purchase history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(mint: &str) -> PurchaseRecord {
        PurchaseRecord {
            mint: mint.to_string(),
            timestamp: 1_700_000_000,
            whale_label: "alpha".to_string(),
            amount_sol: 0.5,
            signature: "sig".to_string(),
        }
    }

    #[test]
    fn append_persists_across_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("purchased_history.json");

        {
            let history = PurchaseHistory::load(&path);
            history.append(record("MINT_X")).unwrap();
            history.append(record("MINT_Y")).unwrap();
        }

        let reloaded = PurchaseHistory::load(&path);
        assert_eq!(reloaded.len(), 2);
    }
}
