//! The emitted-token set and the buying-in-progress set, guarded by the
//! single mutex described in §5: "the check-and-insert on the emitted-token
//! set and the check-and-insert on buying-in-progress must be one atomic
//! step." `reserve_for_emission` is that step; `finish_emission` runs
//! after the executor call returns, outside the reservation's critical
//! section.

use crate::atomic;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use types::EmissionOutcome;

struct State {
    /// Insertion-ordered; oldest-first, so half-eviction drops the right end.
    tokens: indexmap::IndexSet<String>,
    buying_in_progress: HashSet<String>,
}

pub struct EmittedTokenRegistry {
    path: PathBuf,
    capacity: usize,
    state: Mutex<State>,
}

impl EmittedTokenRegistry {
    /// Load the emitted-token set from `path`. Never fails: a missing or
    /// doubly-corrupt file (primary and `.bak` both unreadable) logs a
    /// critical error and starts empty, per §4.9/§7 — this risks at most
    /// one duplicate buy, which the executor's own rules can still refuse.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let tokens = atomic::read_with_fallback(&path, |s| serde_json::from_str::<Vec<String>>(s).ok())
            .unwrap_or_else(|| {
                if path.exists() {
                    tracing::error!(path = %path.display(), "emitted-token state corrupt in both primary and backup; starting empty");
                }
                Vec::new()
            });

        let mut set = indexmap::IndexSet::new();
        for token in tokens {
            set.insert(token);
        }
        evict_if_needed(&mut set, capacity);

        Self {
            path,
            capacity,
            state: Mutex::new(State {
                tokens: set,
                buying_in_progress: HashSet::new(),
            }),
        }
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.state.lock().expect("emitted registry lock poisoned").tokens.contains(mint)
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("emitted registry lock poisoned").tokens.len()
    }

    /// §4.6 step 7 + §4.9/§5 critical section. Returns `true` if `mint` is
    /// neither already emitted nor currently buying-in-progress, and if
    /// so, marks it buying-in-progress. The caller must eventually call
    /// `finish_emission` for every `true` result.
    pub fn reserve_for_emission(&self, mint: &str) -> bool {
        let mut state = self.state.lock().expect("emitted registry lock poisoned");
        if state.tokens.contains(mint) || state.buying_in_progress.contains(mint) {
            return false;
        }
        state.buying_in_progress.insert(mint.to_string());
        true
    }

    /// Called once the executor has returned for a previously-reserved
    /// mint. On `Bought`, persists the mint into the emitted-token set
    /// (the only state mutation this registry performs outside the
    /// reservation). On `Failed`, the mint is simply released —
    /// §4.10's critical invariant: failed emissions remain eligible.
    pub fn finish_emission(&self, mint: &str, outcome: &EmissionOutcome) -> std::io::Result<()> {
        let snapshot = {
            let mut state = self.state.lock().expect("emitted registry lock poisoned");
            state.buying_in_progress.remove(mint);
            if matches!(outcome, EmissionOutcome::Bought { .. }) {
                state.tokens.insert(mint.to_string());
                evict_if_needed(&mut state.tokens, self.capacity);
                Some(state.tokens.iter().cloned().collect::<Vec<_>>())
            } else {
                None
            }
        };

        if let Some(tokens) = snapshot {
            let contents = serde_json::to_vec_pretty(&tokens)?;
            atomic::write_atomic(&self.path, &contents)?;
        }
        Ok(())
    }
}

fn evict_if_needed(set: &mut indexmap::IndexSet<String>, capacity: usize) {
    if set.len() > capacity {
        let evict_count = set.len() / 2;
        for _ in 0..evict_count {
            set.shift_remove_index(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reserve_for_emission_admits_each_mint_once_until_finished() {
        let dir = tempdir().unwrap();
        let registry = EmittedTokenRegistry::load(dir.path().join("emitted.json"), 500);

        assert!(registry.reserve_for_emission("MINT_X"));
        assert!(!registry.reserve_for_emission("MINT_X")); // already buying-in-progress

        registry
            .finish_emission("MINT_X", &EmissionOutcome::Bought { position_handle: "pos-1".to_string() })
            .unwrap();

        assert!(registry.contains("MINT_X"));
        assert!(!registry.reserve_for_emission("MINT_X")); // now permanently emitted
    }

    #[test]
    fn failed_emission_releases_the_mint_for_retry() {
        let dir = tempdir().unwrap();
        let registry = EmittedTokenRegistry::load(dir.path().join("emitted.json"), 500);

        assert!(registry.reserve_for_emission("MINT_X"));
        registry.finish_emission("MINT_X", &EmissionOutcome::Failed { reason: "slippage".to_string() }).unwrap();

        assert!(!registry.contains("MINT_X"));
        assert!(registry.reserve_for_emission("MINT_X"));
    }

    #[test]
    fn persists_across_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emitted.json");

        {
            let registry = EmittedTokenRegistry::load(&path, 500);
            registry.reserve_for_emission("MINT_X");
            registry
                .finish_emission("MINT_X", &EmissionOutcome::Bought { position_handle: "pos-1".to_string() })
                .unwrap();
        }

        let reloaded = EmittedTokenRegistry::load(&path, 500);
        assert!(reloaded.contains("MINT_X"));
    }

    #[test]
    fn missing_file_starts_empty_without_erroring() {
        let dir = tempdir().unwrap();
        let registry = EmittedTokenRegistry::load(dir.path().join("does-not-exist.json"), 500);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn eviction_keeps_capacity_bounded() {
        let dir = tempdir().unwrap();
        let registry = EmittedTokenRegistry::load(dir.path().join("emitted.json"), 10);
        for i in 0..11 {
            let mint = format!("MINT_{i}");
            registry.reserve_for_emission(&mint);
            registry
                .finish_emission(&mint, &EmissionOutcome::Bought { position_handle: format!("pos-{i}") })
                .unwrap();
        }
        assert!(registry.len() <= 6);
        assert!(registry.contains("MINT_10"));
        assert!(!registry.contains("MINT_0"));
    }
}
