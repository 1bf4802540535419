//! Minimal in-process counters backing the Watchdog's `/health` snapshot.
//!
//! This is not a metrics exporter: nothing here serves Prometheus or any
//! other outside collector (that would cross the "HTTP API to end users"
//! boundary this pipeline deliberately stays on the inside of). Every
//! increment is also forwarded through the `metrics` facade macros so a
//! host process that *does* install a recorder picks these up for free,
//! but the pipeline itself only ever reads its own snapshot.

use metrics::counter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A shared, cheaply-cloneable registry of named monotonic counters.
#[derive(Clone, Default)]
pub struct Counters {
    inner: Arc<Mutex<HashMap<&'static str, Arc<AtomicU64>>>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, name: &'static str) -> Arc<AtomicU64> {
        let mut guard = self.inner.lock().expect("counters mutex poisoned");
        guard
            .entry(name)
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }

    /// Increment a named counter by one and forward to the `metrics` facade.
    pub fn incr(&self, name: &'static str) {
        self.handle(name).fetch_add(1, Ordering::Relaxed);
        counter!(name).increment(1);
    }

    /// Current value of a named counter (0 if it has never been incremented).
    pub fn get(&self, name: &'static str) -> u64 {
        self.inner
            .lock()
            .expect("counters mutex poisoned")
            .get(name)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// Counter names the pipeline increments. Centralized here so a typo in a
/// name string can't silently split a counter in two.
pub mod names {
    pub const DROPPED_FRAMES: &str = "whale_copy_dropped_frames_total";
    pub const RESERVATIONS: &str = "whale_copy_reservations_total";
    pub const EMISSIONS: &str = "whale_copy_emissions_total";
    pub const EMISSION_FAILURES: &str = "whale_copy_emission_failures_total";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_accumulates_and_is_visible_through_clones() {
        let counters = Counters::new();
        let clone = counters.clone();
        counters.incr(names::DROPPED_FRAMES);
        clone.incr(names::DROPPED_FRAMES);
        assert_eq!(counters.get(names::DROPPED_FRAMES), 2);
    }

    #[test]
    fn unknown_counter_reads_as_zero() {
        let counters = Counters::new();
        assert_eq!(counters.get("never_touched"), 0);
    }
}
