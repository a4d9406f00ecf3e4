//! Performance counters for the reconciler and resource cache.
//!
//! Enabled via `--features runtime-metrics`. Compiles to no-ops when disabled.

/// Increment a metric counter. No-op when `runtime-metrics` is disabled.
#[cfg(feature = "runtime-metrics")]
macro_rules! inc_metric {
    ($counter:ident) => {
        $crate::metrics::$counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    };
    ($counter:ident, $amount:expr) => {
        $crate::metrics::$counter.fetch_add($amount, std::sync::atomic::Ordering::Relaxed);
    };
}

#[cfg(not(feature = "runtime-metrics"))]
macro_rules! inc_metric {
    ($counter:ident) => {};
    ($counter:ident, $amount:expr) => {};
}

pub(crate) use inc_metric;

#[cfg(feature = "runtime-metrics")]
mod counters {
    use std::sync::atomic::{AtomicU64, Ordering};

    pub static COMPONENT_RENDERS: AtomicU64 = AtomicU64::new(0);
    pub static LIST_RECONCILES: AtomicU64 = AtomicU64::new(0);
    pub static LIST_MOVES: AtomicU64 = AtomicU64::new(0);
    pub static PORTAL_MOUNTS: AtomicU64 = AtomicU64::new(0);
    pub static SWAP_REMOUNTS: AtomicU64 = AtomicU64::new(0);
    pub static RESOURCE_FETCHES_STARTED: AtomicU64 = AtomicU64::new(0);
    pub static RESOURCE_DEDUP_HITS: AtomicU64 = AtomicU64::new(0);
    pub static RESOURCE_CACHE_HITS: AtomicU64 = AtomicU64::new(0);
    pub static RESOURCE_FAILURES: AtomicU64 = AtomicU64::new(0);

    /// Dump all counters through the `log` facade.
    pub fn dump_to_log() {
        log::info!(
            "[runtime-metrics] reconciler: renders={}, list_reconciles={}, list_moves={}, portals={}, swaps={}",
            COMPONENT_RENDERS.load(Ordering::Relaxed),
            LIST_RECONCILES.load(Ordering::Relaxed),
            LIST_MOVES.load(Ordering::Relaxed),
            PORTAL_MOUNTS.load(Ordering::Relaxed),
            SWAP_REMOUNTS.load(Ordering::Relaxed),
        );
        log::info!(
            "[runtime-metrics] resources: started={}, dedup_hits={}, cache_hits={}, failures={}",
            RESOURCE_FETCHES_STARTED.load(Ordering::Relaxed),
            RESOURCE_DEDUP_HITS.load(Ordering::Relaxed),
            RESOURCE_CACHE_HITS.load(Ordering::Relaxed),
            RESOURCE_FAILURES.load(Ordering::Relaxed),
        );
    }
}

#[cfg(feature = "runtime-metrics")]
pub use counters::*;
