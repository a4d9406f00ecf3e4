//! Performance counters for the reactive core.
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

    pub static SIGNALS_CREATED: AtomicU64 = AtomicU64::new(0);
    pub static LISTENERS_SUBSCRIBED: AtomicU64 = AtomicU64::new(0);
    pub static LISTENERS_REMOVED: AtomicU64 = AtomicU64::new(0);
    pub static NOTIFICATIONS_SENT: AtomicU64 = AtomicU64::new(0);
    pub static NOTIFICATIONS_SUPPRESSED: AtomicU64 = AtomicU64::new(0);
    pub static LISTENER_PANICS: AtomicU64 = AtomicU64::new(0);
    pub static SLOTS_ALLOCATED: AtomicU64 = AtomicU64::new(0);
    pub static SLOTS_REUSED: AtomicU64 = AtomicU64::new(0);
    pub static SCOPES_CLOSED: AtomicU64 = AtomicU64::new(0);
    pub static TASKS_CANCELLED: AtomicU64 = AtomicU64::new(0);

    /// Dump all counters through the `log` facade.
    pub fn dump_to_log() {
        log::info!(
            "[runtime-metrics] signals: created={}, subscribed={}, removed={}",
            SIGNALS_CREATED.load(Ordering::Relaxed),
            LISTENERS_SUBSCRIBED.load(Ordering::Relaxed),
            LISTENERS_REMOVED.load(Ordering::Relaxed),
        );
        log::info!(
            "[runtime-metrics] notify: sent={}, suppressed={}, listener_panics={}",
            NOTIFICATIONS_SENT.load(Ordering::Relaxed),
            NOTIFICATIONS_SUPPRESSED.load(Ordering::Relaxed),
            LISTENER_PANICS.load(Ordering::Relaxed),
        );
        log::info!(
            "[runtime-metrics] phase: slots_allocated={}, slots_reused={}; scopes_closed={}; tasks_cancelled={}",
            SLOTS_ALLOCATED.load(Ordering::Relaxed),
            SLOTS_REUSED.load(Ordering::Relaxed),
            SCOPES_CLOSED.load(Ordering::Relaxed),
            TASKS_CANCELLED.load(Ordering::Relaxed),
        );
    }
}

#[cfg(feature = "runtime-metrics")]
pub use counters::*;
