//! Pipeline diagnostics: how often each cached intermediate is computed.
//!
//! These counters are permanent instrumentation, not a debug aid. They
//! make the memoisation observable: a request that reuses its cache leaves
//! the counters untouched, and a parameter change recomputes exactly the
//! intermediates downstream of it. The test suite asserts invalidation
//! minimality through this interface, and interactive frontends can log
//! the report to confirm slider sweeps stay cheap.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;
use tracing::trace;

/// Per-intermediate computation counts.
///
/// Keys are the semantic cache keys from
/// [`cache::keys`](crate::cache::keys).
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageCounters {
    counts: HashMap<&'static str, u64>,
}

impl StageCounters {
    /// Record one computation of the intermediate stored under `key`.
    pub(crate) fn record(&mut self, key: &'static str) {
        trace!(key, "computing intermediate");
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// How many times the intermediate under `key` has been computed.
    #[must_use]
    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Total computations across all intermediates.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Forget all counts.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Format the counters as a human-readable report, sorted by key.
    #[must_use]
    pub fn report(&self) -> String {
        let mut entries: Vec<(&str, u64)> =
            self.counts.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_unstable();

        let mut out = String::from("Intermediate computations\n");
        for (key, count) in entries {
            let _ = writeln!(out, "{key:<16} {count:>6}");
        }
        let _ = writeln!(out, "{:<16} {:>6}", "total", self.total());
        out
    }
}
