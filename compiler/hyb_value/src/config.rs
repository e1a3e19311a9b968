//! Collector tuning.

use tracing::warn;

/// Usage (bytes) at which `collect` starts reclaiming.
pub const DEFAULT_GC_THRESHOLD: usize = 2_048_000;
/// Hard memory ceiling (bytes). Allocations beyond it are fatal.
pub const DEFAULT_MM_THRESHOLD: usize = 134_217_728;
/// Survival ratio that promotes an entry to the lag list.
pub const DEFAULT_LAGGING_RATIO: f64 = 0.7;

/// Collector configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectorConfig {
    pub gc_threshold: usize,
    pub mm_threshold: usize,
    pub lagging_ratio: f64,
    /// Collections an entry must have seen before it can be promoted.
    pub lag_min_cycles: u32,
    /// Every n-th collection also sweeps the lag list.
    pub full_sweep_interval: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            mm_threshold: DEFAULT_MM_THRESHOLD,
            lagging_ratio: DEFAULT_LAGGING_RATIO,
            lag_min_cycles: 2,
            full_sweep_interval: 8,
        }
    }
}

impl CollectorConfig {
    /// Defaults overridden by `HYB_GC_THRESHOLD`, `HYB_MM_THRESHOLD` and
    /// `HYB_GC_LAG_RATIO`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = CollectorConfig::default();
        if let Some(v) = read_env("HYB_GC_THRESHOLD") {
            config.gc_threshold = v;
        }
        if let Some(v) = read_env("HYB_MM_THRESHOLD") {
            config.mm_threshold = v;
        }
        if let Some(v) = read_env::<f64>("HYB_GC_LAG_RATIO") {
            if (0.0..=1.0).contains(&v) {
                config.lagging_ratio = v;
            } else {
                warn!(value = v, "HYB_GC_LAG_RATIO outside 0..=1, ignored");
            }
        }
        config
    }

    /// Setting a zero GC threshold makes every `collect` call run.
    #[must_use]
    pub fn with_gc_threshold(mut self, bytes: usize) -> Self {
        self.gc_threshold = bytes;
        self
    }

    #[must_use]
    pub fn with_mm_threshold(mut self, bytes: usize) -> Self {
        self.mm_threshold = bytes;
        self
    }

    #[must_use]
    pub fn with_full_sweep_interval(mut self, interval: u64) -> Self {
        self.full_sweep_interval = interval.max(1);
        self
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable collector setting");
            None
        }
    }
}
