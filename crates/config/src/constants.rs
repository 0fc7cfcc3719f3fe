//! Default values used across the read-along crates
//!
//! Settings fall back to these when a field is absent from every source.

/// Sync engine timing
pub mod sync {
    /// Drift beyond this triggers a snap to the authoritative clock (ms)
    pub const DRIFT_THRESHOLD_MS: f64 = 200.0;

    /// Ticker period, roughly one display frame (ms)
    pub const TICK_INTERVAL_MS: u64 = 16;

    /// Clip vs word-timeline mismatch tolerated before rescaling words (ms)
    pub const WORD_RESCALE_TOLERANCE_MS: f64 = 100.0;

    /// Speaking rate assumed for duration estimates
    pub const WORDS_PER_MINUTE: f64 = 150.0;
}

/// Audio segment cache limits
pub mod cache {
    pub const MAX_ENTRIES: usize = 50;

    /// 100 MiB
    pub const MAX_BYTES: u64 = 100 * 1024 * 1024;

    /// 30 minutes
    pub const MAX_AGE_SECS: u64 = 30 * 60;
}
