//! Audio segment cache
//!
//! Stores synthesized audio and its word timings keyed by a fingerprint of
//! (provider, voice, text), so repeated or revisited text plays without a
//! new synthesis call. Bounded by entry count, total bytes and age.

mod audio_cache;
mod key;
mod segment;

pub use audio_cache::{AudioSegmentCache, CacheCounters, CacheStats};
pub use key::cache_key;
pub use segment::{AudioSegment, SegmentMetadata};

use thiserror::Error;

/// Cache errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Segment of {size} bytes exceeds the cache budget of {max_bytes} bytes")]
    EntryTooLarge { size: u64, max_bytes: u64 },
}
