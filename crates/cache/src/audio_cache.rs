//! LRU audio segment cache
//!
//! Recency order lives in an `lru::LruCache`; the byte budget and age limit
//! are enforced on top of it. One `parking_lot::Mutex` guards the whole
//! index, so each public operation is atomic and a cache can be shared by
//! several playback sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use readalong_config::CacheConfig;

use crate::segment::{AudioSegment, SegmentMetadata};
use crate::CacheError;

/// Running hit/miss/eviction counters
#[derive(Debug, Default)]
pub struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub rejections: AtomicU64,
}

impl CacheCounters {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
    /// Byte budget used, 0-100
    pub percent_full: f64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheIndex {
    entries: LruCache<String, Arc<AudioSegment>>,
    total_bytes: u64,
}

impl CacheIndex {
    fn remove(&mut self, key: &str) -> Option<Arc<AudioSegment>> {
        let segment = self.entries.pop(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(segment.size_bytes);
        Some(segment)
    }

    fn remove_lru(&mut self) -> Option<Arc<AudioSegment>> {
        let (_, segment) = self.entries.pop_lru()?;
        self.total_bytes = self.total_bytes.saturating_sub(segment.size_bytes);
        Some(segment)
    }
}

/// Bounded store of synthesized audio
pub struct AudioSegmentCache {
    max_entries: usize,
    max_bytes: u64,
    max_age: Duration,
    index: Mutex<CacheIndex>,
    counters: CacheCounters,
}

impl AudioSegmentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries.max(1),
            max_bytes: config.max_bytes,
            max_age: config.max_age(),
            index: Mutex::new(CacheIndex {
                entries: LruCache::unbounded(),
                total_bytes: 0,
            }),
            counters: CacheCounters::default(),
        }
    }

    /// Look up a segment and mark it most recently used
    ///
    /// Entries older than the max age are evicted here and reported as absent.
    pub fn get(&self, key: &str) -> Option<Arc<AudioSegment>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<Arc<AudioSegment>> {
        let mut index = self.index.lock();

        let expired = match index.entries.peek(key) {
            Some(segment) => self.is_expired(segment, now),
            None => {
                self.counters.record_miss();
                return None;
            }
        };

        if expired {
            index.remove(key);
            self.counters.record_eviction();
            self.counters.record_miss();
            tracing::debug!(key, "Evicted expired segment on read");
            return None;
        }

        self.counters.record_hit();
        index.entries.get(key).cloned()
    }

    /// Store a segment, replacing any entry under the same key
    ///
    /// Makes room first: least recently used entries go while the entry count
    /// or byte budget would be exceeded, then any expired entries are swept.
    /// A segment larger than the whole byte budget is rejected without
    /// evicting anything.
    pub fn set(
        &self,
        key: impl Into<String>,
        bytes: Vec<u8>,
        metadata: SegmentMetadata,
    ) -> Result<Arc<AudioSegment>, CacheError> {
        self.set_at(key.into(), bytes, metadata, Instant::now())
    }

    pub(crate) fn set_at(
        &self,
        key: String,
        bytes: Vec<u8>,
        metadata: SegmentMetadata,
        now: Instant,
    ) -> Result<Arc<AudioSegment>, CacheError> {
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            self.counters.record_rejection();
            tracing::warn!(
                key = %key,
                size,
                max_bytes = self.max_bytes,
                "Segment larger than cache budget, not caching"
            );
            return Err(CacheError::EntryTooLarge {
                size,
                max_bytes: self.max_bytes,
            });
        }

        let mut index = self.index.lock();
        index.remove(&key);

        while index.entries.len() >= self.max_entries {
            self.evict_lru(&mut index, "entry limit");
        }

        while index.total_bytes + size > self.max_bytes && !index.entries.is_empty() {
            self.evict_lru(&mut index, "byte budget");
        }

        let expired: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, segment)| self.is_expired(segment, now))
            .map(|(k, _)| k.clone())
            .collect();
        for stale in expired {
            index.remove(&stale);
            self.counters.record_eviction();
            tracing::debug!(key = %stale, "Swept expired segment");
        }

        let segment = Arc::new(AudioSegment::new(key.clone(), bytes, metadata, now));
        index.total_bytes += size;
        index.entries.put(key, segment.clone());

        Ok(segment)
    }

    /// Remove one entry; returns whether it existed
    pub fn delete(&self, key: &str) -> bool {
        self.index.lock().remove(key).is_some()
    }

    /// Drop every segment produced by `provider`
    ///
    /// Audio and timings from one provider are never reused after switching
    /// to another.
    pub fn clear_for_provider(&self, provider: &str) -> usize {
        let mut index = self.index.lock();
        let keys: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, segment)| segment.provider == provider)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &keys {
            index.remove(key);
        }

        if !keys.is_empty() {
            tracing::info!(provider, removed = keys.len(), "Cleared provider segments");
        }
        keys.len()
    }

    pub fn clear(&self) {
        let mut index = self.index.lock();
        index.entries.clear();
        index.total_bytes = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let index = self.index.lock();
        let percent_full = if self.max_bytes == 0 {
            0.0
        } else {
            index.total_bytes as f64 / self.max_bytes as f64 * 100.0
        };
        CacheStats {
            entries: index.entries.len(),
            max_entries: self.max_entries,
            total_bytes: index.total_bytes,
            max_bytes: self.max_bytes,
            percent_full,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    pub fn len(&self) -> usize {
        self.index.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().entries.is_empty()
    }

    fn is_expired(&self, segment: &AudioSegment, now: Instant) -> bool {
        now.saturating_duration_since(segment.created_at) > self.max_age
    }

    fn evict_lru(&self, index: &mut CacheIndex, reason: &'static str) {
        if let Some(segment) = index.remove_lru() {
            self.counters.record_eviction();
            tracing::debug!(key = %segment.key, bytes = segment.size_bytes, reason, "Evicted segment");
        }
    }
}

impl Default for AudioSegmentCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
