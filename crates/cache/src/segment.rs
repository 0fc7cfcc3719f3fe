use std::time::Instant;

use readalong_core::WordBoundary;

/// What the caller knows about a synthesized clip besides its bytes
#[derive(Debug, Clone, Default)]
pub struct SegmentMetadata {
    pub provider: String,
    pub voice: String,
    pub text: String,
    pub word_timings: Option<Vec<WordBoundary>>,
    /// Clip duration, when the provider reported it
    pub duration_ms: Option<f64>,
}

impl SegmentMetadata {
    pub fn new(provider: impl Into<String>, voice: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            voice: voice.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_word_timings(mut self, words: Vec<WordBoundary>) -> Self {
        self.word_timings = Some(words);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// A cached clip
///
/// Owned by the cache and shared out as `Arc<AudioSegment>`; holders get a
/// read-only view of the stored data.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub key: String,
    pub bytes: Vec<u8>,
    pub word_timings: Option<Vec<WordBoundary>>,
    pub duration_ms: Option<f64>,
    pub provider: String,
    pub voice: String,
    pub text: String,
    pub size_bytes: u64,
    pub created_at: Instant,
}

impl AudioSegment {
    pub fn new(key: String, bytes: Vec<u8>, metadata: SegmentMetadata, now: Instant) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            key,
            bytes,
            word_timings: metadata.word_timings,
            duration_ms: metadata.duration_ms,
            provider: metadata.provider,
            voice: metadata.voice,
            text: metadata.text,
            size_bytes,
            created_at: now,
        }
    }

    pub fn has_word_timings(&self) -> bool {
        self.word_timings.as_ref().is_some_and(|w| !w.is_empty())
    }
}
