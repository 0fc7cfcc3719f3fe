//! Canonical timing types shared by the timeline builder, sync engine and cache.

use serde::{Deserialize, Serialize};

/// Time range of one paragraph within the whole read-along session
///
/// All values are milliseconds. A timeline of these is contiguous: the end of
/// entry `i` equals the start of entry `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParagraphTiming {
    /// Paragraph position in the document
    pub index: usize,
    /// Inclusive start (ms)
    pub start_ms: f64,
    /// Exclusive end (ms)
    pub end_ms: f64,
    /// `end_ms - start_ms`
    pub duration_ms: f64,
}

impl ParagraphTiming {
    pub fn new(index: usize, start_ms: f64, end_ms: f64) -> Self {
        Self {
            index,
            start_ms,
            end_ms,
            duration_ms: end_ms - start_ms,
        }
    }

    /// Does `time_ms` fall in `[start_ms, end_ms)`?
    pub fn contains(&self, time_ms: f64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }
}

/// Timing of a single spoken word inside one paragraph clip
///
/// Times are relative to the start of the paragraph's audio clip.
/// Interval is `[start_ms, end_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordBoundary {
    pub word: String,
    /// Character offset of the word in the paragraph text
    pub char_offset: usize,
    /// Character length of the word
    pub char_length: usize,
    pub start_ms: f64,
    pub end_ms: f64,
}

impl WordBoundary {
    pub fn new(word: impl Into<String>, start_ms: f64, end_ms: f64) -> Self {
        Self {
            word: word.into(),
            char_offset: 0,
            char_length: 0,
            start_ms,
            end_ms,
        }
    }

    /// Set the character span of the word in its paragraph
    pub fn with_span(mut self, char_offset: usize, char_length: usize) -> Self {
        self.char_offset = char_offset;
        self.char_length = char_length;
        self
    }

    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Duration implied by a word timeline: the end of its last word
pub fn implied_duration_ms(words: &[WordBoundary]) -> f64 {
    words.last().map(|w| w.end_ms).unwrap_or(0.0)
}
