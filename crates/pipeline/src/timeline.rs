//! Paragraph timeline
//!
//! Before the real audio duration is known, each paragraph gets a slice of an
//! estimated total proportional to its word count. Once the true duration
//! arrives the whole timeline is rescaled in one pass.

use unicode_segmentation::UnicodeSegmentation;

use readalong_core::ParagraphTiming;

/// Count words the way the timeline weights paragraphs
pub fn count_words(text: &str) -> usize {
    text.unicode_words().count()
}

/// Estimated speaking time for `word_count` words (ms)
pub fn estimate_duration_ms(word_count: usize, words_per_minute: f64, playback_rate: f64) -> f64 {
    if word_count == 0 || words_per_minute <= 0.0 {
        return 0.0;
    }
    let rate = if playback_rate > 0.0 { playback_rate } else { 1.0 };
    word_count as f64 / words_per_minute * 60_000.0 / rate
}

/// Contiguous per-paragraph time ranges covering `[0, total_duration_ms]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphTimeline {
    entries: Vec<ParagraphTiming>,
    total_duration_ms: f64,
}

impl ParagraphTimeline {
    /// Build from per-paragraph word counts
    ///
    /// When the aggregate word count is zero, every paragraph gets an equal
    /// slice. The check is global: a single empty paragraph among non-empty
    /// ones still gets a zero-length slice.
    pub fn from_word_counts(word_counts: &[usize], total_duration_ms: f64) -> Self {
        let total_duration_ms = total_duration_ms.max(0.0);
        let n = word_counts.len();
        if n == 0 {
            return Self::default();
        }

        let total_words: usize = word_counts.iter().sum();
        let mut entries = Vec::with_capacity(n);
        let mut start = 0.0;
        let mut cumulative = 0usize;

        for (index, &count) in word_counts.iter().enumerate() {
            let end = if index + 1 == n {
                total_duration_ms
            } else if total_words == 0 {
                total_duration_ms * (index + 1) as f64 / n as f64
            } else {
                cumulative += count;
                total_duration_ms * cumulative as f64 / total_words as f64
            };
            entries.push(ParagraphTiming::new(index, start, end));
            start = end;
        }

        Self {
            entries,
            total_duration_ms,
        }
    }

    /// Rescale every bound so the timeline ends exactly at `actual_duration_ms`
    ///
    /// Idempotent for a fixed target. Non-positive targets and empty timelines
    /// are left untouched.
    pub fn rescale_to_actual_duration(&mut self, actual_duration_ms: f64) {
        if self.entries.is_empty() || !(actual_duration_ms > 0.0) {
            return;
        }

        let factor = if self.total_duration_ms > 0.0 {
            actual_duration_ms / self.total_duration_ms
        } else {
            0.0
        };

        for entry in &mut self.entries {
            entry.start_ms *= factor;
            entry.end_ms *= factor;
        }

        if factor == 0.0 {
            // Degenerate estimate: fall back to equal slices of the real duration
            let n = self.entries.len() as f64;
            for (i, entry) in self.entries.iter_mut().enumerate() {
                entry.start_ms = actual_duration_ms * i as f64 / n;
                entry.end_ms = actual_duration_ms * (i + 1) as f64 / n;
            }
        }

        self.entries[0].start_ms = 0.0;
        for i in 0..self.entries.len() - 1 {
            self.entries[i].end_ms = self.entries[i + 1].start_ms;
        }
        if let Some(last) = self.entries.last_mut() {
            last.end_ms = actual_duration_ms;
        }
        for entry in &mut self.entries {
            entry.duration_ms = entry.end_ms - entry.start_ms;
        }

        self.total_duration_ms = actual_duration_ms;
    }

    /// Index of the paragraph whose range contains `time_ms`
    ///
    /// Times past the end resolve to the last paragraph, negative times to the
    /// first. `None` only for an empty timeline.
    pub fn paragraph_at(&self, time_ms: f64) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let after = self.entries.partition_point(|p| p.start_ms <= time_ms);
        Some(after.saturating_sub(1).min(self.entries.len() - 1))
    }

    pub fn get(&self, index: usize) -> Option<&ParagraphTiming> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[ParagraphTiming] {
        &self.entries
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.total_duration_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a timeline from paragraph texts and an estimated total duration
pub fn build_paragraph_timeline<S: AsRef<str>>(
    paragraphs: &[S],
    total_duration_estimate_ms: f64,
) -> ParagraphTimeline {
    let counts: Vec<usize> = paragraphs.iter().map(|p| count_words(p.as_ref())).collect();
    ParagraphTimeline::from_word_counts(&counts, total_duration_estimate_ms)
}
