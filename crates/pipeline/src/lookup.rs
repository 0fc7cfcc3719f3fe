//! Active-word resolution over a sorted word timeline

use readalong_core::WordBoundary;

/// Find the word that should be highlighted at `time_ms`
///
/// `words` must be sorted by start and non-overlapping; gaps are allowed.
///
/// - inside `[start, end)` of a word: that word
/// - inside a gap: the preceding word (the highlight lingers through silence)
/// - before the first word: `Some(0)`
/// - after the last word: the last word
/// - empty timeline: `None`
pub fn find_word_index(words: &[WordBoundary], time_ms: f64) -> Option<usize> {
    if words.is_empty() {
        return None;
    }
    let started = words.partition_point(|w| w.start_ms <= time_ms);
    Some(started.saturating_sub(1))
}
