//! Word-timing ingestion
//!
//! Alignment services report word timings under two field conventions
//! (`startMs`/`endMs` and `startTimeMs`/`endTimeMs`). Both are accepted here
//! and normalized into [`WordBoundary`]; nothing downstream sees the raw shape.

use serde::Deserialize;

use crate::{Error, WordBoundary};

/// Word timing as delivered by an external timing provider
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWordTiming {
    #[serde(default)]
    pub word: String,
    #[serde(alias = "startTimeMs", alias = "start_ms", alias = "start_time_ms")]
    pub start_ms: f64,
    #[serde(alias = "endTimeMs", alias = "end_ms", alias = "end_time_ms")]
    pub end_ms: f64,
    #[serde(default, alias = "char_offset")]
    pub char_offset: usize,
    #[serde(default, alias = "char_length")]
    pub char_length: usize,
}

impl From<RawWordTiming> for WordBoundary {
    fn from(raw: RawWordTiming) -> Self {
        Self {
            word: raw.word,
            char_offset: raw.char_offset,
            char_length: raw.char_length,
            start_ms: raw.start_ms,
            end_ms: raw.end_ms,
        }
    }
}

/// Parse a JSON array of word timings in either naming convention
pub fn parse_word_timings_json(json: &str) -> Result<Vec<RawWordTiming>, Error> {
    serde_json::from_str(json).map_err(|e| Error::InvalidTiming(e.to_string()))
}

/// Normalize raw timings into a sorted, non-overlapping word timeline
///
/// Entries with non-finite or negative times, or with `end < start`, are
/// dropped. When a word starts before the previous one ends, the previous
/// word's end is trimmed to the next start. Gaps are kept.
pub fn normalize_word_timings(raw: Vec<RawWordTiming>) -> Vec<WordBoundary> {
    let total = raw.len();
    let mut words: Vec<WordBoundary> = raw
        .into_iter()
        .filter(|w| {
            w.start_ms.is_finite()
                && w.end_ms.is_finite()
                && w.start_ms >= 0.0
                && w.end_ms >= w.start_ms
        })
        .map(WordBoundary::from)
        .collect();

    let dropped = total - words.len();
    if dropped > 0 {
        tracing::warn!(dropped, total, "Dropped invalid word timings");
    }

    words.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));

    for i in 1..words.len() {
        let next_start = words[i].start_ms;
        let prev = &mut words[i - 1];
        if prev.end_ms > next_start {
            prev.end_ms = next_start;
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_conventions() {
        let short = r#"[{"word":"hi","startMs":0,"endMs":300,"charOffset":0,"charLength":2}]"#;
        let long = r#"[{"word":"hi","startTimeMs":0,"endTimeMs":300,"charOffset":0,"charLength":2}]"#;

        let a = parse_word_timings_json(short).unwrap();
        let b = parse_word_timings_json(long).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].end_ms, 300.0);
        assert_eq!(a[0].char_length, 2);
    }

    #[test]
    fn test_parse_missing_span_defaults() {
        let json = r#"[{"word":"x","startMs":10,"endMs":20}]"#;
        let words = parse_word_timings_json(json).unwrap();
        assert_eq!(words[0].char_offset, 0);
        assert_eq!(words[0].char_length, 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_word_timings_json("{not json"),
            Err(Error::InvalidTiming(_))
        ));
    }

    #[test]
    fn test_normalize_sorts_and_trims_overlap() {
        let raw = vec![
            RawWordTiming {
                word: "b".into(),
                start_ms: 500.0,
                end_ms: 900.0,
                char_offset: 2,
                char_length: 1,
            },
            RawWordTiming {
                word: "a".into(),
                start_ms: 0.0,
                end_ms: 600.0,
                char_offset: 0,
                char_length: 1,
            },
        ];

        let words = normalize_word_timings(raw);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "a");
        assert_eq!(words[0].end_ms, 500.0);
        assert_eq!(words[1].start_ms, 500.0);
    }

    #[test]
    fn test_normalize_drops_invalid_keeps_gaps() {
        let raw = vec![
            RawWordTiming {
                word: "ok".into(),
                start_ms: 0.0,
                end_ms: 500.0,
                char_offset: 0,
                char_length: 2,
            },
            RawWordTiming {
                word: "backwards".into(),
                start_ms: 800.0,
                end_ms: 700.0,
                char_offset: 3,
                char_length: 9,
            },
            RawWordTiming {
                word: "nan".into(),
                start_ms: f64::NAN,
                end_ms: 1.0,
                char_offset: 0,
                char_length: 0,
            },
            RawWordTiming {
                word: "later".into(),
                start_ms: 900.0,
                end_ms: 1300.0,
                char_offset: 13,
                char_length: 5,
            },
        ];

        let words = normalize_word_timings(raw);
        let names: Vec<_> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(names, vec!["ok", "later"]);
        assert_eq!(words[0].end_ms, 500.0);
        assert_eq!(words[1].start_ms, 900.0);
    }
}
