//! Offline synthesizer for simulated playback

use unicode_segmentation::UnicodeSegmentation;

use readalong_core::{RawWordTiming, SynthesisOutput, Synthesizer};
use readalong_pipeline::{count_words, estimate_duration_ms};

/// 16kHz mono 16-bit PCM
const BYTES_PER_MS: f64 = 32.0;

/// Produces silence as long as the text would take to read aloud
///
/// With `word_timings` enabled each word gets an equal share of the clip,
/// which is enough to drive word highlighting in a simulation.
pub struct SilentSynthesizer {
    words_per_minute: f64,
    word_timings: bool,
}

impl SilentSynthesizer {
    pub fn new(words_per_minute: f64, word_timings: bool) -> Self {
        Self {
            words_per_minute,
            word_timings,
        }
    }
}

#[async_trait::async_trait]
impl Synthesizer for SilentSynthesizer {
    fn provider_id(&self) -> &str {
        "silent"
    }

    async fn synthesize(&self, text: &str, _voice: &str) -> Result<SynthesisOutput, readalong_core::Error> {
        let duration_ms = estimate_duration_ms(count_words(text), self.words_per_minute, 1.0);
        let audio = vec![0u8; (duration_ms * BYTES_PER_MS) as usize];

        let word_timings = self.word_timings.then(|| {
            let words: Vec<(usize, &str)> = text.unicode_word_indices().collect();
            let per_word = if words.is_empty() {
                0.0
            } else {
                duration_ms / words.len() as f64
            };
            words
                .into_iter()
                .enumerate()
                .map(|(i, (offset, word))| RawWordTiming {
                    word: word.to_string(),
                    start_ms: i as f64 * per_word,
                    end_ms: (i + 1) as f64 * per_word,
                    char_offset: offset,
                    char_length: word.len(),
                })
                .collect()
        });

        Ok(SynthesisOutput {
            audio,
            duration_ms: Some(duration_ms),
            word_timings,
        })
    }
}
