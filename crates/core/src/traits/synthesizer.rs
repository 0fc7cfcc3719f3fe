//! Speech synthesis seam

use crate::timing::RawWordTiming;
use crate::Error;

/// Result of one synthesis call
#[derive(Debug, Clone, Default)]
pub struct SynthesisOutput {
    /// Encoded audio
    pub audio: Vec<u8>,
    /// Clip duration if the provider knows it
    pub duration_ms: Option<f64>,
    /// Word timings if the provider (or an aligner behind it) supplies them
    pub word_timings: Option<Vec<RawWordTiming>>,
}

/// TTS provider trait
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    /// Stable provider identifier, used to tag cached audio
    fn provider_id(&self) -> &str;

    /// Synthesize text with the given voice
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesisOutput, Error>;
}
