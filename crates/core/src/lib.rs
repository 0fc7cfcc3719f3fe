//! Core types and traits for the read-along playback engine
//!
//! - Canonical paragraph and word timing types
//! - Word-timing ingestion (both provider naming conventions)
//! - `ClockSource` and `Synthesizer` seams

pub mod error;
pub mod timing;
pub mod traits;
pub mod types;

pub use error::Error;
pub use timing::{normalize_word_timings, parse_word_timings_json, RawWordTiming};
pub use traits::{ClockSource, ManualClock, SynthesisOutput, Synthesizer};
pub use types::{implied_duration_ms, ParagraphTiming, WordBoundary};

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
