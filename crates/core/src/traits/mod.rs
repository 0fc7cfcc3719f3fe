//! Seams to the external collaborators of the playback engine

mod clock;
mod synthesizer;

pub use clock::{ClockSource, ManualClock};
pub use synthesizer::{SynthesisOutput, Synthesizer};
