//! Read-along playback session
//!
//! Ties the pieces together for one piece of text:
//! - synthesis through a pluggable [`Synthesizer`](readalong_core::Synthesizer)
//! - segment reuse through the shared audio cache
//! - highlighting through the sync engine and its ticker
//!
//! Hosts drive it with clip lifecycle calls and listen on a broadcast channel.

mod events;
mod session;

pub use events::{BroadcastObserver, SessionEvent, SessionState};
pub use session::{ReadAlongSession, SeekOutcome};

use thiserror::Error;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No text loaded")]
    NotLoaded,

    #[error("Paragraph {index} out of range ({len} paragraphs)")]
    ParagraphOutOfRange { index: usize, len: usize },

    #[error("Sync error: {0}")]
    Sync(#[from] readalong_pipeline::SyncError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] readalong_core::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] readalong_cache::CacheError),
}
