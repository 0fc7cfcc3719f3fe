//! Read-along playback pipeline
//!
//! This crate provides the synchronized playback core:
//! - Paragraph timeline building and rescaling
//! - Binary-search word lookup
//! - Sync state machine with drift correction
//! - Dual-trigger ticker

pub mod lookup;
pub mod sync;
pub mod timeline;

pub use lookup::find_word_index;
pub use sync::{
    format_time_remaining, shared, spawn_ticker, ChannelObserver, SharedSyncEngine, SyncEngine,
    SyncEvent, SyncObserver, SyncState, SyncStatus, TickTrigger,
};
pub use timeline::{build_paragraph_timeline, count_words, estimate_duration_ms, ParagraphTimeline};

use thiserror::Error;

/// Sync engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Clock source required: bind a clock before starting playback")]
    ClockSourceRequired,

    #[error("Sync engine not started")]
    NotStarted,
}
