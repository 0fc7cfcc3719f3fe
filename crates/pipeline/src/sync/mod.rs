//! Synchronized playback
//!
//! - `SyncEngine`: clock-reconciliation state machine
//! - Observers for word/progress notifications
//! - Dual-trigger ticker

mod engine;
mod observer;
mod ticker;

#[cfg(test)]
mod tests;

pub use engine::{SyncEngine, SyncState, SyncStatus, TickTrigger};
pub use observer::{format_time_remaining, ChannelObserver, SyncEvent, SyncObserver};
pub use ticker::{shared, spawn_ticker, SharedSyncEngine};
