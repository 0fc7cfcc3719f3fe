use tokio::sync::broadcast;

use readalong_pipeline::SyncObserver;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded
    Idle,
    /// Text loaded, playback not started
    Ready,
    /// Ticker running against the host clock
    Playing,
    /// Playback paused, position kept
    Paused,
    /// Last clip ended
    Finished,
}

/// Session events
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// State changed
    StateChanged { old: SessionState, new: SessionState },
    /// Highlighted word changed
    WordChanged {
        paragraph_index: usize,
        word_index: usize,
        timestamp_ms: f64,
    },
    /// Playback progressed
    Progress {
        percent_complete: f64,
        time_remaining: String,
    },
    /// Playback moved to another paragraph
    ParagraphChanged { index: usize },
    /// Segment served from cache
    CacheHit { key: String },
    /// Segment had to be synthesized
    CacheMiss { key: String },
    /// Paragraph timeline rescaled to the real total duration
    TimelineRescaled { total_duration_ms: f64 },
    /// Synthesizer replaced
    ProviderSwitched {
        from: String,
        to: String,
        purged: usize,
    },
}

/// Publishes sync engine notifications on the session channel
pub struct BroadcastObserver {
    tx: broadcast::Sender<SessionEvent>,
}

impl BroadcastObserver {
    pub fn new(tx: broadcast::Sender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl SyncObserver for BroadcastObserver {
    fn on_word_change(&mut self, paragraph_index: usize, word_index: usize, timestamp_ms: f64) {
        let _ = self.tx.send(SessionEvent::WordChanged {
            paragraph_index,
            word_index,
            timestamp_ms,
        });
    }

    fn on_progress(&mut self, percent_complete: f64, time_remaining: &str) {
        let _ = self.tx.send(SessionEvent::Progress {
            percent_complete,
            time_remaining: time_remaining.to_string(),
        });
    }
}
