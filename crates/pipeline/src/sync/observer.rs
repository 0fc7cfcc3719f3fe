//! Push notifications out of the sync engine

use tokio::sync::mpsc;

/// Receives word and progress updates from a [`SyncEngine`](super::SyncEngine)
///
/// Both methods default to no-ops so observers implement only what they need.
pub trait SyncObserver: Send {
    /// The highlighted word changed
    fn on_word_change(&mut self, _paragraph_index: usize, _word_index: usize, _timestamp_ms: f64) {}

    /// Playback progressed
    fn on_progress(&mut self, _percent_complete: f64, _time_remaining: &str) {}
}

/// Sync notification as a value, for hosts that poll or await
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    WordChanged {
        paragraph_index: usize,
        word_index: usize,
        timestamp_ms: f64,
    },
    Progress {
        percent_complete: f64,
        time_remaining: String,
    },
}

/// Forwards sync notifications into an unbounded channel
///
/// Sends never block the tick; a dropped receiver silently discards events.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self { tx }
    }

    /// Create an observer together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl SyncObserver for ChannelObserver {
    fn on_word_change(&mut self, paragraph_index: usize, word_index: usize, timestamp_ms: f64) {
        let _ = self.tx.send(SyncEvent::WordChanged {
            paragraph_index,
            word_index,
            timestamp_ms,
        });
    }

    fn on_progress(&mut self, percent_complete: f64, time_remaining: &str) {
        let _ = self.tx.send(SyncEvent::Progress {
            percent_complete,
            time_remaining: time_remaining.to_string(),
        });
    }
}

/// Format a remaining duration as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_time_remaining(remaining_ms: f64) -> String {
    let total_secs = if remaining_ms.is_finite() && remaining_ms > 0.0 {
        (remaining_ms / 1000.0).ceil() as u64
    } else {
        0
    };
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_remaining() {
        assert_eq!(format_time_remaining(0.0), "0:00");
        assert_eq!(format_time_remaining(-5.0), "0:00");
        assert_eq!(format_time_remaining(f64::NAN), "0:00");
        assert_eq!(format_time_remaining(400.0), "0:01");
        assert_eq!(format_time_remaining(65_000.0), "1:05");
        assert_eq!(format_time_remaining(3_600_000.0), "1:00:00");
        assert_eq!(format_time_remaining(3_725_000.0), "1:02:05");
    }

    #[test]
    fn test_channel_observer_forwards() {
        let (mut observer, mut rx) = ChannelObserver::channel();
        observer.on_word_change(1, 4, 1200.0);
        observer.on_progress(50.0, "0:10");

        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::WordChanged {
                paragraph_index: 1,
                word_index: 4,
                timestamp_ms: 1200.0
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::Progress {
                percent_complete: 50.0,
                time_remaining: "0:10".to_string()
            }
        );
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (mut observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_progress(10.0, "0:01");
    }
}
