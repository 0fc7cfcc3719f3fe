//! Authoritative playback clock

use parking_lot::Mutex;

/// The single time authority for a playing clip
///
/// Implemented by whatever actually plays the audio. The sync engine re-reads
/// it on every tick and never keeps its own timer.
pub trait ClockSource: Send + Sync {
    /// Current position within the playing clip (ms)
    fn position_ms(&self) -> f64;

    /// Playback rate multiplier (1.0 = normal)
    fn playback_rate(&self) -> f64 {
        1.0
    }

    /// Is the underlying player paused or stalled?
    fn is_paused(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
struct ManualClockState {
    position_ms: f64,
    rate: f64,
    paused: bool,
}

/// Clock driven explicitly by its owner
///
/// Used by simulations and tests; real hosts implement [`ClockSource`] over
/// their audio element.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualClockState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualClockState {
                position_ms: 0.0,
                rate: 1.0,
                paused: false,
            }),
        }
    }

    pub fn set_position_ms(&self, position_ms: f64) {
        self.state.lock().position_ms = position_ms.max(0.0);
    }

    /// Move the position forward by `delta_ms` of media time
    pub fn advance_ms(&self, delta_ms: f64) {
        let mut state = self.state.lock();
        state.position_ms = (state.position_ms + delta_ms).max(0.0);
    }

    pub fn set_rate(&self, rate: f64) {
        self.state.lock().rate = rate;
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for ManualClock {
    fn position_ms(&self) -> f64 {
        self.state.lock().position_ms
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}
