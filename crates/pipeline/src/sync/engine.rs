//! Clock-reconciliation state machine
//!
//! The engine never keeps its own timer. Every tick re-reads the bound
//! [`ClockSource`] and reconciles the paragraph/word indices to it. The only
//! extrapolation is the drift check, which compares the clock against the
//! previous sample advanced at the playback rate.

use std::sync::Arc;
use std::time::Instant;

use readalong_config::SyncConfig;
use readalong_core::{implied_duration_ms, ClockSource, WordBoundary};

use super::observer::{format_time_remaining, SyncObserver};
use crate::lookup::find_word_index;
use crate::timeline::ParagraphTimeline;
use crate::SyncError;

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No loop running, nothing bound
    Idle,
    /// Loop active, time advancing
    Running,
    /// Loop stopped, state retained
    Paused,
}

/// What triggered a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickTrigger {
    /// High-frequency render-rate tick
    Frame,
    /// Lower-frequency time-update signal from the player
    TimeUpdate,
    /// Explicit call by the orchestrator
    Manual,
}

/// Observable sync state for one playback session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncState {
    /// Session-wide position (ms): paragraph start plus clip position
    pub current_time_ms: f64,
    pub current_paragraph_index: usize,
    pub current_word_index: Option<usize>,
    pub total_duration_ms: f64,
    /// Last measured drift below the correction threshold (ms)
    pub drift_ms: f64,
    pub is_running: bool,
}

#[derive(Debug, Clone, Copy)]
struct ClockSample {
    position_ms: f64,
    at: Instant,
}

/// Synchronized playback engine for one session
pub struct SyncEngine {
    config: SyncConfig,
    status: SyncStatus,
    state: SyncState,
    clock: Option<Arc<dyn ClockSource>>,
    paragraphs: ParagraphTimeline,
    words: Vec<WordBoundary>,
    last_sample: Option<ClockSample>,
    generation: u64,
    drift_corrections: u64,
    observers: Vec<Box<dyn SyncObserver>>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            status: SyncStatus::Idle,
            state: SyncState::default(),
            clock: None,
            paragraphs: ParagraphTimeline::default(),
            words: Vec::new(),
            last_sample: None,
            generation: 0,
            drift_corrections: 0,
            observers: Vec::new(),
        }
    }

    /// Register an observer; all registered observers receive every event
    pub fn add_observer(&mut self, observer: Box<dyn SyncObserver>) {
        self.observers.push(observer);
    }

    pub fn bind_clock(&mut self, clock: Arc<dyn ClockSource>) {
        self.clock = Some(clock);
        self.last_sample = None;
    }

    /// Enter Running against the bound clock
    ///
    /// Returns the new tick generation.
    pub fn start(&mut self) -> Result<u64, SyncError> {
        if self.clock.is_none() {
            return Err(SyncError::ClockSourceRequired);
        }
        self.status = SyncStatus::Running;
        self.state.is_running = true;
        self.last_sample = None;
        self.generation += 1;

        tracing::info!(
            generation = self.generation,
            paragraph = self.state.current_paragraph_index,
            "Sync engine started"
        );
        Ok(self.generation)
    }

    /// Bind `clock` and start
    pub fn start_with(&mut self, clock: Arc<dyn ClockSource>) -> Result<u64, SyncError> {
        self.bind_clock(clock);
        self.start()
    }

    /// Stop the loop, keeping all state
    pub fn pause(&mut self) {
        if self.status != SyncStatus::Running {
            return;
        }
        self.status = SyncStatus::Paused;
        self.state.is_running = false;
        self.last_sample = None;
        self.generation += 1;
        tracing::debug!(time_ms = self.state.current_time_ms, "Sync engine paused");
    }

    /// Restart the loop after [`pause`](Self::pause)
    pub fn resume(&mut self) -> Result<u64, SyncError> {
        match self.status {
            SyncStatus::Idle => Err(SyncError::NotStarted),
            SyncStatus::Running => Ok(self.generation),
            SyncStatus::Paused => {
                if self.clock.is_none() {
                    return Err(SyncError::ClockSourceRequired);
                }
                self.status = SyncStatus::Running;
                self.state.is_running = true;
                self.last_sample = None;
                self.generation += 1;
                tracing::debug!(time_ms = self.state.current_time_ms, "Sync engine resumed");
                Ok(self.generation)
            }
        }
    }

    /// Stop, drop both timelines and the clock, return to Idle
    ///
    /// Bumps the generation so any pending ticker exits without touching
    /// the cleared state.
    pub fn reset(&mut self) {
        self.status = SyncStatus::Idle;
        self.state = SyncState::default();
        self.clock = None;
        self.paragraphs = ParagraphTimeline::default();
        self.words.clear();
        self.last_sample = None;
        self.generation += 1;
        tracing::debug!(generation = self.generation, "Sync engine reset");
    }

    pub fn set_paragraph_timeline(&mut self, timeline: ParagraphTimeline) {
        self.state.total_duration_ms = timeline.total_duration_ms();
        if self.state.current_paragraph_index >= timeline.len() {
            self.state.current_paragraph_index = 0;
        }
        self.paragraphs = timeline;
    }

    /// Rescale the paragraph timeline once the real total duration is known
    ///
    /// The position within the current clip is kept; only the paragraph's
    /// place on the session timeline moves.
    pub fn rescale_paragraph_timeline(&mut self, actual_duration_ms: f64) {
        let local = self.local_time_ms();
        self.paragraphs.rescale_to_actual_duration(actual_duration_ms);
        self.state.total_duration_ms = self.paragraphs.total_duration_ms();
        self.state.current_time_ms = self.clamp_time(self.paragraph_start_ms() + local);
        self.last_sample = None;
    }

    pub fn paragraph_timeline(&self) -> &ParagraphTimeline {
        &self.paragraphs
    }

    /// Install the word timeline of the current paragraph
    pub fn set_word_timeline(&mut self, words: Vec<WordBoundary>) {
        self.words = words;
        self.state.current_word_index = None;
        let local = self.local_time_ms();
        self.refresh_word_index(local);
    }

    /// Drop word data and fall back to paragraph-only tracking
    pub fn clear_word_timeline(&mut self) {
        self.words.clear();
        self.state.current_word_index = None;
    }

    pub fn word_timeline(&self) -> &[WordBoundary] {
        &self.words
    }

    /// Align the word timeline with the real duration of the current clip
    ///
    /// Rescales only the words, and only when the clip and the word timeline
    /// disagree by more than the configured tolerance. Returns whether a
    /// rescale happened.
    pub fn set_current_paragraph_duration(&mut self, actual_ms: f64) -> bool {
        let implied = implied_duration_ms(&self.words);
        if !(actual_ms > 0.0) || !(implied > 0.0) {
            return false;
        }
        if (actual_ms - implied).abs() <= self.config.word_rescale_tolerance_ms {
            return false;
        }

        let factor = actual_ms / implied;
        for word in &mut self.words {
            word.start_ms *= factor;
            word.end_ms *= factor;
        }
        tracing::debug!(
            paragraph = self.state.current_paragraph_index,
            implied_ms = implied,
            actual_ms,
            "Rescaled word timeline to clip duration"
        );
        true
    }

    /// Jump to a session-wide position
    ///
    /// Clamped to `[0, total]`. Indices are recomputed immediately and drift
    /// tracking restarts, so the jump is never read as drift.
    pub fn seek_to(&mut self, time_ms: f64) {
        let target = self.clamp_time(time_ms);
        let paragraph = self
            .paragraphs
            .paragraph_at(target)
            .unwrap_or(self.state.current_paragraph_index);
        self.seek_internal(target, paragraph);
    }

    /// Jump to the start of a paragraph
    ///
    /// Out-of-range indices clamp to the last paragraph; no-op without a
    /// paragraph timeline.
    pub fn seek_to_paragraph(&mut self, index: usize) {
        if self.paragraphs.is_empty() {
            return;
        }
        let index = index.min(self.paragraphs.len() - 1);
        let start = self.paragraphs.get(index).map(|p| p.start_ms).unwrap_or(0.0);
        self.seek_internal(start, index);
    }

    /// Move to the next paragraph when its clip starts playing
    ///
    /// Returns the new index, or `None` when already on the last paragraph.
    pub fn advance_paragraph(&mut self) -> Option<usize> {
        let next = self.state.current_paragraph_index + 1;
        let start = self.paragraphs.get(next)?.start_ms;
        self.seek_internal(start, next);
        Some(next)
    }

    fn seek_internal(&mut self, target_ms: f64, paragraph: usize) {
        if paragraph != self.state.current_paragraph_index {
            // The word timeline belonged to the previous clip
            self.words.clear();
            self.state.current_word_index = None;
            self.state.current_paragraph_index = paragraph;
        }

        self.state.current_time_ms = target_ms;
        self.state.drift_ms = 0.0;
        self.last_sample = None;

        let local = self.local_time_ms();
        self.refresh_word_index(local);
        self.emit_progress();

        tracing::debug!(time_ms = target_ms, paragraph, "Seek applied");
    }

    /// Run one reconciliation pass now
    pub fn tick(&mut self, trigger: TickTrigger) -> bool {
        self.tick_at(trigger, Instant::now())
    }

    /// Run one reconciliation pass as if the wall clock read `now`
    ///
    /// Returns `true` when the tick observed a new authoritative position and
    /// notified observers. Ticks while not Running, and repeated ticks at an
    /// unchanged clock position, do nothing observable.
    pub fn tick_at(&mut self, trigger: TickTrigger, now: Instant) -> bool {
        if self.status != SyncStatus::Running {
            return false;
        }
        let Some(clock) = self.clock.clone() else {
            return false;
        };

        let actual = clock.position_ms();
        if !actual.is_finite() {
            return false;
        }

        if let Some(last) = self.last_sample {
            if actual == last.position_ms {
                // Drift is measured from when the position last changed, so a
                // coarse-stepping clock is not read as drifting. A paused
                // player holds its position; measure from the moment it resumes.
                if clock.is_paused() {
                    self.last_sample = Some(ClockSample {
                        position_ms: actual,
                        at: now,
                    });
                }
                return false;
            }
        }

        let paragraph_start = self.paragraph_start_ms();

        match self.last_sample {
            Some(last) if !clock.is_paused() => {
                let elapsed_ms = now.saturating_duration_since(last.at).as_nanos() as f64 / 1e6;
                let expected = last.position_ms + elapsed_ms * clock.playback_rate();
                let drift = actual - expected;

                if drift.abs() > self.config.drift_threshold_ms {
                    self.drift_corrections += 1;
                    tracing::debug!(
                        drift_ms = drift,
                        ?trigger,
                        paragraph = self.state.current_paragraph_index,
                        "Drift exceeded threshold, snapping to clock"
                    );
                    self.state.current_time_ms = paragraph_start + actual;
                    self.state.drift_ms = 0.0;
                    self.refresh_word_index(actual);
                } else {
                    self.state.drift_ms = drift;
                }
            }
            _ => self.state.drift_ms = 0.0,
        }

        self.last_sample = Some(ClockSample {
            position_ms: actual,
            at: now,
        });

        self.state.current_time_ms = paragraph_start + actual;

        if !self.words.is_empty() {
            self.refresh_word_index(actual);
        }

        self.emit_progress();
        true
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Tick generation; changes on every start/pause/resume/reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of snap corrections since creation
    pub fn drift_corrections(&self) -> u64 {
        self.drift_corrections
    }

    /// Percent of the session played, 0 without a timeline
    pub fn percent_complete(&self) -> f64 {
        let total = self.state.total_duration_ms;
        if total > 0.0 {
            (self.state.current_time_ms / total * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn time_remaining_ms(&self) -> f64 {
        (self.state.total_duration_ms - self.state.current_time_ms).max(0.0)
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.config
    }

    fn clamp_time(&self, time_ms: f64) -> f64 {
        if !time_ms.is_finite() {
            return 0.0;
        }
        time_ms.clamp(0.0, self.state.total_duration_ms.max(0.0))
    }

    fn paragraph_start_ms(&self) -> f64 {
        self.paragraphs
            .get(self.state.current_paragraph_index)
            .map(|p| p.start_ms)
            .unwrap_or(0.0)
    }

    /// Position within the current clip
    fn local_time_ms(&self) -> f64 {
        (self.state.current_time_ms - self.paragraph_start_ms()).max(0.0)
    }

    fn refresh_word_index(&mut self, local_ms: f64) {
        let index = find_word_index(&self.words, local_ms);
        if index == self.state.current_word_index {
            return;
        }
        self.state.current_word_index = index;

        if let Some(word_index) = index {
            let paragraph = self.state.current_paragraph_index;
            let timestamp = self.state.current_time_ms;
            for observer in &mut self.observers {
                observer.on_word_change(paragraph, word_index, timestamp);
            }
        }
    }

    fn emit_progress(&mut self) {
        let percent = self.percent_complete();
        let remaining = format_time_remaining(self.time_remaining_ms());
        for observer in &mut self.observers {
            observer.on_progress(percent, &remaining);
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &self.status)
            .field("state", &self.state)
            .field("paragraphs", &self.paragraphs.len())
            .field("words", &self.words.len())
            .field("generation", &self.generation)
            .field("observers", &self.observers.len())
            .finish()
    }
}
