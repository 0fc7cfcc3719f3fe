//! Playback session for one text

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use readalong_cache::{cache_key, AudioSegment, AudioSegmentCache, CacheStats, SegmentMetadata};
use readalong_config::Settings;
use readalong_core::{implied_duration_ms, normalize_word_timings, ClockSource, Synthesizer};
use readalong_pipeline::{
    count_words, estimate_duration_ms, shared, spawn_ticker, ParagraphTimeline, SharedSyncEngine,
    SyncEngine, SyncState,
};

use crate::events::{BroadcastObserver, SessionEvent, SessionState};
use crate::SessionError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where a seek landed
#[derive(Debug, Clone)]
pub struct SeekOutcome {
    pub paragraph_index: usize,
    /// Position the host should seek its clip to (ms)
    pub clip_offset_ms: f64,
    /// New clip to load when the seek crossed into another paragraph
    pub segment: Option<Arc<AudioSegment>>,
}

#[derive(Debug, Default)]
struct Document {
    paragraphs: Vec<String>,
    voice: String,
    /// Real clip durations as they become known
    clip_durations: Vec<Option<f64>>,
    rescaled: bool,
}

/// Read-along session
///
/// One session plays one document. The cache may be shared between sessions;
/// the sync engine and its ticker belong to this session alone.
pub struct ReadAlongSession {
    session_id: String,
    settings: Settings,
    playback_rate: f64,
    cache: Arc<AudioSegmentCache>,
    synthesizer: RwLock<Arc<dyn Synthesizer>>,
    engine: SharedSyncEngine,
    document: RwLock<Document>,
    state: RwLock<SessionState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    time_updates: Mutex<Option<watch::Receiver<f64>>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl ReadAlongSession {
    /// Create a session
    pub fn new(
        session_id: impl Into<String>,
        settings: &Settings,
        cache: Arc<AudioSegmentCache>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut engine = SyncEngine::new(settings.sync.clone());
        engine.add_observer(Box::new(BroadcastObserver::new(event_tx.clone())));

        Self {
            session_id: session_id.into(),
            settings: settings.clone(),
            playback_rate: 1.0,
            cache,
            synthesizer: RwLock::new(synthesizer),
            engine: shared(engine),
            document: RwLock::new(Document::default()),
            state: RwLock::new(SessionState::Idle),
            ticker: Mutex::new(None),
            time_updates: Mutex::new(None),
            event_tx,
        }
    }

    /// Playback rate used for duration estimates
    pub fn with_playback_rate(mut self, rate: f64) -> Self {
        if rate > 0.0 {
            self.playback_rate = rate;
        }
        self
    }

    /// Feed the ticker from the host's time-update signal as well as frames
    pub fn with_time_updates(self, rx: watch::Receiver<f64>) -> Self {
        *self.time_updates.lock() = Some(rx);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn sync_state(&self) -> SyncState {
        self.engine.lock().state().clone()
    }

    pub fn paragraph_timeline(&self) -> ParagraphTimeline {
        self.engine.lock().paragraph_timeline().clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn provider_id(&self) -> String {
        self.synthesizer.read().provider_id().to_string()
    }

    pub fn paragraph_count(&self) -> usize {
        self.document.read().paragraphs.len()
    }

    /// Load a document and build its estimated paragraph timeline
    ///
    /// Anything already playing is stopped first.
    pub fn load<S: AsRef<str>>(&self, paragraphs: &[S], voice: impl Into<String>) {
        self.stop_ticker();

        let paragraphs: Vec<String> = paragraphs.iter().map(|p| p.as_ref().to_string()).collect();
        let counts: Vec<usize> = paragraphs.iter().map(|p| count_words(p)).collect();
        let estimate = estimate_duration_ms(
            counts.iter().sum(),
            self.settings.sync.words_per_minute,
            self.playback_rate,
        );
        let timeline = ParagraphTimeline::from_word_counts(&counts, estimate);

        {
            let mut engine = self.engine.lock();
            engine.reset();
            engine.set_paragraph_timeline(timeline);
        }

        {
            let mut document = self.document.write();
            document.clip_durations = vec![None; paragraphs.len()];
            document.paragraphs = paragraphs;
            document.voice = voice.into();
            document.rescaled = false;
        }

        tracing::info!(
            session_id = %self.session_id,
            paragraphs = counts.len(),
            estimate_ms = estimate,
            "Document loaded"
        );
        self.set_state(SessionState::Ready);
    }

    /// Fetch the clip for a paragraph, synthesizing on a cache miss
    ///
    /// A clip too large for the cache is still returned, just not stored.
    pub async fn prepare_paragraph(&self, index: usize) -> Result<Arc<AudioSegment>, SessionError> {
        let (text, voice) = {
            let document = self.document.read();
            if document.paragraphs.is_empty() {
                return Err(SessionError::NotLoaded);
            }
            let text = document
                .paragraphs
                .get(index)
                .cloned()
                .ok_or(SessionError::ParagraphOutOfRange {
                    index,
                    len: document.paragraphs.len(),
                })?;
            (text, document.voice.clone())
        };

        let synthesizer = self.synthesizer.read().clone();
        let provider = synthesizer.provider_id().to_string();
        let key = cache_key(&provider, &voice, &text);

        if let Some(segment) = self.cache.get(&key) {
            tracing::debug!(key = %key, paragraph = index, "Segment cache hit");
            let _ = self.event_tx.send(SessionEvent::CacheHit { key });
            self.record_clip_duration(index, segment.duration_ms);
            return Ok(segment);
        }

        let _ = self.event_tx.send(SessionEvent::CacheMiss { key: key.clone() });
        let started = Instant::now();
        let output = synthesizer.synthesize(&text, &voice).await?;

        let words = output
            .word_timings
            .map(normalize_word_timings)
            .filter(|w| !w.is_empty());
        let duration_ms = output.duration_ms.filter(|d| *d > 0.0).or_else(|| {
            words
                .as_deref()
                .map(implied_duration_ms)
                .filter(|d| *d > 0.0)
        });

        tracing::debug!(
            key = %key,
            paragraph = index,
            bytes = output.audio.len(),
            words = words.as_ref().map_or(0, |w| w.len()),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesized paragraph"
        );

        let mut metadata = SegmentMetadata::new(provider, voice, text);
        if let Some(words) = words {
            metadata = metadata.with_word_timings(words);
        }
        if let Some(duration_ms) = duration_ms {
            metadata = metadata.with_duration_ms(duration_ms);
        }

        let segment = if output.audio.len() as u64 > self.settings.cache.max_bytes {
            tracing::warn!(
                key = %key,
                bytes = output.audio.len(),
                "Segment exceeds cache budget, playing uncached"
            );
            Arc::new(AudioSegment::new(key, output.audio, metadata, Instant::now()))
        } else {
            self.cache.set(key, output.audio, metadata)?
        };

        self.record_clip_duration(index, duration_ms);
        Ok(segment)
    }

    /// Start (or resume) playback against the host's clock
    ///
    /// Returns the clip of the current paragraph for the host to play.
    pub async fn play(&self, clock: Arc<dyn ClockSource>) -> Result<Arc<AudioSegment>, SessionError> {
        match self.state() {
            SessionState::Idle => return Err(SessionError::NotLoaded),
            SessionState::Paused => {
                // The word timeline may have been dropped while paused (provider switch)
                let index = self.engine.lock().state().current_paragraph_index;
                let segment = self.prepare_paragraph(index).await?;
                self.install_segment(index, &segment);

                self.engine.lock().bind_clock(clock);
                self.resume()?;
                return Ok(segment);
            }
            SessionState::Finished => {
                self.engine.lock().seek_to_paragraph(0);
            }
            SessionState::Ready | SessionState::Playing => {}
        }

        let index = self.engine.lock().state().current_paragraph_index;
        let segment = self.prepare_paragraph(index).await?;
        self.install_segment(index, &segment);

        self.engine.lock().start_with(clock)?;
        self.restart_ticker();
        self.set_state(SessionState::Playing);

        tracing::info!(session_id = %self.session_id, paragraph = index, "Playback started");
        Ok(segment)
    }

    pub fn pause(&self) {
        if self.state() != SessionState::Playing {
            return;
        }
        self.engine.lock().pause();
        self.stop_ticker();
        self.set_state(SessionState::Paused);
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        if self.state() != SessionState::Paused {
            return Ok(());
        }
        self.engine.lock().resume()?;
        self.restart_ticker();
        self.set_state(SessionState::Playing);
        Ok(())
    }

    /// Stop playback and discard the document and its timelines
    pub fn stop(&self) {
        self.stop_ticker();
        self.engine.lock().reset();
        *self.document.write() = Document::default();
        tracing::info!(session_id = %self.session_id, "Playback stopped");
        self.set_state(SessionState::Idle);
    }

    /// Seek to a document-wide position
    pub async fn seek_to(&self, time_ms: f64) -> Result<SeekOutcome, SessionError> {
        self.ensure_loaded()?;
        let before = self.engine.lock().state().current_paragraph_index;
        self.engine.lock().seek_to(time_ms);
        self.finish_seek(before).await
    }

    /// Seek to the start of a paragraph
    pub async fn seek_to_paragraph(&self, index: usize) -> Result<SeekOutcome, SessionError> {
        self.ensure_loaded()?;
        let before = self.engine.lock().state().current_paragraph_index;
        self.engine.lock().seek_to_paragraph(index);
        self.finish_seek(before).await
    }

    /// The host's clip for the current paragraph finished
    ///
    /// Moves on and returns the next clip, or `None` once the last paragraph
    /// has played.
    pub async fn on_clip_ended(&self) -> Result<Option<Arc<AudioSegment>>, SessionError> {
        self.ensure_loaded()?;
        let next = self.engine.lock().advance_paragraph();

        let Some(index) = next else {
            self.stop_ticker();
            {
                let mut engine = self.engine.lock();
                let total = engine.state().total_duration_ms;
                engine.seek_to(total);
                engine.pause();
            }
            tracing::info!(session_id = %self.session_id, "Reached end of document");
            self.set_state(SessionState::Finished);
            return Ok(None);
        };

        let _ = self.event_tx.send(SessionEvent::ParagraphChanged { index });
        let segment = self.prepare_paragraph(index).await?;
        self.install_segment(index, &segment);
        Ok(Some(segment))
    }

    /// Replace the synthesizer
    ///
    /// Cached audio from the previous provider is purged and the current word
    /// timeline dropped; timings from one provider never drive another's
    /// audio. Returns the number of purged segments.
    pub fn switch_provider(&self, synthesizer: Arc<dyn Synthesizer>) -> usize {
        let previous = std::mem::replace(&mut *self.synthesizer.write(), synthesizer);
        let from = previous.provider_id().to_string();
        let to = self.provider_id();

        let purged = self.cache.clear_for_provider(&from);
        self.engine.lock().clear_word_timeline();

        tracing::info!(from = %from, to = %to, purged, "Switched synthesis provider");
        let _ = self.event_tx.send(SessionEvent::ProviderSwitched { from, to, purged });
        purged
    }

    /// Rescale the paragraph timeline to a known total duration
    pub fn rescale_timeline(&self, actual_total_ms: f64) {
        if !(actual_total_ms > 0.0) {
            return;
        }
        self.engine.lock().rescale_paragraph_timeline(actual_total_ms);
        self.document.write().rescaled = true;
        tracing::debug!(total_ms = actual_total_ms, "Paragraph timeline rescaled");
        let _ = self.event_tx.send(SessionEvent::TimelineRescaled {
            total_duration_ms: actual_total_ms,
        });
    }

    async fn finish_seek(&self, before: usize) -> Result<SeekOutcome, SessionError> {
        let (paragraph_index, clip_offset_ms) = {
            let engine = self.engine.lock();
            let state = engine.state();
            let start = engine
                .paragraph_timeline()
                .get(state.current_paragraph_index)
                .map_or(0.0, |p| p.start_ms);
            (state.current_paragraph_index, (state.current_time_ms - start).max(0.0))
        };

        // Playback resumes from the seek target, not from the top
        if self.state() == SessionState::Finished {
            self.set_state(SessionState::Paused);
        }

        if paragraph_index == before {
            return Ok(SeekOutcome {
                paragraph_index,
                clip_offset_ms,
                segment: None,
            });
        }

        let _ = self.event_tx.send(SessionEvent::ParagraphChanged {
            index: paragraph_index,
        });
        let segment = self.prepare_paragraph(paragraph_index).await?;
        self.install_segment(paragraph_index, &segment);

        Ok(SeekOutcome {
            paragraph_index,
            clip_offset_ms,
            segment: Some(segment),
        })
    }

    /// Hand a clip's word timeline to the engine
    ///
    /// Skipped when playback moved on while the clip was being prepared.
    fn install_segment(&self, index: usize, segment: &AudioSegment) {
        let mut engine = self.engine.lock();
        if engine.state().current_paragraph_index != index {
            tracing::debug!(paragraph = index, "Paragraph changed during preparation");
            return;
        }

        match segment.word_timings.as_ref().filter(|w| !w.is_empty()) {
            Some(words) => {
                engine.set_word_timeline(words.clone());
                if let Some(duration_ms) = segment.duration_ms {
                    engine.set_current_paragraph_duration(duration_ms);
                }
            }
            None => engine.clear_word_timeline(),
        }
    }

    /// Remember a clip duration; rescale once every clip's length is known
    fn record_clip_duration(&self, index: usize, duration_ms: Option<f64>) {
        let total = {
            let mut document = self.document.write();
            if let (Some(slot), Some(duration)) = (document.clip_durations.get_mut(index), duration_ms) {
                *slot = Some(duration);
            }
            if document.rescaled || document.clip_durations.iter().any(Option::is_none) {
                return;
            }
            document.clip_durations.iter().flatten().sum::<f64>()
        };
        self.rescale_timeline(total);
    }

    fn ensure_loaded(&self) -> Result<(), SessionError> {
        if self.state() == SessionState::Idle {
            return Err(SessionError::NotLoaded);
        }
        Ok(())
    }

    fn restart_ticker(&self) {
        let period = self.tick_period();
        let time_updates = self.time_updates.lock().clone();
        let handle = spawn_ticker(self.engine.clone(), period, time_updates);
        if let Some(old) = self.ticker.lock().replace(handle) {
            old.abort();
        }
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }

    fn tick_period(&self) -> Duration {
        self.settings.sync.tick_interval().max(Duration::from_millis(1))
    }

    fn set_state(&self, new: SessionState) {
        let old = std::mem::replace(&mut *self.state.write(), new);
        if old != new {
            tracing::debug!(session_id = %self.session_id, ?old, ?new, "Session state changed");
            let _ = self.event_tx.send(SessionEvent::StateChanged { old, new });
        }
    }
}

impl Drop for ReadAlongSession {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
