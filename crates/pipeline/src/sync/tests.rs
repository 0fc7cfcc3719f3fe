use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;

use readalong_config::SyncConfig;
use readalong_core::{ManualClock, WordBoundary};

use super::*;
use crate::timeline::ParagraphTimeline;
use crate::SyncError;

fn words(bounds: &[(f64, f64)]) -> Vec<WordBoundary> {
    bounds
        .iter()
        .enumerate()
        .map(|(i, &(s, e))| WordBoundary::new(format!("w{i}"), s, e))
        .collect()
}

fn drain(rx: &mut UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn word_changes(events: &[SyncEvent]) -> Vec<(usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::WordChanged {
                paragraph_index,
                word_index,
                ..
            } => Some((*paragraph_index, *word_index)),
            _ => None,
        })
        .collect()
}

/// Engine over paragraphs [10, 5, 15] words in 30s, started on a manual clock
fn running_engine() -> (SyncEngine, Arc<ManualClock>, UnboundedReceiver<SyncEvent>) {
    let mut engine = SyncEngine::new(SyncConfig::default());
    let (observer, rx) = ChannelObserver::channel();
    engine.add_observer(Box::new(observer));
    engine.set_paragraph_timeline(ParagraphTimeline::from_word_counts(&[10, 5, 15], 30_000.0));

    let clock = Arc::new(ManualClock::new());
    engine.start_with(clock.clone()).unwrap();
    (engine, clock, rx)
}

#[test]
fn test_start_without_clock_is_error() {
    let mut engine = SyncEngine::new(SyncConfig::default());
    assert_eq!(engine.start(), Err(SyncError::ClockSourceRequired));
    assert_eq!(engine.status(), SyncStatus::Idle);
    assert!(!engine.state().is_running);
}

#[test]
fn test_lifecycle_transitions() {
    let (mut engine, _clock, _rx) = running_engine();
    assert_eq!(engine.status(), SyncStatus::Running);
    assert!(engine.state().is_running);

    engine.pause();
    assert_eq!(engine.status(), SyncStatus::Paused);
    assert!(!engine.state().is_running);

    engine.resume().unwrap();
    assert_eq!(engine.status(), SyncStatus::Running);

    engine.reset();
    assert_eq!(engine.status(), SyncStatus::Idle);
    assert_eq!(engine.resume(), Err(SyncError::NotStarted));
    assert!(engine.paragraph_timeline().is_empty());
    assert_eq!(engine.state(), &SyncState::default());
}

#[test]
fn test_generation_changes_on_lifecycle() {
    let (mut engine, _clock, _rx) = running_engine();
    let started = engine.generation();

    engine.pause();
    let paused = engine.generation();
    assert!(paused > started);

    let resumed = engine.resume().unwrap();
    assert!(resumed > paused);
    assert_eq!(engine.resume().unwrap(), resumed);

    engine.reset();
    assert!(engine.generation() > resumed);
}

#[test]
fn test_tick_is_noop_when_not_running() {
    let (mut engine, clock, mut rx) = running_engine();
    engine.pause();
    drain(&mut rx);

    clock.set_position_ms(5_000.0);
    assert!(!engine.tick(TickTrigger::Frame));
    assert!(drain(&mut rx).is_empty());
    assert_eq!(engine.state().current_time_ms, 0.0);
}

#[test]
fn test_tick_follows_clock_and_resolves_words() {
    let (mut engine, clock, mut rx) = running_engine();
    engine.set_word_timeline(words(&[(0.0, 500.0), (900.0, 1300.0), (1300.0, 1800.0)]));
    drain(&mut rx);

    let t0 = Instant::now();
    clock.set_position_ms(100.0);
    assert!(engine.tick_at(TickTrigger::Frame, t0));
    assert_eq!(engine.state().current_word_index, Some(0));

    clock.set_position_ms(700.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(600));
    assert_eq!(engine.state().current_word_index, Some(0));

    clock.set_position_ms(1000.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(900));
    assert_eq!(engine.state().current_word_index, Some(1));
    assert_eq!(engine.state().current_time_ms, 1000.0);

    let events = drain(&mut rx);
    assert_eq!(word_changes(&events), vec![(0, 1)]);
}

#[test]
fn test_word_change_fires_once_per_change() {
    let (mut engine, clock, mut rx) = running_engine();
    engine.set_word_timeline(words(&[(0.0, 100.0), (100.0, 200.0), (200.0, 300.0)]));
    let initial = drain(&mut rx);
    assert_eq!(word_changes(&initial), vec![(0, 0)]);

    let t0 = Instant::now();
    for step in 1..=25 {
        clock.set_position_ms(step as f64 * 10.0);
        engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(step * 10));
    }

    let events = drain(&mut rx);
    assert_eq!(word_changes(&events), vec![(0, 1), (0, 2)]);
}

#[test]
fn test_redundant_trigger_is_idempotent() {
    let (mut engine, clock, mut rx) = running_engine();
    drain(&mut rx);

    let t0 = Instant::now();
    clock.set_position_ms(250.0);
    assert!(engine.tick_at(TickTrigger::Frame, t0));
    assert!(!engine.tick_at(TickTrigger::TimeUpdate, t0 + Duration::from_millis(2)));

    let progress = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::Progress { .. }))
        .count();
    assert_eq!(progress, 1);
}

#[test]
fn test_exact_advance_has_no_drift() {
    let (mut engine, clock, _rx) = running_engine();
    clock.set_rate(1.5);

    let t0 = Instant::now();
    clock.set_position_ms(1_000.0);
    engine.tick_at(TickTrigger::Frame, t0);

    for step in 1..=10u64 {
        clock.advance_ms(16.0 * 1.5);
        engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(16 * step));
        assert!(engine.state().drift_ms.abs() < 1e-6, "step {step}");
    }
    assert_eq!(engine.drift_corrections(), 0);
}

#[test]
fn test_small_drift_is_recorded() {
    let (mut engine, clock, _rx) = running_engine();

    let t0 = Instant::now();
    clock.set_position_ms(1_000.0);
    engine.tick_at(TickTrigger::Frame, t0);

    clock.set_position_ms(1_150.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(100));

    assert!((engine.state().drift_ms - 50.0).abs() < 1e-6);
    assert_eq!(engine.drift_corrections(), 0);
}

#[test]
fn test_jump_beyond_threshold_snaps() {
    let (mut engine, clock, mut rx) = running_engine();
    engine.set_word_timeline(words(&[(0.0, 500.0), (500.0, 1000.0), (1000.0, 5000.0)]));
    drain(&mut rx);

    let t0 = Instant::now();
    clock.set_position_ms(100.0);
    engine.tick_at(TickTrigger::Frame, t0);

    // 16ms of wall time, 2s of clock movement
    clock.set_position_ms(2_100.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(16));

    assert_eq!(engine.drift_corrections(), 1);
    assert_eq!(engine.state().drift_ms, 0.0);
    assert_eq!(engine.state().current_time_ms, 2_100.0);
    assert_eq!(engine.state().current_word_index, Some(2));

    // Corrected word fires exactly once
    let events = drain(&mut rx);
    assert_eq!(word_changes(&events), vec![(0, 2)]);
}

#[test]
fn test_paused_clock_does_not_register_drift() {
    let (mut engine, clock, _rx) = running_engine();

    let t0 = Instant::now();
    clock.set_position_ms(1_000.0);
    engine.tick_at(TickTrigger::Frame, t0);

    // Player stalls for two seconds; position stays put
    clock.set_paused(true);
    for step in 1..=10u64 {
        engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(200 * step));
    }
    clock.set_paused(false);

    clock.advance_ms(16.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(2_016));
    assert_eq!(engine.drift_corrections(), 0);
    assert!(engine.state().drift_ms.abs() < 1e-6);
}

#[test]
fn test_coarse_step_clock_is_not_drift() {
    let (mut engine, clock, _rx) = running_engine();
    let t0 = Instant::now();

    // Player reports position in 250ms steps while frames tick every 16ms
    for tick in 0..=200u64 {
        let wall_ms = tick * 16;
        clock.set_position_ms((wall_ms / 250 * 250) as f64);
        engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(wall_ms));
    }

    assert_eq!(engine.drift_corrections(), 0);
    assert_eq!(engine.state().current_time_ms, 3_000.0);
    assert!(engine.state().drift_ms.abs() < 16.0);
}

#[test]
fn test_unchanged_position_leaves_drift_sample() {
    let (mut engine, clock, _rx) = running_engine();

    let t0 = Instant::now();
    clock.set_position_ms(1_000.0);
    engine.tick_at(TickTrigger::Frame, t0);

    // Repeated reads of the same value in between do not move the baseline
    for step in 1..=5u64 {
        assert!(!engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(16 * step)));
    }

    clock.set_position_ms(1_100.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(100));
    assert!(engine.state().drift_ms.abs() < 1e-6);
    assert_eq!(engine.drift_corrections(), 0);
}

#[test]
fn test_seek_clamps_and_recomputes_indices() {
    let (mut engine, _clock, _rx) = running_engine();

    engine.seek_to(12_000.0);
    assert_eq!(engine.state().current_paragraph_index, 1);
    assert_eq!(engine.state().current_time_ms, 12_000.0);

    engine.seek_to(99_999.0);
    assert_eq!(engine.state().current_time_ms, 30_000.0);
    assert_eq!(engine.state().current_paragraph_index, 2);
    assert_eq!(engine.percent_complete(), 100.0);

    engine.seek_to(-50.0);
    assert_eq!(engine.state().current_time_ms, 0.0);
    assert_eq!(engine.state().current_paragraph_index, 0);
}

#[test]
fn test_seek_within_paragraph_updates_word_synchronously() {
    let (mut engine, _clock, mut rx) = running_engine();
    engine.set_word_timeline(words(&[(0.0, 500.0), (900.0, 1300.0)]));
    drain(&mut rx);

    engine.seek_to(1_000.0);
    assert_eq!(engine.state().current_word_index, Some(1));
    assert_eq!(word_changes(&drain(&mut rx)), vec![(0, 1)]);
}

#[test]
fn test_seek_resets_drift_tracking() {
    let (mut engine, clock, _rx) = running_engine();

    let t0 = Instant::now();
    clock.set_position_ms(1_000.0);
    engine.tick_at(TickTrigger::Frame, t0);

    engine.seek_to(8_000.0);
    clock.set_position_ms(8_000.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(16));

    assert_eq!(engine.drift_corrections(), 0);
    assert_eq!(engine.state().current_time_ms, 8_000.0);
}

#[test]
fn test_seek_to_other_paragraph_clears_words() {
    let (mut engine, _clock, _rx) = running_engine();
    engine.set_word_timeline(words(&[(0.0, 500.0)]));

    engine.seek_to_paragraph(2);
    assert_eq!(engine.state().current_paragraph_index, 2);
    assert_eq!(engine.state().current_time_ms, 15_000.0);
    assert!(engine.word_timeline().is_empty());
    assert_eq!(engine.state().current_word_index, None);

    engine.seek_to_paragraph(42);
    assert_eq!(engine.state().current_paragraph_index, 2);
}

#[test]
fn test_loop_never_advances_paragraph() {
    let (mut engine, clock, _rx) = running_engine();

    let t0 = Instant::now();
    clock.set_position_ms(10_000.0);
    engine.tick_at(TickTrigger::Frame, t0);
    clock.set_position_ms(14_000.0);
    engine.tick_at(TickTrigger::Frame, t0 + Duration::from_millis(4_000));

    // Clip position runs past the paragraph's estimated end
    assert_eq!(engine.state().current_paragraph_index, 0);
    assert_eq!(engine.state().current_time_ms, 14_000.0);
}

#[test]
fn test_advance_paragraph_uses_clip_relative_time() {
    let (mut engine, clock, _rx) = running_engine();

    assert_eq!(engine.advance_paragraph(), Some(1));
    assert_eq!(engine.state().current_time_ms, 10_000.0);

    engine.set_word_timeline(words(&[(0.0, 400.0), (400.0, 900.0)]));
    clock.set_position_ms(500.0);
    engine.tick(TickTrigger::Manual);
    assert_eq!(engine.state().current_time_ms, 10_500.0);
    assert_eq!(engine.state().current_word_index, Some(1));

    assert_eq!(engine.advance_paragraph(), Some(2));
    assert_eq!(engine.advance_paragraph(), None);
    assert_eq!(engine.state().current_paragraph_index, 2);
}

#[test]
fn test_clear_word_timeline_degrades_to_paragraph_only() {
    let (mut engine, clock, mut rx) = running_engine();
    engine.set_word_timeline(words(&[(0.0, 500.0), (500.0, 1000.0)]));
    engine.clear_word_timeline();
    drain(&mut rx);

    clock.set_position_ms(700.0);
    assert!(engine.tick(TickTrigger::Frame));
    assert_eq!(engine.state().current_word_index, None);

    let events = drain(&mut rx);
    assert!(word_changes(&events).is_empty());
    assert!(events.iter().any(|e| matches!(e, SyncEvent::Progress { .. })));
}

#[test]
fn test_clip_duration_rescales_words_only() {
    let (mut engine, _clock, _rx) = running_engine();
    engine.set_word_timeline(words(&[(0.0, 1000.0), (1000.0, 2000.0)]));
    let paragraphs_before = engine.paragraph_timeline().clone();

    // Within tolerance: untouched
    assert!(!engine.set_current_paragraph_duration(2_080.0));
    assert_eq!(engine.word_timeline()[1].end_ms, 2_000.0);

    assert!(engine.set_current_paragraph_duration(3_000.0));
    let w = engine.word_timeline();
    assert_eq!(w[0].end_ms, 1_500.0);
    assert_eq!(w[1].start_ms, 1_500.0);
    assert_eq!(w[1].end_ms, 3_000.0);
    assert_eq!(engine.paragraph_timeline(), &paragraphs_before);
}

#[test]
fn test_clip_duration_without_words_is_noop() {
    let (mut engine, _clock, _rx) = running_engine();
    assert!(!engine.set_current_paragraph_duration(5_000.0));
}

#[test]
fn test_progress_reports_percent_and_remaining() {
    let (mut engine, clock, mut rx) = running_engine();
    drain(&mut rx);

    clock.set_position_ms(7_500.0);
    engine.tick(TickTrigger::Frame);

    let events = drain(&mut rx);
    assert_eq!(
        events.last(),
        Some(&SyncEvent::Progress {
            percent_complete: 25.0,
            time_remaining: "0:23".to_string()
        })
    );
}

#[test]
fn test_empty_timelines_are_safe() {
    let mut engine = SyncEngine::new(SyncConfig::default());
    let clock = Arc::new(ManualClock::new());
    engine.start_with(clock.clone()).unwrap();

    clock.set_position_ms(1_234.0);
    engine.tick(TickTrigger::Frame);
    engine.seek_to(500.0);
    engine.seek_to_paragraph(3);

    assert_eq!(engine.percent_complete(), 0.0);
    assert_eq!(engine.state().current_word_index, None);
    assert_eq!(engine.state().current_paragraph_index, 0);
    assert_eq!(engine.advance_paragraph(), None);
}

#[test]
fn test_rescale_paragraph_timeline_updates_total() {
    let (mut engine, _clock, _rx) = running_engine();
    engine.rescale_paragraph_timeline(36_000.0);
    assert_eq!(engine.state().total_duration_ms, 36_000.0);
    assert_eq!(engine.paragraph_timeline().entries()[2].end_ms, 36_000.0);
}

#[test]
fn test_rescale_keeps_clip_position() {
    let (mut engine, _clock, _rx) = running_engine();
    engine.seek_to(11_000.0);
    assert_eq!(engine.state().current_paragraph_index, 1);

    // Paragraph 1 moves from 10s to 12s; we stay 1s into its clip
    engine.rescale_paragraph_timeline(36_000.0);
    assert!((engine.state().current_time_ms - 13_000.0).abs() < 1e-6);
    assert_eq!(engine.state().current_paragraph_index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticker_drives_engine_until_generation_changes() {
    let (engine, clock, mut rx) = running_engine();
    let engine = shared(engine);
    drain(&mut rx);

    let handle = spawn_ticker(engine.clone(), Duration::from_millis(16), None);

    clock.set_position_ms(3_000.0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.lock().state().current_time_ms, 3_000.0);

    engine.lock().reset();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.is_finished());

    // Nothing was processed against the reset state
    assert_eq!(engine.lock().state(), &SyncState::default());
}

#[tokio::test(start_paused = true)]
async fn test_ticker_reacts_to_time_updates() {
    let (engine, clock, _rx) = running_engine();
    let engine = shared(engine);
    let (tx, rx) = tokio::sync::watch::channel(0.0);

    // Frame ticks effectively disabled; only time updates drive the engine
    let handle = spawn_ticker(engine.clone(), Duration::from_secs(3600), Some(rx));
    tokio::task::yield_now().await;

    clock.set_position_ms(4_200.0);
    tx.send(4_200.0).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(engine.lock().state().current_time_ms, 4_200.0);

    engine.lock().pause();
    tx.send(4_300.0).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(handle.is_finished());
}
