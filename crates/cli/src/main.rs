//! Read-along playback simulator
//!
//! Plays a text file through a read-along session using offline silent
//! synthesis and a simulated media clock, logging highlight and progress
//! events as they happen.

mod silent;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use readalong_cache::AudioSegmentCache;
use readalong_config::{load_settings, Settings};
use readalong_core::{ClockSource, ManualClock};
use readalong_session::{ReadAlongSession, SessionEvent};

use crate::silent::SilentSynthesizer;

/// Simulated media clock step (wall-clock ms)
const CLOCK_STEP_MS: u64 = 50;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text file to read; paragraphs are separated by blank lines
    #[arg(long, short)]
    input: PathBuf,

    /// Voice identifier passed to the synthesizer
    #[arg(long, default_value = "default")]
    voice: String,

    /// Playback rate
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Run the simulation this many times faster than real time
    #[arg(long, default_value_t = 1.0)]
    speedup: f64,

    /// Give the silent synthesizer evenly spaced word timings
    #[arg(long)]
    word_timings: bool,

    /// Configuration environment (loads config/<env>.yaml over config/default.yaml)
    #[arg(long, env = "READALONG_ENV")]
    env: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(args.env.as_deref()).context("Failed to load settings")?;
    if args.json_logs {
        settings.observability.log_json = true;
    }
    init_tracing(&settings);

    tracing::info!("Starting readalong v{}", env!("CARGO_PKG_VERSION"));

    let paragraphs = read_paragraphs(&args.input)?;
    if paragraphs.is_empty() {
        anyhow::bail!("{} contains no text", args.input.display());
    }

    let cache = Arc::new(AudioSegmentCache::new(&settings.cache));
    let synthesizer = Arc::new(SilentSynthesizer::new(
        settings.sync.words_per_minute,
        args.word_timings,
    ));
    let session = ReadAlongSession::new(uuid::Uuid::new_v4().to_string(), &settings, cache, synthesizer)
        .with_playback_rate(args.rate);

    let events = tokio::spawn(log_events(session.subscribe()));

    session.load(&paragraphs, args.voice.as_str());

    tokio::select! {
        result = simulate_playback(&session, args.rate, args.speedup) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, stopping playback");
        }
    }

    let stats = session.cache_stats();
    tracing::info!(
        entries = stats.entries,
        total_bytes = stats.total_bytes,
        percent_full = stats.percent_full,
        hits = stats.hits,
        misses = stats.misses,
        "Segment cache"
    );

    session.stop();
    drop(session);
    let _ = tokio::time::timeout(Duration::from_secs(1), events).await;

    Ok(())
}

/// Drive the session with a simulated clock until the last clip ends
async fn simulate_playback(session: &ReadAlongSession, rate: f64, speedup: f64) -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::new());
    let speed = rate * speedup.max(0.01);
    clock.set_rate(speed);

    let mut segment = session.play(clock.clone()).await?;
    let step = Duration::from_millis(CLOCK_STEP_MS);
    let mut interval = tokio::time::interval(step);
    interval.tick().await;

    loop {
        interval.tick().await;
        clock.advance_ms(CLOCK_STEP_MS as f64 * speed);

        let clip_ms = segment.duration_ms.unwrap_or(0.0);
        if clock.position_ms() < clip_ms {
            continue;
        }

        clock.set_position_ms(0.0);
        match session.on_clip_ended().await? {
            Some(next) => segment = next,
            None => break,
        }
    }

    tracing::info!("Playback complete");
    Ok(())
}

async fn log_events(mut rx: broadcast::Receiver<SessionEvent>) {
    let mut last_decile = None;

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event logger lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            SessionEvent::Progress {
                percent_complete,
                time_remaining,
            } => {
                let decile = (percent_complete / 10.0).floor() as u32;
                if last_decile != Some(decile) {
                    last_decile = Some(decile);
                    tracing::info!(percent = percent_complete.round(), remaining = %time_remaining, "Progress");
                }
            }
            SessionEvent::WordChanged {
                paragraph_index,
                word_index,
                timestamp_ms,
            } => {
                tracing::debug!(paragraph = paragraph_index, word = word_index, timestamp_ms, "Word");
            }
            SessionEvent::ParagraphChanged { index } => {
                tracing::info!(paragraph = index, "Paragraph");
            }
            SessionEvent::StateChanged { old, new } => {
                tracing::info!(?old, ?new, "Session state");
            }
            other => tracing::debug!(event = ?other, "Session event"),
        }
    }
}

/// Split text into paragraphs on blank lines
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

fn read_paragraphs(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(split_paragraphs(&text))
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        [
            "readalong",
            "readalong_session",
            "readalong_pipeline",
            "readalong_cache",
            "readalong_core",
            "readalong_config",
        ]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
        .into()
    });

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
