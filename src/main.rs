use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use livescribe_lib::asr::{is_supported_locale, Pacing, ScriptedRecognizer};
use livescribe_lib::translation::{DisabledTranslator, QwenTranslator};
use livescribe_lib::{
    export_playback, init_logging, AsrEvent, HeuristicMergeAdvisor, PartialResult,
    SegmentationController, SessionEvent, SettingsStore, Translator,
};

#[derive(Parser)]
#[command(
    name = "livescribe",
    version,
    about = "Segment and translate recorded speech recognizer output"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSONL file of partial results and print the final segments
    Replay {
        /// One partial result per line, or {"error": "..."} for a recognizer error
        input: PathBuf,

        #[arg(long)]
        settings: Option<PathBuf>,

        /// Recognizer locale, overrides the settings file
        #[arg(long)]
        locale: Option<String>,

        #[arg(long, value_enum, default_value_t = Pace::Immediate)]
        pace: Pace,

        /// Translate everything into this language code
        #[arg(long)]
        target_language: Option<String>,

        /// Print playback timeline entries instead of raw segments
        #[arg(long)]
        playback: bool,
    },
    /// Write a settings file filled with the defaults
    InitSettings { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Pace {
    Immediate,
    Realtime,
}

impl From<Pace> for Pacing {
    fn from(pace: Pace) -> Self {
        match pace {
            Pace::Immediate => Pacing::Immediate,
            Pace::Realtime => Pacing::Realtime,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptLine {
    Error { error: String },
    Partial(PartialResult),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    match Cli::parse().command {
        Command::Replay {
            input,
            settings,
            locale,
            pace,
            target_language,
            playback,
        } => {
            replay(
                input,
                settings,
                locale,
                pace,
                target_language,
                playback,
            )
            .await
        }
        Command::InitSettings { path } => {
            let store = SettingsStore::new(&path)?;
            store.save()?;
            info!("wrote settings to {}", path.display());
            Ok(())
        }
    }
}

fn load_script(path: &Path) -> Result<Vec<AsrEvent>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script from {}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let parsed: ScriptLine = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid script line", path.display(), index + 1))?;
            Ok(match parsed {
                ScriptLine::Error { error } => AsrEvent::Error(error),
                ScriptLine::Partial(result) => AsrEvent::Partial(result),
            })
        })
        .collect()
}

/// Move recorded timestamps so the first result lands at `now`. The session
/// timers run on the wall clock and would otherwise see a stale recording as
/// long overdue.
fn shift_to(script: &mut [AsrEvent], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let first = script.iter().find_map(|event| match event {
        AsrEvent::Partial(result) => Some(result.received_at),
        AsrEvent::Error(_) => None,
    })?;
    let offset = now - first;

    let mut last = first + offset;
    for event in script.iter_mut() {
        if let AsrEvent::Partial(result) = event {
            result.received_at = result.received_at + offset;
            last = last.max(result.received_at);
        }
    }
    Some(last)
}

fn build_translator(store: Option<&SettingsStore>) -> Arc<dyn Translator> {
    let mut translator = QwenTranslator::from_env();
    if !translator.has_api_key() {
        warn!("DASHSCOPE_API_KEY not set, segments will not be translated");
        return Arc::new(DisabledTranslator);
    }

    if let Some(settings) = store.map(SettingsStore::get) {
        if let Some(endpoint) = settings.translation.endpoint {
            translator = translator.with_endpoint(endpoint);
        }
        if let Some(model) = settings.translation.model {
            translator = translator.with_model(model);
        }
    }
    Arc::new(translator)
}

async fn replay(
    input: PathBuf,
    settings_path: Option<PathBuf>,
    locale: Option<String>,
    pace: Pace,
    target_language: Option<String>,
    playback: bool,
) -> Result<()> {
    let settings_store = settings_path.map(SettingsStore::new).transpose()?;
    let settings = settings_store
        .as_ref()
        .map(SettingsStore::get)
        .unwrap_or_default();

    let locale = locale.unwrap_or_else(|| settings.locale.clone());
    if !is_supported_locale(&locale) {
        bail!("unsupported locale '{}'", locale);
    }

    let mut script = load_script(&input)?;
    let last_at = shift_to(&mut script, Utc::now());
    info!("replaying {} recognizer events from {}", script.len(), input.display());

    let recognizer = ScriptedRecognizer::new(script).with_pacing(pace.into());
    let config = settings.segmentation.clone();
    let max_segment_duration = config.max_segment_duration();

    let controller = SegmentationController::new(
        Arc::new(recognizer),
        build_translator(settings_store.as_ref()),
        Arc::new(HeuristicMergeAdvisor),
        config,
    )
    .with_locale(locale)
    .with_target_language(target_language.or(settings.translation.target_language));

    let mut events = controller.subscribe();
    controller.start().await?;

    loop {
        match events.recv().await {
            Ok(SessionEvent::InputClosed) => break,
            Ok(SessionEvent::SegmentAppended { segment, signal }) => {
                info!("[{}] {}", signal.as_str(), segment.text);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!("skipped {} session events", skipped),
            Err(RecvError::Closed) => break,
        }
    }

    // Nothing more will arrive; push the clock far enough that the trailing
    // text is cut by the pause fallback or the forced timeout.
    let flush_at = last_at.unwrap_or_else(Utc::now).max(Utc::now()) + max_segment_duration;
    controller.check_boundaries_at(flush_at).await?;
    controller
        .check_boundaries_at(flush_at + max_segment_duration)
        .await?;

    controller.drain_translations().await;
    let summary = controller.stop().await;
    controller.drain_translations().await;

    if let Some(summary) = summary {
        info!(
            "session {}: {} live segments, {} after merge",
            summary.id, summary.live_segment_count, summary.final_segment_count
        );
    }

    let segments = controller.segments().await;
    let output = if playback {
        serde_json::to_string_pretty(&export_playback(&segments))?
    } else {
        serde_json::to_string_pretty(&segments)?
    };
    println!("{output}");
    Ok(())
}
