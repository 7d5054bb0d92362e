pub mod asr;
pub mod events;
pub mod export;
pub mod models;
pub mod segmentation;
pub mod session;
pub mod settings;
pub mod translation;
mod utils;

pub use asr::{AsrError, AsrEvent, AsrStream, SpeechRecognizer};
pub use events::SessionEvent;
pub use export::export_playback;
pub use models::{PartialResult, PlaybackSegment, Segment, SessionInfo, SessionPhase};
pub use segmentation::{HeuristicMergeAdvisor, MergeAdvisor, SegmentationConfig};
pub use session::{SegmentationController, SessionError};
pub use settings::{AppSettings, SettingsStore};
pub use translation::{TranslationError, Translator};

/// Initialize logging from `RUST_LOG`, defaulting to `info`. Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
