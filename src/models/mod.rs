pub mod partial;
pub mod playback;
pub mod segment;
pub mod session;

pub use partial::{PartialResult, WordSpan};
pub use playback::PlaybackSegment;
pub use segment::{Segment, TranscriptionQuality};
pub use session::{SessionInfo, SessionPhase};
