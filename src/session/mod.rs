//! Session lifecycle around the segmentation engine: recognizer wiring,
//! timer loops and the stop-time merge pass.

pub mod controller;
pub mod ingest;
pub mod state;

pub use controller::{SegmentationController, SessionError};
pub use ingest::SessionClock;
