pub mod advisor;
pub mod config;
pub mod engine;
pub mod extractor;
pub mod merge;
pub mod scoring;
pub mod signals;
pub mod state;
pub mod store;

pub use advisor::{AdvisorError, HeuristicMergeAdvisor, MergeAdvisor, MergeCandidate, MergeGroup};
pub use config::{SegmentationConfig, SegmentationStrategy};
pub use engine::SegmentationEngine;
pub use merge::PostSessionOptimizer;
pub use signals::{BoundarySignal, Trigger};
pub use state::SegmentationState;
pub use store::SegmentStore;
