//! Foreground scorer implementations
//!
//! - Heuristic scorer (luminance threshold, always available)
//! - Model scorer (adapter over any `SegmentationModel`, with lazy loading)
//! - Tract model (pure Rust ONNX inference, behind the `tract` feature)

pub mod heuristic;
pub mod model;

#[cfg(feature = "tract")]
pub mod tract;

// Mock collaborators for tests
#[cfg(test)]
pub mod test_utils;

pub use self::heuristic::HeuristicScorer;
pub use self::model::{ModelHandle, ModelScorer};

#[cfg(feature = "tract")]
pub use self::tract::TractSegmentationModel;
