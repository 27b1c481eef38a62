//! Mask postprocessing: thresholding, subject localisation and compositing

pub mod bbox;
pub mod binarize;
pub mod composite;

pub use bbox::{BoundingBoxExtractor, Region};
pub use binarize::MaskBinarizer;
pub use composite::Compositor;
