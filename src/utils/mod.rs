//! Shared helpers for model collaborators

pub mod preprocessing;

pub use preprocessing::{resize_scores, sigmoid, ModelInputBuilder};
