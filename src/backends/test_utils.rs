//! Test utilities and mock collaborators
//!
//! Mock implementations of [`SegmentationModel`] so the model-backed scorer
//! and the pipeline can be exercised without model files.

use crate::{
    error::{Result, SegmentationError},
    inference::SegmentationModel,
    types::PixelBuffer,
};
use ndarray::Array2;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// What the mock returns from `segment`
#[derive(Debug, Clone)]
pub enum MockOutput {
    /// Every pixel gets this value
    Constant(f32),
    /// Always this exact array, whatever the input size
    Fixed(Array2<f32>),
    /// 1.0 where the pixel's mean RGB is below 128, else 0.0
    DarkPixels,
    /// `Ok(None)`
    NoMask,
    /// One row more than the input
    WrongShape,
    /// `Err(Model)`
    Failure,
}

/// Mock segmentation model with a call counter
#[derive(Debug)]
pub struct MockSegmentationModel {
    output: MockOutput,
    calls: AtomicUsize,
}

impl MockSegmentationModel {
    #[must_use]
    pub fn new(output: MockOutput) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self::new(MockOutput::Constant(value))
    }

    #[must_use]
    pub fn fixed(scores: Array2<f32>) -> Self {
        Self::new(MockOutput::Fixed(scores))
    }

    #[must_use]
    pub fn dark_pixels() -> Self {
        Self::new(MockOutput::DarkPixels)
    }

    #[must_use]
    pub fn no_mask() -> Self {
        Self::new(MockOutput::NoMask)
    }

    #[must_use]
    pub fn wrong_shape() -> Self {
        Self::new(MockOutput::WrongShape)
    }

    #[must_use]
    pub fn failing() -> Self {
        Self::new(MockOutput::Failure)
    }

    /// Number of `segment` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn segment(&self, rgb: &PixelBuffer) -> Result<Option<Array2<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);

        match &self.output {
            MockOutput::Constant(value) => Ok(Some(Array2::from_elem((height, width), *value))),
            MockOutput::Fixed(scores) => Ok(Some(scores.clone())),
            MockOutput::DarkPixels => {
                let values = rgb
                    .pixels()
                    .map(|px| {
                        let sum: u32 = px.iter().take(3).map(|&v| u32::from(v)).sum();
                        if sum < 3 * 128 {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect();
                Array2::from_shape_vec((height, width), values)
                    .map(Some)
                    .map_err(|e| SegmentationError::model(e.to_string()))
            },
            MockOutput::NoMask => Ok(None),
            MockOutput::WrongShape => Ok(Some(Array2::zeros((height + 1, width)))),
            MockOutput::Failure => Err(SegmentationError::model("mock model failure")),
        }
    }
}

/// Initialiser for lazy handles that counts how often it runs
///
/// Fails while `failures_left` is non-zero, then succeeds with a constant
/// model.
pub fn counting_initializer(
    runs: Arc<AtomicUsize>,
    failures_left: usize,
) -> impl Fn() -> Result<Arc<dyn SegmentationModel>> + Send + Sync + 'static {
    let remaining = AtomicUsize::new(failures_left);
    move || {
        runs.fetch_add(1, Ordering::SeqCst);
        if remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SegmentationError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "model file not ready",
            )));
        }
        Ok(Arc::new(MockSegmentationModel::constant(1.0)) as Arc<dyn SegmentationModel>)
    }
}
