//! Error conditions and boundary cases across the public API

mod common;

use bgcutout::{
    segment_bytes, segment_from_reader, BinaryMask, BoundingBox, BoundingBoxExtractor,
    ChannelLayout, ModelConfig, ModelScorer, OutputFormatHandler, PixelBuffer, Result, ScoreMap,
    ScorerKind, SegmentationConfig, SegmentationError, SegmentationModel, SegmentationPipeline,
};
use common::{canvas_with_block, png_bytes, WHITE};
use image::RgbImage;
use ndarray::Array2;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_empty_and_garbage_input() {
    let config = SegmentationConfig::default();

    let err = segment_bytes(&[], &config).unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
    assert!(err.is_client_error());

    let err = segment_bytes(b"definitely not an image", &config).unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
    assert!(err.to_string().contains("23 bytes"));
}

#[test]
fn test_truncated_png() {
    let bytes = png_bytes(&canvas_with_block(16, 16, (2, 2, 4, 4)));
    let truncated = &bytes[..bytes.len() / 2];

    let err = segment_bytes(truncated, &SegmentationConfig::default()).unwrap_err();
    assert_eq!(err.kind(), "decode_error");
}

#[test]
fn test_zero_dimension_buffers_are_rejected() {
    assert!(PixelBuffer::new(vec![], 0, 4, ChannelLayout::Rgb).is_err());
    assert!(PixelBuffer::new(vec![0; 12], 2, 2, ChannelLayout::Rgba).is_err());
    assert!(ScoreMap::new(Array2::zeros((0, 3))).is_err());
    assert!(BinaryMask::new(vec![0; 4], (0, 4)).is_err());
    assert!(BinaryMask::new(vec![7; 4], (2, 2)).is_err());
}

#[test]
fn test_out_of_range_scores_are_rejected() {
    assert!(ScoreMap::new(Array2::from_elem((2, 2), 1.5)).is_err());
    assert!(ScoreMap::new(Array2::from_elem((2, 2), f32::NAN)).is_err());
    assert!(ScoreMap::filled(2, 2, 1.0).is_ok());
}

#[test]
fn test_single_pixel_images() {
    let config = SegmentationConfig::default();

    let white = segment_bytes(&png_bytes(&RgbImage::from_pixel(1, 1, WHITE)), &config).unwrap();
    assert_eq!(white.bounding_box, BoundingBox::new(0, 0, 1, 1));

    let black = canvas_with_block(1, 1, (0, 0, 1, 1));
    let black = segment_bytes(&png_bytes(&black), &config).unwrap();
    assert_eq!(black.bounding_box, BoundingBox::new(0, 0, 1, 1));
}

#[test]
fn test_subject_touching_every_border() {
    let img = canvas_with_block(8, 5, (0, 0, 8, 5));
    let result = segment_bytes(&png_bytes(&img), &SegmentationConfig::default()).unwrap();
    assert_eq!(result.bounding_box, BoundingBox::full(8, 5));
}

#[test]
fn test_equal_regions_pick_first_in_raster_order() {
    let mask = BinaryMask::from_fn(9, 4, |x, y| (y == 2 && x < 3) || (y == 0 && x >= 6)).unwrap();
    assert_eq!(BoundingBoxExtractor::extract(&mask), BoundingBox::new(6, 0, 3, 1));
}

#[test]
fn test_invalid_configuration() {
    let err = SegmentationConfig::builder()
        .mask_threshold(-0.5)
        .build()
        .unwrap_err();
    assert!(matches!(err, SegmentationError::InvalidConfig(_)));

    let model_without_path = SegmentationConfig {
        scorer: ScorerKind::Model,
        ..SegmentationConfig::default()
    };
    assert!(SegmentationPipeline::new(model_without_path).is_err());

    let mut model = ModelConfig::new("m.onnx");
    model.input_size = (0, 0);
    assert!(SegmentationConfig::builder().model(model).build().is_err());
}

#[cfg(feature = "tract")]
#[test]
fn test_missing_model_file_fails_on_first_request() {
    let dir = TempDir::new().unwrap();
    let config = SegmentationConfig::builder()
        .model(ModelConfig::new(dir.path().join("absent.onnx")))
        .build()
        .unwrap();

    // the model is loaded lazily, so construction succeeds
    let pipeline = SegmentationPipeline::new(config).unwrap();
    let img = canvas_with_block(4, 4, (1, 1, 2, 2));

    let err = pipeline.process_bytes(&png_bytes(&img)).unwrap_err();
    assert!(matches!(err, SegmentationError::Model(_)));
    assert!(err.to_string().contains("absent.onnx"));
}

struct BrokenModel;

impl SegmentationModel for BrokenModel {
    fn name(&self) -> &str {
        "broken"
    }

    fn segment(&self, _rgb: &PixelBuffer) -> Result<Option<Array2<f32>>> {
        Err(SegmentationError::model("inference backend crashed"))
    }
}

struct EmptyModel;

impl SegmentationModel for EmptyModel {
    fn name(&self) -> &str {
        "empty"
    }

    fn segment(&self, _rgb: &PixelBuffer) -> Result<Option<Array2<f32>>> {
        Ok(None)
    }
}

#[test]
fn test_collaborator_failures_surface_as_model_errors() {
    let bytes = png_bytes(&canvas_with_block(4, 4, (1, 1, 2, 2)));

    for scorer in [ModelScorer::from_model(BrokenModel), ModelScorer::from_model(EmptyModel)] {
        let pipeline =
            SegmentationPipeline::with_scorer(SegmentationConfig::default(), Arc::new(scorer))
                .unwrap();
        let err = pipeline.process_bytes(&bytes).unwrap_err();
        assert!(matches!(err, SegmentationError::Model(_)), "{err}");
        assert!(!err.is_client_error());
    }
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let pipeline = SegmentationPipeline::new(SegmentationConfig::default()).unwrap();

    let err = pipeline.process_file(dir.path().join("nope.png")).unwrap_err();
    assert!(matches!(err, SegmentationError::Io(_)));
    assert!(err.to_string().contains("nope.png"));
}

#[test]
fn test_undecodable_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fake.png");
    std::fs::write(&path, b"plain text").unwrap();

    let pipeline = SegmentationPipeline::new(SegmentationConfig::default()).unwrap();
    let err = pipeline.process_file(&path).unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
    assert!(err.to_string().contains("fake.png"));
}

#[test]
fn test_saving_into_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let result = segment_bytes(
        &png_bytes(&canvas_with_block(4, 4, (1, 1, 2, 2))),
        &SegmentationConfig::default(),
    )
    .unwrap();

    let err = result
        .save_cutout(dir.path().join("missing/sub/cutout.png"))
        .unwrap_err();
    assert!(matches!(err, SegmentationError::Io(_)));

    result.save_cutout(dir.path().join("cutout.png")).unwrap();
    result.save_mask(dir.path().join("mask.png")).unwrap();
    assert_eq!(
        std::fs::read(dir.path().join("cutout.png")).unwrap(),
        result.cutout_png
    );
}

#[test]
fn test_invalid_base64() {
    let err = OutputFormatHandler::from_text("not*base64").unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
}

#[tokio::test]
async fn test_reader_with_garbage() {
    let reader = std::io::Cursor::new(b"GIF89a-but-not-really".to_vec());
    let err = segment_from_reader(reader, &SegmentationConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
}
