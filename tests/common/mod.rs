//! Image builders shared by the integration tests

#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// White canvas with a black rectangle at (x, y) of size w x h
pub fn canvas_with_block(width: u32, height: u32, block: (u32, u32, u32, u32)) -> RgbImage {
    let (bx, by, bw, bh) = block;
    RgbImage::from_fn(width, height, |x, y| {
        if (bx..bx + bw).contains(&x) && (by..by + bh).contains(&y) {
            BLACK
        } else {
            WHITE
        }
    })
}

/// Encode an RGB image as PNG bytes
pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Encode an RGB image as JPEG bytes
pub fn jpeg_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

/// Decode a cutout PNG
pub fn decode_rgba(png: &[u8]) -> RgbaImage {
    image::load_from_memory_with_format(png, ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}

/// Decode a mask PNG into 0/255 samples
pub fn decode_mask(png: &[u8]) -> Vec<u8> {
    image::load_from_memory_with_format(png, ImageFormat::Png)
        .unwrap()
        .to_luma8()
        .into_raw()
}
