//! Subject bounding box extraction
//!
//! Finds the enclosing rectangle of the largest external foreground region.
//! Foreground is 8-connected and background 4-connected, so a one-pixel
//! diagonal gap does not open a hole to the outside. Background that cannot
//! reach the image border is a hole and belongs to the region around it;
//! anything inside a hole is part of that region too. A region's area is its
//! pixel count with holes filled.

use crate::types::{BinaryMask, BoundingBox};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

const SET: Luma<u8> = Luma([255]);
const UNSET: Luma<u8> = Luma([0]);

/// One external foreground region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Enclosing rectangle
    pub bounding_box: BoundingBox,
    /// Pixel count including filled holes
    pub area: u64,
    /// First pixel of the region in raster order, as (x, y)
    pub first_pixel: (u32, u32),
}

#[derive(Debug)]
struct RegionAccumulator {
    area: u64,
    first_pixel: (u32, u32),
    min: (u32, u32),
    max: (u32, u32),
}

impl RegionAccumulator {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            first_pixel: (x, y),
            min: (x, y),
            max: (x, y),
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min = (self.min.0.min(x), self.min.1.min(y));
        self.max = (self.max.0.max(x), self.max.1.max(y));
    }

    fn into_region(self) -> Region {
        Region {
            bounding_box: BoundingBox::new(
                self.min.0,
                self.min.1,
                self.max.0 - self.min.0 + 1,
                self.max.1 - self.min.1 + 1,
            ),
            area: self.area,
            first_pixel: self.first_pixel,
        }
    }
}

/// Extracts subject bounding boxes from binary masks
pub struct BoundingBoxExtractor;

impl BoundingBoxExtractor {
    /// Bounding box of the largest external region
    ///
    /// Ties on area go to the region whose first pixel comes first in raster
    /// order. A mask without foreground yields the full image.
    ///
    /// # Examples
    /// ```rust
    /// use bgcutout::{postprocessing::BoundingBoxExtractor, BinaryMask, BoundingBox};
    ///
    /// let mask = BinaryMask::from_fn(100, 100, |x, y| (5..15).contains(&x) && (5..15).contains(&y))?;
    /// assert_eq!(BoundingBoxExtractor::extract(&mask), BoundingBox::new(5, 5, 10, 10));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn extract(mask: &BinaryMask) -> BoundingBox {
        let (width, height) = mask.dimensions();

        let best = Self::external_regions(mask)
            .into_iter()
            .fold(None::<Region>, |best, region| match best {
                Some(current) if current.area >= region.area => Some(current),
                _ => Some(region),
            });

        match best {
            Some(region) => {
                tracing::debug!(
                    bbox = %region.bounding_box,
                    area = region.area,
                    "Selected largest external region"
                );
                region.bounding_box
            },
            None => {
                tracing::debug!("No foreground found, using full image as bounding box");
                BoundingBox::full(width, height)
            },
        }
    }

    /// All external regions, ordered by their first pixel in raster order
    #[must_use]
    pub fn external_regions(mask: &BinaryMask) -> Vec<Region> {
        let stats = mask.statistics();
        if stats.foreground_pixels == 0 {
            return Vec::new();
        }

        // A fully set mask is one region. This also keeps 1x1 masks away from
        // `connected_components`, which cannot label a single-pixel image.
        if stats.background_pixels == 0 {
            let (width, height) = mask.dimensions();
            return vec![Region {
                bounding_box: BoundingBox::full(width, height),
                area: u64::from(width) * u64::from(height),
                first_pixel: (0, 0),
            }];
        }

        let filled = Self::fill_holes(mask);
        let labels = connected_components(&filled, Connectivity::Eight, UNSET);

        // Labels are dense but their numbering order is not guaranteed
        let mut slots: Vec<Option<usize>> = Vec::new();
        let mut accumulators: Vec<RegionAccumulator> = Vec::new();

        for (x, y, Luma([label])) in labels.enumerate_pixels() {
            if *label == 0 {
                continue;
            }
            let label = *label as usize;
            if slots.len() <= label {
                slots.resize(label + 1, None);
            }
            let index = *slots[label].get_or_insert_with(|| {
                accumulators.push(RegionAccumulator::new(x, y));
                accumulators.len() - 1
            });
            accumulators[index].add(x, y);
        }

        accumulators
            .into_iter()
            .map(RegionAccumulator::into_region)
            .collect()
    }

    /// Foreground plus every background pixel that cannot reach the border
    fn fill_holes(mask: &BinaryMask) -> GrayImage {
        let (width, height) = mask.dimensions();

        let background: GrayImage = ImageBuffer::from_fn(width, height, |x, y| {
            if mask.is_foreground(x, y) {
                UNSET
            } else {
                SET
            }
        });
        let background_labels = connected_components(&background, Connectivity::Four, UNSET);

        let mut touches_border: Vec<bool> = Vec::new();
        let mut mark = |label: u32| {
            let label = label as usize;
            if label == 0 {
                return;
            }
            if touches_border.len() <= label {
                touches_border.resize(label + 1, false);
            }
            touches_border[label] = true;
        };
        for x in 0..width {
            mark(background_labels.get_pixel(x, 0)[0]);
            mark(background_labels.get_pixel(x, height - 1)[0]);
        }
        for y in 0..height {
            mark(background_labels.get_pixel(0, y)[0]);
            mark(background_labels.get_pixel(width - 1, y)[0]);
        }

        ImageBuffer::from_fn(width, height, |x, y| {
            let label = background_labels.get_pixel(x, y)[0] as usize;
            let outside = label != 0 && touches_border.get(label).copied().unwrap_or(false);
            if outside {
                UNSET
            } else {
                SET
            }
        })
    }
}
