//! Fixed feature descriptors for tile similarity search
//!
//! A tile is divided into an `N x N` grid of blocks and each block is
//! averaged. Luminance descriptors keep one value per block, RGB descriptors
//! keep three. The computation has no randomness: identical pixels always
//! give identical vectors.

use crate::io::error::{CollageError, Result, invalid_parameter};
use crate::spatial::tiles::Tile;
use image::{RgbImage, imageops};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channels sampled by the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    /// ITU-R 601 luma, one value per block
    Luma,
    /// Red, green and blue, three values per block
    Rgb,
}

impl ColorSpace {
    /// Values emitted per block
    pub const fn channels(self) -> usize {
        match self {
            Self::Luma => 1,
            Self::Rgb => 3,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Luma => write!(f, "luma"),
            Self::Rgb => write!(f, "rgb"),
        }
    }
}

/// Fixed-length numeric signature of a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<f32>);

impl FeatureVector {
    /// Number of components
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no components
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Components as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Descriptor parameters stored with every profile
///
/// Vectors are only comparable when computed with identical configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Width of the tiles this descriptor accepts
    pub tile_width: u32,
    /// Height of the tiles this descriptor accepts
    pub tile_height: u32,
    /// Blocks per side of the downsample grid
    pub sample_dimension: u32,
    /// Channels sampled per block
    pub color_space: ColorSpace,
}

impl DescriptorConfig {
    /// Create and validate a descriptor configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension is zero
    pub fn new(
        tile_width: u32,
        tile_height: u32,
        sample_dimension: u32,
        color_space: ColorSpace,
    ) -> Result<Self> {
        if tile_width == 0 || tile_height == 0 {
            return Err(invalid_parameter(
                "tile_size",
                &format!("{tile_width}x{tile_height}"),
                &"tile dimensions must be positive",
            ));
        }
        if sample_dimension == 0 {
            return Err(invalid_parameter(
                "sample_dimension",
                &sample_dimension,
                &"sample dimension must be positive",
            ));
        }
        Ok(Self {
            tile_width,
            tile_height,
            sample_dimension,
            color_space,
        })
    }

    /// Tile dimensions as (width, height)
    pub const fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    /// Length of every vector produced with this configuration
    pub const fn vector_len(&self) -> usize {
        let side = self.sample_dimension as usize;
        side * side * self.color_space.channels()
    }

    /// Compute the feature vector of a tile
    ///
    /// # Errors
    ///
    /// Returns [`CollageError::DescriptorConfigMismatch`] if the tile is not
    /// exactly the configured tile size
    pub fn describe(&self, tile: &Tile) -> Result<FeatureVector> {
        self.describe_pixels(&tile.pixels)
    }

    /// Compute the feature vector of raw tile pixels
    ///
    /// # Errors
    ///
    /// Returns [`CollageError::DescriptorConfigMismatch`] if the pixels are
    /// not exactly the configured tile size
    pub fn describe_pixels(&self, pixels: &RgbImage) -> Result<FeatureVector> {
        let actual = pixels.dimensions();
        if actual != self.tile_size() {
            return Err(CollageError::DescriptorConfigMismatch {
                expected: self.tile_size(),
                actual,
            });
        }

        let side = self.sample_dimension;
        let mut values = Vec::with_capacity(self.vector_len());
        for block_row in 0..side {
            let (y0, y1) = block_span(block_row, side, self.tile_height);
            for block_col in 0..side {
                let (x0, x1) = block_span(block_col, side, self.tile_width);
                let mean = block_mean(pixels, x0..x1, y0..y1);
                match self.color_space {
                    ColorSpace::Luma => values.push(luma(mean)),
                    ColorSpace::Rgb => values.extend_from_slice(&mean),
                }
            }
        }

        Ok(FeatureVector(values))
    }

    /// Describe a tile of any size by first resizing it to the configured size
    ///
    /// Used for target cells whose grid differs from the profile's tiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile has a zero dimension
    pub fn describe_resized(&self, tile: &Tile) -> Result<FeatureVector> {
        if tile.dimensions() == self.tile_size() {
            return self.describe(tile);
        }
        if tile.width() == 0 || tile.height() == 0 {
            return Err(CollageError::DescriptorConfigMismatch {
                expected: self.tile_size(),
                actual: tile.dimensions(),
            });
        }
        let resized = imageops::resize(
            &tile.pixels,
            self.tile_width,
            self.tile_height,
            imageops::FilterType::Triangle,
        );
        self.describe_pixels(&resized)
    }
}

// Block boundaries never collapse to an empty range, even when the tile is
// smaller than the sample grid.
const fn block_span(block: u32, blocks: u32, length: u32) -> (u32, u32) {
    let start = (block as u64 * length as u64 / blocks as u64) as u32;
    let end = ((block as u64 + 1) * length as u64 / blocks as u64) as u32;
    let start = if start >= length { length.saturating_sub(1) } else { start };
    let end = if end <= start { start + 1 } else { end };
    (start, end)
}

fn block_mean(pixels: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> [f32; 3] {
    let mut sums = [0_u64; 3];
    let mut count = 0_u64;
    for y in ys {
        for x in xs.clone() {
            if let Some(pixel) = pixels.get_pixel_checked(x, y) {
                for (sum, &channel) in sums.iter_mut().zip(pixel.0.iter()) {
                    *sum += u64::from(channel);
                }
                count += 1;
            }
        }
    }
    let count = count.max(1) as f32;
    sums.map(|sum| sum as f32 / count)
}

fn luma(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}
