//! Tile extraction from RGB rasters
//!
//! Images are cut into rectangular cells in row-major order (left to right,
//! then top to bottom). Trailing pixels that do not fill a whole cell are
//! cropped away, so the number of tiles only depends on the image and tile
//! dimensions.

use crate::io::error::{Result, invalid_parameter};
use image::{RgbImage, imageops};

/// A rectangular cell cut from an image
///
/// Tiles are immutable once extracted; `image_id` identifies the owning
/// image within whatever collection it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Left edge in the owning image
    pub x: u32,
    /// Top edge in the owning image
    pub y: u32,
    /// Pixel data, exactly `width() x height()`
    pub pixels: RgbImage,
    /// Identifier of the owning image
    pub image_id: u32,
}

impl Tile {
    /// Create a tile from already-cut pixel data
    pub const fn new(x: u32, y: u32, pixels: RgbImage, image_id: u32) -> Self {
        Self {
            x,
            y,
            pixels,
            image_id,
        }
    }

    /// Tile width in pixels
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Tile height in pixels
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Tile dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Validate tile dimensions against an image
///
/// # Errors
///
/// Returns an error if either tile dimension is zero or exceeds the image
pub fn validate_tile_size(
    image_width: u32,
    image_height: u32,
    tile_width: u32,
    tile_height: u32,
) -> Result<()> {
    if tile_width == 0 || tile_height == 0 {
        return Err(invalid_parameter(
            "tile_size",
            &format!("{tile_width}x{tile_height}"),
            &"tile dimensions must be positive",
        ));
    }
    if tile_width > image_width || tile_height > image_height {
        return Err(invalid_parameter(
            "tile_size",
            &format!("{tile_width}x{tile_height}"),
            &format!("tile does not fit in a {image_width}x{image_height} image"),
        ));
    }
    Ok(())
}

/// Cut an image into non-overlapping tiles
///
/// Yields `floor(width / tile_width) * floor(height / tile_height)` tiles,
/// each exactly `tile_width x tile_height`.
///
/// # Errors
///
/// Returns an error if the tile size is zero or larger than the image
pub fn extract(
    image: &RgbImage,
    image_id: u32,
    tile_width: u32,
    tile_height: u32,
) -> Result<Vec<Tile>> {
    extract_strided(image, image_id, tile_width, tile_height, tile_width, tile_height)
}

/// Cut an image into tiles whose origins lie on a stride lattice
///
/// Every window of `tile_width x tile_height` starting at a multiple of the
/// stride and fitting entirely inside the image is returned, row-major.
/// Strides smaller than the tile size produce overlapping tiles.
///
/// # Errors
///
/// Returns an error if the tile size or stride is zero, or the tile is
/// larger than the image
pub fn extract_strided(
    image: &RgbImage,
    image_id: u32,
    tile_width: u32,
    tile_height: u32,
    stride_x: u32,
    stride_y: u32,
) -> Result<Vec<Tile>> {
    let (width, height) = image.dimensions();
    validate_tile_size(width, height, tile_width, tile_height)?;
    if stride_x == 0 || stride_y == 0 {
        return Err(invalid_parameter(
            "stride",
            &format!("{stride_x}x{stride_y}"),
            &"stride must be positive",
        ));
    }

    let columns = (width - tile_width) / stride_x + 1;
    let rows = (height - tile_height) / stride_y + 1;

    let mut tiles = Vec::with_capacity((columns * rows) as usize);
    for row in 0..rows {
        for col in 0..columns {
            let x = col * stride_x;
            let y = row * stride_y;
            let pixels = imageops::crop_imm(image, x, y, tile_width, tile_height).to_image();
            tiles.push(Tile::new(x, y, pixels, image_id));
        }
    }

    Ok(tiles)
}

/// Count the tiles [`extract_strided`] would produce without cutting them
pub const fn strided_tile_count(
    image_width: u32,
    image_height: u32,
    tile_width: u32,
    tile_height: u32,
    stride_x: u32,
    stride_y: u32,
) -> usize {
    if tile_width == 0
        || tile_height == 0
        || stride_x == 0
        || stride_y == 0
        || tile_width > image_width
        || tile_height > image_height
    {
        return 0;
    }
    let columns = (image_width - tile_width) / stride_x + 1;
    let rows = (image_height - tile_height) / stride_y + 1;
    columns as usize * rows as usize
}
