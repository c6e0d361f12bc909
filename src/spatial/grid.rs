//! Target grid layout shared by the extractor and the collage output
//!
//! The grid fixes the output raster's cell layout: cell `i` of the grid is
//! the `i`-th tile returned by [`extract`](crate::spatial::tiles::extract)
//! and is pasted back at the same origin.

use crate::io::error::Result;
use crate::spatial::tiles::{self, Tile};
use image::RgbImage;

/// Position of one cell within a [`TargetGrid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    /// Row-major index of the cell
    pub index: usize,
    /// Column of the cell
    pub column: u32,
    /// Row of the cell
    pub row: u32,
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
}

/// Row-major partition of a target image into equally sized cells
#[derive(Debug, Clone)]
pub struct TargetGrid {
    columns: u32,
    rows: u32,
    cell_width: u32,
    cell_height: u32,
    tiles: Vec<Tile>,
}

impl TargetGrid {
    /// Partition a target image, cropping trailing partial cells
    ///
    /// # Errors
    ///
    /// Returns an error if the cell size is zero or larger than the image
    pub fn partition(image: &RgbImage, cell_width: u32, cell_height: u32) -> Result<Self> {
        let tiles = tiles::extract(image, 0, cell_width, cell_height)?;
        Ok(Self {
            columns: image.width() / cell_width,
            rows: image.height() / cell_height,
            cell_width,
            cell_height,
            tiles,
        })
    }

    /// Number of cell columns
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cell rows
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Cell dimensions as (width, height)
    pub const fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    /// Pixel extent covered by whole cells, as (width, height)
    pub const fn extent(&self) -> (u32, u32) {
        (self.columns * self.cell_width, self.rows * self.cell_height)
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Target tiles in row-major order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Locate a cell by its row-major index
    pub fn cell(&self, index: usize) -> Option<GridCell> {
        if index >= self.tiles.len() || self.columns == 0 {
            return None;
        }
        let column = (index % self.columns as usize) as u32;
        let row = (index / self.columns as usize) as u32;
        Some(GridCell {
            index,
            column,
            row,
            x: column * self.cell_width,
            y: row * self.cell_height,
        })
    }

    /// Iterate over all cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.tiles.len()).filter_map(|index| self.cell(index))
    }
}
