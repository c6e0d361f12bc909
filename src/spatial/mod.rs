//! Spatial partitioning of images
//!
//! This module contains spatial-related functionality including:
//! - Tile extraction with cropping of partial cells
//! - The target grid that fixes the collage layout

/// Target grid layout
pub mod grid;
/// Tile data structures and extraction
pub mod tiles;

pub use grid::{GridCell, TargetGrid};
pub use tiles::Tile;
