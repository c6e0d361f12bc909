//! Photographic collage builder backed by approximate nearest neighbor search
//!
//! Source images are cut into tiles, each tile is reduced to a fixed feature
//! vector, and the vectors are indexed in a forest of random projection
//! trees stored as a named profile. A target image is then rebuilt cell by
//! cell from the profile tiles whose features lie closest to each cell.

#![forbid(unsafe_code)]

/// Profile gathering, collage assembly and tile resolution
pub mod algorithm;
/// Feature descriptors computed from tile pixels
pub mod analysis;
/// Approximate nearest neighbor index and profiles
pub mod index;
/// Input/output operations, persistence and error handling
pub mod io;
/// Vector distance and hyperplane helpers
pub mod math;
/// Tile extraction and target grid layout
pub mod spatial;

pub use io::error::{CollageError, Result};
