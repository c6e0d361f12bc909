//! Profile construction from a set of source images
//!
//! Each source image is cut into tiles, every tile is described, and the
//! resulting entries are indexed in one build. Images too small to yield a
//! single tile are skipped; if nothing survives, the profile is rejected.

use crate::analysis::descriptor::DescriptorConfig;
use crate::index::forest::IndexParams;
use crate::index::profile::{Profile, validate_name};
use crate::index::profile_index::{ProfileEntry, ProfileIndex, Thumbnail, TileReference};
use crate::io::error::{CollageError, Result, invalid_parameter};
use crate::io::image::{collect_images, load_rgb};
use crate::io::progress::ProgressReporter;
use crate::spatial::tiles::{Tile, extract_strided, strided_tile_count};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Parameters for building a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherOptions {
    /// Descriptor applied to every source tile
    pub descriptor: DescriptorConfig,
    /// Projection forest parameters
    pub index: IndexParams,
    /// Horizontal distance between tile origins
    pub stride_x: u32,
    /// Vertical distance between tile origins
    pub stride_y: u32,
    /// Store tile pixels in the profile instead of source references
    pub embed_tiles: bool,
}

impl GatherOptions {
    /// Options with non-overlapping tiles and source references
    pub const fn new(descriptor: DescriptorConfig, index: IndexParams) -> Self {
        Self {
            descriptor,
            index,
            stride_x: descriptor.tile_width,
            stride_y: descriptor.tile_height,
            embed_tiles: false,
        }
    }

    /// Check the options before any image is read
    ///
    /// # Errors
    ///
    /// Returns an error if a stride is zero or the index parameters are
    /// invalid
    pub fn validate(&self) -> Result<()> {
        if self.stride_x == 0 || self.stride_y == 0 {
            return Err(invalid_parameter(
                "increment",
                &format!("{}x{}", self.stride_x, self.stride_y),
                &"crop increment must be positive",
            ));
        }
        self.index.validate()
    }
}

/// Build a profile from every supported image in a folder
///
/// # Errors
///
/// Returns an error if the folder cannot be read or [`gather`] fails
pub fn gather_folder(
    name: &str,
    folder: &Path,
    options: &GatherOptions,
    progress: &mut ProgressReporter,
) -> Result<Profile> {
    let sources = collect_images(folder)?;
    log::info!(
        "Found {} source images in {}",
        sources.len(),
        folder.display()
    );
    gather(name, &sources, options, progress)
}

/// Build a profile from an ordered list of source images
///
/// Source identifiers follow the order of the images that contributed at
/// least one tile.
///
/// # Errors
///
/// Returns an error if:
/// - The name or options are invalid
/// - A source image cannot be read or decoded
/// - No tile could be extracted from any source ([`CollageError::EmptyProfile`])
pub fn gather(
    name: &str,
    sources: &[PathBuf],
    options: &GatherOptions,
    progress: &mut ProgressReporter,
) -> Result<Profile> {
    validate_name(name)?;
    options.validate()?;

    let descriptor = options.descriptor;
    let (tile_width, tile_height) = descriptor.tile_size();
    let mut kept_sources = Vec::new();
    let mut entries = Vec::new();

    progress.start_stage("gather", sources.len());
    for path in sources {
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        progress.advance(&display_name);

        let image = load_rgb(path)?;
        let expected = strided_tile_count(
            image.width(),
            image.height(),
            tile_width,
            tile_height,
            options.stride_x,
            options.stride_y,
        );
        if expected == 0 {
            log::warn!(
                "Skipping {} ({}x{} is smaller than a {tile_width}x{tile_height} tile)",
                path.display(),
                image.width(),
                image.height()
            );
            continue;
        }

        let source_id = kept_sources.len() as u32;
        let tiles = extract_strided(
            &image,
            source_id,
            tile_width,
            tile_height,
            options.stride_x,
            options.stride_y,
        )?;

        let described: Vec<ProfileEntry> = tiles
            .par_iter()
            .map(|tile| describe_entry(&descriptor, tile, options.embed_tiles))
            .collect::<Result<_>>()?;

        log::debug!("{}: {} tiles", path.display(), described.len());
        entries.extend(described);
        kept_sources.push(path.clone());
    }
    progress.finish_stage();

    if entries.is_empty() {
        return Err(CollageError::EmptyProfile {
            name: name.to_string(),
        });
    }

    log::info!(
        "Indexing {} tiles from {} images ({} trees)",
        entries.len(),
        kept_sources.len(),
        options.index.tree_count
    );
    let index = ProfileIndex::build(entries, options.index)?;

    Profile::new(name, descriptor, kept_sources, index)
}

fn describe_entry(descriptor: &DescriptorConfig, tile: &Tile, embed: bool) -> Result<ProfileEntry> {
    let vector = descriptor.describe(tile)?;
    let reference = if embed {
        TileReference::Embedded(Thumbnail::from_image(&tile.pixels))
    } else {
        TileReference::Source {
            source: tile.image_id,
            x: tile.x,
            y: tile.y,
            width: tile.width(),
            height: tile.height(),
        }
    };
    Ok(ProfileEntry { vector, reference })
}
