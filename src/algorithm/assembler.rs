//! Collage assembly from a target image and a profile
//!
//! Every target cell is described and queried independently (in parallel),
//! then matches are selected and pasted in row-major order. Placement is
//! decided by grid index, never by completion order, so repeated runs with
//! the same inputs produce identical collages.

use crate::algorithm::resolver::TileResolver;
use crate::index::profile::Profile;
use crate::io::configuration::NO_REPEAT_CANDIDATES;
use crate::io::error::{CollageError, Result, invalid_parameter};
use crate::spatial::grid::{GridCell, TargetGrid};
use bitvec::prelude::{BitVec, bitvec};
use image::{RgbImage, imageops};
use rayon::prelude::*;

/// Parameters for one collage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssembleOptions {
    /// Target cell width; the profile's tile width when unset
    pub cell_width: Option<u32>,
    /// Target cell height; the profile's tile height when unset
    pub cell_height: Option<u32>,
    /// Rank of the neighbor pasted per cell (0 = nearest)
    pub variation: usize,
    /// Number of variations in the set being written; every variation of a
    /// set ranks the same neighbor query
    pub variation_count: usize,
    /// Use every entry at most once where possible
    pub no_repeat: bool,
}

impl AssembleOptions {
    /// Neighbors requested per cell
    pub fn candidates_per_cell(&self) -> usize {
        let ranked = self.variation_count.max(self.variation + 1);
        if self.no_repeat {
            NO_REPEAT_CANDIDATES.max(ranked)
        } else {
            ranked
        }
    }
}

/// Entry chosen for one target cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Cell the entry was pasted into
    pub cell: GridCell,
    /// Insertion index of the pasted profile entry
    pub entry: usize,
    /// Descriptor distance between the cell and the entry
    pub distance: f32,
}

/// Assembled output raster together with its placements
#[derive(Debug, Clone)]
pub struct Collage {
    /// Output pixels covering the target's whole-cell extent
    pub image: RgbImage,
    /// One placement per target cell, row-major
    pub placements: Vec<Placement>,
    /// Grid dimensions as (columns, rows)
    pub grid: (u32, u32),
}

/// Rebuild a target image out of profile tiles
///
/// The collage covers the largest whole-cell extent of the target. Target
/// cells that differ in size from the profile's tiles are resized for
/// description only, and pasted tiles are resized to the cell.
///
/// # Errors
///
/// Returns an error if:
/// - The target image is empty or smaller than one cell
/// - A query fails (descriptor and index disagree on dimensionality)
/// - A matched tile cannot be resolved ([`CollageError::TileResolution`]);
///   assembly stops at the first such cell
pub fn assemble(
    target: &RgbImage,
    profile: &Profile,
    options: &AssembleOptions,
    resolver: &mut TileResolver<'_>,
) -> Result<Collage> {
    if target.width() == 0 || target.height() == 0 {
        return Err(invalid_parameter(
            "target",
            &format!("{}x{}", target.width(), target.height()),
            &"target image is empty",
        ));
    }

    let descriptor = profile.descriptor();
    let cell_width = options.cell_width.unwrap_or(descriptor.tile_width);
    let cell_height = options.cell_height.unwrap_or(descriptor.tile_height);
    let grid = TargetGrid::partition(target, cell_width, cell_height)?;

    let index = profile.index();
    let k = options.candidates_per_cell();
    let candidates: Vec<Vec<(usize, f32)>> = grid
        .tiles()
        .par_iter()
        .map(|tile| -> Result<Vec<(usize, f32)>> {
            let vector = descriptor.describe_resized(tile)?;
            let neighbors = index.query(&vector, k)?;
            Ok(neighbors
                .into_iter()
                .map(|neighbor| (neighbor.index, neighbor.distance))
                .collect())
        })
        .collect::<Result<_>>()?;

    let placements = select(&grid, &candidates, options, index.len())?;

    let (width, height) = grid.extent();
    let mut image = RgbImage::new(width, height);
    for placement in &placements {
        paste(&mut image, placement, profile, resolver, grid.cell_size())?;
    }

    log::debug!(
        "Tile cache: {} hits, {} misses; source cache: {} hits, {} misses",
        resolver.tile_stats().hits,
        resolver.tile_stats().misses,
        resolver.image_stats().hits,
        resolver.image_stats().misses
    );

    Ok(Collage {
        image,
        placements,
        grid: (grid.columns(), grid.rows()),
    })
}

fn select(
    grid: &TargetGrid,
    candidates: &[Vec<(usize, f32)>],
    options: &AssembleOptions,
    entry_count: usize,
) -> Result<Vec<Placement>> {
    let mut used: BitVec = bitvec![0; entry_count];
    let mut placements = Vec::with_capacity(grid.len());

    for (cell, neighbors) in grid.cells().zip(candidates) {
        let ranked = neighbors.get(options.variation).or_else(|| neighbors.last());
        let chosen = if options.no_repeat {
            neighbors
                .iter()
                .skip(options.variation)
                .find(|(entry, _)| !used.get(*entry).is_some_and(|bit| *bit))
                .or_else(|| neighbors.first())
        } else {
            ranked
        };

        let &(entry, distance) = chosen.ok_or_else(|| CollageError::TileResolution {
            cell: (cell.column, cell.row),
            origin: (cell.x, cell.y),
            reason: "no profile entry matched".to_string(),
        })?;
        if entry < entry_count {
            used.set(entry, true);
        }
        placements.push(Placement {
            cell,
            entry,
            distance,
        });
    }

    Ok(placements)
}

fn paste(
    image: &mut RgbImage,
    placement: &Placement,
    profile: &Profile,
    resolver: &mut TileResolver<'_>,
    (cell_width, cell_height): (u32, u32),
) -> Result<()> {
    let cell = placement.cell;
    let resolution_error = |reason: String| CollageError::TileResolution {
        cell: (cell.column, cell.row),
        origin: (cell.x, cell.y),
        reason,
    };

    let entry = profile
        .index()
        .entry(placement.entry)
        .ok_or_else(|| resolution_error(format!("entry {} is not indexed", placement.entry)))?;
    let tile = resolver
        .resolve(&entry.reference)
        .map_err(|error| resolution_error(error.to_string()))?;

    if tile.dimensions() == (cell_width, cell_height) {
        imageops::replace(image, &*tile, i64::from(cell.x), i64::from(cell.y));
    } else {
        let resized = imageops::resize(
            &*tile,
            cell_width,
            cell_height,
            imageops::FilterType::Triangle,
        );
        imageops::replace(image, &resized, i64::from(cell.x), i64::from(cell.y));
    }

    Ok(())
}
