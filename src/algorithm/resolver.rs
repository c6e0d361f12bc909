//! Turns tile references back into pixel data
//!
//! Source images are decoded at most once while they stay in the image
//! cache, and cropped tiles are kept in a second cache keyed by region.
//! Embedded thumbnails already carry their pixels and bypass both caches.
//! Both caches are bounded so large profiles do not pin every source image
//! in memory.

use crate::algorithm::cache::{BoundedCache, CacheStats};
use crate::index::profile::Profile;
use crate::index::profile_index::TileReference;
use crate::io::configuration::{SOURCE_CACHE_CAPACITY, TILE_CACHE_CAPACITY};
use crate::io::error::{Result, invalid_parameter};
use crate::io::image::load_rgb;
use image::{RgbImage, imageops};
use std::path::PathBuf;
use std::sync::Arc;

// Cache key for a cropped source region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SourceRegion {
    source: u32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Resolves references against one profile's source images
pub struct TileResolver<'p> {
    sources: &'p [PathBuf],
    images: BoundedCache<u32, Arc<RgbImage>>,
    tiles: BoundedCache<SourceRegion, Arc<RgbImage>>,
}

impl<'p> TileResolver<'p> {
    /// Create a resolver with explicit cache capacities
    pub fn new(sources: &'p [PathBuf], image_capacity: usize, tile_capacity: usize) -> Self {
        Self {
            sources,
            images: BoundedCache::new(image_capacity),
            tiles: BoundedCache::new(tile_capacity),
        }
    }

    /// Create a resolver with the default cache capacities
    pub fn for_profile(profile: &'p Profile) -> Self {
        Self::new(profile.sources(), SOURCE_CACHE_CAPACITY, TILE_CACHE_CAPACITY)
    }

    /// Pixel data for a reference
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The reference names a source image the profile does not list
    /// - The source image cannot be read or decoded
    /// - The region lies outside the source image
    /// - An embedded thumbnail has an inconsistent sample count
    pub fn resolve(&mut self, reference: &TileReference) -> Result<Arc<RgbImage>> {
        match *reference {
            TileReference::Embedded(ref thumbnail) => {
                thumbnail.to_image().map(Arc::new).ok_or_else(|| {
                    invalid_parameter(
                        "thumbnail",
                        reference,
                        &"pixel data does not match the stored dimensions",
                    )
                })
            }
            TileReference::Source {
                source,
                x,
                y,
                width,
                height,
            } => self.crop(SourceRegion {
                source,
                x,
                y,
                width,
                height,
            }),
        }
    }

    fn crop(&mut self, region: SourceRegion) -> Result<Arc<RgbImage>> {
        let Self {
            sources,
            images,
            tiles,
        } = self;

        tiles.get_or_try_insert_with(region, || {
            let SourceRegion {
                source,
                x,
                y,
                width,
                height,
            } = region;
            let path = sources.get(source as usize).ok_or_else(|| {
                invalid_parameter(
                    "source",
                    &source,
                    &format!("profile lists {} source images", sources.len()),
                )
            })?;
            let image = images.get_or_try_insert_with(source, || load_rgb(path).map(Arc::new))?;

            let fits = x.checked_add(width).is_some_and(|right| right <= image.width())
                && y.checked_add(height).is_some_and(|bottom| bottom <= image.height());
            if !fits {
                return Err(invalid_parameter(
                    "region",
                    &format!("source #{source} {width}x{height}+{x}+{y}"),
                    &format!(
                        "outside the {}x{} source image '{}'",
                        image.width(),
                        image.height(),
                        path.display()
                    ),
                ));
            }
            Ok(Arc::new(
                imageops::crop_imm(&*image, x, y, width, height).to_image(),
            ))
        })
    }

    /// Statistics of the decoded source image cache
    pub const fn image_stats(&self) -> CacheStats {
        self.images.stats
    }

    /// Statistics of the cropped tile cache
    pub const fn tile_stats(&self) -> CacheStats {
        self.tiles.stats
    }
}
