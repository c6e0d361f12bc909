//! Searchable collection of profile entries
//!
//! Candidate entries come from the projection forest and are re-ranked by
//! exact Euclidean distance. Equal distances keep insertion order. Once
//! built the entry set is fixed; changing it means building a new index.

use crate::analysis::descriptor::FeatureVector;
use crate::index::forest::{IndexParams, ProjectionForest};
use crate::io::error::{CollageError, Result, invalid_parameter};
use crate::math::distance::euclidean;
use image::RgbImage;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile pixels stored inside the profile itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Packed 8-bit RGB samples, row-major
    pub pixels: Vec<u8>,
}

impl Thumbnail {
    /// Capture the pixels of an RGB image
    pub fn from_image(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.as_raw().clone(),
        }
    }

    /// Rebuild the RGB image, or `None` if the sample count is inconsistent
    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }
}

/// Where the pixels of an indexed tile come from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileReference {
    /// Region of one of the profile's source images
    Source {
        /// Source image identifier within the profile
        source: u32,
        /// Left edge of the region
        x: u32,
        /// Top edge of the region
        y: u32,
        /// Region width
        width: u32,
        /// Region height
        height: u32,
    },
    /// Pixels embedded in the profile
    Embedded(Thumbnail),
}

impl fmt::Display for TileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source {
                source,
                x,
                y,
                width,
                height,
            } => write!(f, "source #{source} {width}x{height}+{x}+{y}"),
            Self::Embedded(thumbnail) => {
                write!(f, "embedded {}x{}", thumbnail.width, thumbnail.height)
            }
        }
    }
}

/// Feature vector paired with the tile it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Descriptor of the tile
    pub vector: FeatureVector,
    /// How to recover the tile's pixels
    pub reference: TileReference,
}

/// One query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    /// Insertion index of the entry
    pub index: usize,
    /// The matched entry
    pub entry: &'a ProfileEntry,
    /// Euclidean distance from the query vector
    pub distance: f32,
}

/// Raw, serializable form of a [`ProfileIndex`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexData {
    /// Length shared by every vector
    pub dimension: usize,
    /// Construction and search parameters
    pub params: IndexParams,
    /// Entries in insertion order
    pub entries: Vec<ProfileEntry>,
    /// Projection forest over the entry vectors
    pub forest: ProjectionForest,
}

/// Approximate nearest neighbor index over profile entries
///
/// Holds no interior mutability, so a built index can be queried from any
/// number of threads at once.
#[derive(Debug, Clone)]
pub struct ProfileIndex {
    dimension: usize,
    params: IndexParams,
    entries: Vec<ProfileEntry>,
    vectors: Array2<f32>,
    forest: ProjectionForest,
}

impl ProfileIndex {
    /// Build an index over a fixed set of entries
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `entries` is empty ([`CollageError::EmptyProfile`])
    /// - The entries do not all share one vector length
    /// - The index parameters are invalid
    pub fn build(entries: Vec<ProfileEntry>, params: IndexParams) -> Result<Self> {
        let dimension = entries
            .first()
            .map(|entry| entry.vector.len())
            .ok_or_else(|| CollageError::EmptyProfile {
                name: String::new(),
            })?;

        if let Some((position, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.vector.len() != dimension)
        {
            return Err(invalid_parameter(
                "entries",
                &position,
                &format!(
                    "entry has {} dimensions but the first entry has {dimension}",
                    entry.vector.len()
                ),
            ));
        }

        let vectors = stack_vectors(&entries, dimension)?;
        let forest = ProjectionForest::build(&vectors, &params)?;
        log::debug!(
            "Indexed {} entries in {} trees ({} nodes)",
            entries.len(),
            forest.tree_count(),
            forest.node_count()
        );

        Ok(Self {
            dimension,
            params,
            entries,
            vectors,
            forest,
        })
    }

    /// Restore an index from its serialized form
    ///
    /// # Errors
    ///
    /// Returns a description of the first structural inconsistency
    pub fn from_data(data: IndexData) -> std::result::Result<Self, String> {
        if data.entries.is_empty() {
            return Err("index has no entries".to_string());
        }
        if let Some(position) = data
            .entries
            .iter()
            .position(|entry| entry.vector.len() != data.dimension)
        {
            return Err(format!(
                "entry {position} does not have {} dimensions",
                data.dimension
            ));
        }
        data.params.validate().map_err(|error| error.to_string())?;
        data.forest.validate(data.entries.len(), data.dimension)?;

        let vectors =
            stack_vectors(&data.entries, data.dimension).map_err(|error| error.to_string())?;

        Ok(Self {
            dimension: data.dimension,
            params: data.params,
            entries: data.entries,
            vectors,
            forest: data.forest,
        })
    }

    /// Serializable form of this index
    pub fn to_data(&self) -> IndexData {
        IndexData {
            dimension: self.dimension,
            params: self.params,
            entries: self.entries.clone(),
            forest: self.forest.clone(),
        }
    }

    /// Vector length established at build time
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Parameters the index was built with
    pub const fn params(&self) -> &IndexParams {
        &self.params
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty (never true for a built index)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Override how many candidates a query gathers before ranking
    ///
    /// # Errors
    ///
    /// Returns an error if `search_k` is zero
    pub fn set_search_k(&mut self, search_k: usize) -> Result<()> {
        if search_k == 0 {
            return Err(invalid_parameter(
                "search_k",
                &search_k,
                &"queries must gather at least one candidate",
            ));
        }
        self.params.search_k = Some(search_k);
        Ok(())
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[ProfileEntry] {
        &self.entries
    }

    /// Entry by insertion index
    pub fn entry(&self, index: usize) -> Option<&ProfileEntry> {
        self.entries.get(index)
    }

    /// Underlying projection forest
    pub const fn forest(&self) -> &ProjectionForest {
        &self.forest
    }

    /// Approximate `k` nearest entries, ascending by distance
    ///
    /// Returns fewer than `k` results only when the search visits fewer
    /// entries. Equal distances are ordered by insertion index.
    ///
    /// # Errors
    ///
    /// Returns [`CollageError::QueryDimensionMismatch`] if the vector length
    /// differs from the index dimensionality
    pub fn query(&self, vector: &FeatureVector, k: usize) -> Result<Vec<Neighbor<'_>>> {
        let query = self.check_dimension(vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let candidates =
            self.forest
                .candidates(query, self.entries.len(), self.params.search_breadth(k));
        Ok(self.rank(query, candidates, k))
    }

    /// Exact `k` nearest entries by exhaustive scan
    ///
    /// Reference ordering for measuring the recall of [`Self::query`].
    ///
    /// # Errors
    ///
    /// Returns [`CollageError::QueryDimensionMismatch`] if the vector length
    /// differs from the index dimensionality
    pub fn query_exact(&self, vector: &FeatureVector, k: usize) -> Result<Vec<Neighbor<'_>>> {
        let query = self.check_dimension(vector)?;
        Ok(self.rank(query, (0..self.entries.len()).collect(), k))
    }

    fn check_dimension<'v>(&self, vector: &'v FeatureVector) -> Result<ArrayView1<'v, f32>> {
        if vector.len() != self.dimension {
            return Err(CollageError::QueryDimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(ArrayView1::from(vector.as_slice()))
    }

    fn rank(
        &self,
        query: ArrayView1<'_, f32>,
        candidates: Vec<usize>,
        k: usize,
    ) -> Vec<Neighbor<'_>> {
        let mut scored: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|index| (index, euclidean(self.vectors.row(index), query)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        scored
            .into_iter()
            .filter_map(|(index, distance)| {
                self.entries.get(index).map(|entry| Neighbor {
                    index,
                    entry,
                    distance,
                })
            })
            .collect()
    }
}

fn stack_vectors(entries: &[ProfileEntry], dimension: usize) -> Result<Array2<f32>> {
    let flat: Vec<f32> = entries
        .iter()
        .flat_map(|entry| entry.vector.as_slice().iter().copied())
        .collect();
    Array2::from_shape_vec((entries.len(), dimension), flat)
        .map_err(|error| invalid_parameter("entries", &entries.len(), &error))
}
