//! Approximate nearest neighbor search over profile entries
//!
//! This module contains:
//! - The random projection forest used to narrow candidates
//! - The profile index that ranks candidates by exact distance
//! - The named profile persisted by the store

/// Random projection forest construction and traversal
pub mod forest;
/// Named profile combining an index with its descriptor configuration
pub mod profile;
/// Entry storage, query ranking and serialized form
pub mod profile_index;

pub use forest::{IndexParams, ProjectionForest};
pub use profile::Profile;
pub use profile_index::{IndexData, Neighbor, ProfileEntry, ProfileIndex, Thumbnail, TileReference};
