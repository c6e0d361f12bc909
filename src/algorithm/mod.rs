/// Per-cell matching and compositing of the collage
pub mod assembler;
/// Bounded least-recently-used caches
pub mod cache;
/// Profile construction from source images
pub mod gather;
/// Resolution of tile references to pixel data
pub mod resolver;
