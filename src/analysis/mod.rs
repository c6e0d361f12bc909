//! Feature extraction for tiles
//!
//! Maps tile pixels to fixed-length vectors that serve as similarity keys.

/// Block-averaged color and luminance descriptors
pub mod descriptor;

pub use descriptor::{ColorSpace, DescriptorConfig, FeatureVector};
