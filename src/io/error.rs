//! Error types and context management for profile and collage operations

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all collage operations
#[derive(Debug)]
pub enum CollageError {
    /// Failed to load a raster image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Failed to save an image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// A tile was described with a configuration it was not cut for
    DescriptorConfigMismatch {
        /// Tile size (width, height) the descriptor is configured for
        expected: (u32, u32),
        /// Tile size (width, height) that was supplied
        actual: (u32, u32),
    },

    /// A query vector does not match the index dimensionality
    QueryDimensionMismatch {
        /// Dimensionality established when the index was built
        expected: usize,
        /// Length of the supplied vector
        actual: usize,
    },

    /// No tile survived extraction, so there is nothing to index
    EmptyProfile {
        /// Name of the profile being gathered
        name: String,
    },

    /// No profile of this name exists in the store
    ProfileNotFound {
        /// Requested profile name
        name: String,
    },

    /// Stored profile data failed structural or version validation
    ProfileCorrupt {
        /// Name of the damaged profile
        name: String,
        /// What failed validation
        reason: String,
    },

    /// Profile data could not be encoded for storage
    Serialization {
        /// Name of the profile being written
        name: String,
        /// Description of the encoder failure
        reason: String,
    },

    /// The tile matched for a target cell could not be turned into pixels
    TileResolution {
        /// Grid cell (column, row)
        cell: (u32, u32),
        /// Pixel origin (x, y) of the cell in the target image
        origin: (u32, u32),
        /// Why the tile could not be resolved
        reason: String,
    },
}

impl fmt::Display for CollageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::DescriptorConfigMismatch { expected, actual } => {
                write!(
                    f,
                    "Descriptor configured for {}x{} tiles but received a {}x{} tile",
                    expected.0, expected.1, actual.0, actual.1
                )
            }
            Self::QueryDimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Query vector has {actual} dimensions but the index expects {expected}"
                )
            }
            Self::EmptyProfile { name } => {
                write!(f, "Profile '{name}' would be empty: no tiles were extracted")
            }
            Self::ProfileNotFound { name } => write!(f, "Profile '{name}' does not exist"),
            Self::ProfileCorrupt { name, reason } => {
                write!(f, "Profile '{name}' is corrupt: {reason}")
            }
            Self::Serialization { name, reason } => {
                write!(f, "Failed to encode profile '{name}': {reason}")
            }
            Self::TileResolution {
                cell,
                origin,
                reason,
            } => {
                write!(
                    f,
                    "Failed to resolve tile for cell ({}, {}) at pixel ({}, {}): {reason}",
                    cell.0, cell.1, origin.0, origin.1
                )
            }
        }
    }
}

impl std::error::Error for CollageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for collage results
pub type Result<T> = std::result::Result<T, CollageError>;

/// Attaches the path and operation to raw I/O failures
pub trait WithPath<T> {
    /// Convert an I/O error into a [`CollageError::FileSystem`]
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path and operation applied
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T> WithPath<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T> {
        self.map_err(|source| CollageError::FileSystem {
            path: path.to_path_buf(),
            operation,
            source,
        })
    }
}

impl From<std::io::Error> for CollageError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> CollageError {
    CollageError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
