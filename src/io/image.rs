//! Raster decoding and encoding behind a closed set of supported formats
//!
//! Every image entering the pipeline is normalized to 8-bit RGB here, so the
//! extractor, descriptor and index never see any other pixel layout.

use crate::io::error::{CollageError, Result, WithPath};
use image::{ImageFormat, RgbImage};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Raster formats accepted for reading and writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    /// Portable Network Graphics
    Png,
    /// JPEG / JFIF
    Jpeg,
    /// Graphics Interchange Format (first frame)
    Gif,
    /// Windows bitmap
    Bmp,
    /// Tagged Image File Format
    Tiff,
}

impl RasterFormat {
    /// All supported formats
    pub const ALL: [Self; 5] = [Self::Png, Self::Jpeg, Self::Gif, Self::Bmp, Self::Tiff];

    /// Pick the format for a file extension, ignoring case
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    const fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }

    /// Decode an image file as 8-bit RGB
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a valid image
    /// of this format
    pub fn decode(self, path: &Path) -> Result<RgbImage> {
        let file = File::open(path).with_path(path, "open image")?;
        let image = image::load(BufReader::new(file), self.image_format()).map_err(|source| {
            CollageError::ImageLoad {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(image.to_rgb8())
    }

    /// Encode an RGB image to a file, replacing any existing content
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or encoding fails
    pub fn encode(self, image: &RgbImage, path: &Path) -> Result<()> {
        let file = File::create(path).with_path(path, "create image")?;
        let mut writer = BufWriter::new(file);
        image
            .write_to(&mut writer, self.image_format())
            .map_err(|source| CollageError::ImageExport {
                path: path.to_path_buf(),
                source,
            })?;
        writer.flush().with_path(path, "flush image")
    }
}

/// Comma-separated canonical extensions of every supported format
pub fn supported_extensions() -> String {
    RasterFormat::ALL.map(RasterFormat::extension).join(", ")
}

/// Whether a path names a file with a supported raster extension
pub fn is_supported_image(path: &Path) -> bool {
    path.is_file() && RasterFormat::from_path(path).is_some()
}

/// Load any supported image as 8-bit RGB
///
/// # Errors
///
/// Returns an error if the extension is unsupported or decoding fails
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let format = RasterFormat::from_path(path).ok_or_else(|| {
        crate::io::error::invalid_parameter(
            "image",
            &path.display(),
            &format!("unsupported raster format, expected one of {}", supported_extensions()),
        )
    })?;
    format.decode(path)
}

/// Write a collage, creating the parent directory when needed
///
/// # Errors
///
/// Returns an error if:
/// - The output extension is not a supported raster format
/// - The parent directory cannot be created
/// - The image cannot be encoded or written
pub fn save_rgb(image: &RgbImage, path: &Path) -> Result<()> {
    let format = RasterFormat::from_path(path).ok_or_else(|| {
        crate::io::error::invalid_parameter(
            "output",
            &path.display(),
            &format!("unsupported raster format, expected one of {}", supported_extensions()),
        )
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_path(parent, "create directory")?;
    }

    format.encode(image, path)
}

/// List supported images directly inside a folder, sorted by path
///
/// # Errors
///
/// Returns an error if the folder cannot be read
pub fn collect_images(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder).with_path(folder, "read directory")? {
        let path = entry.with_path(folder, "read directory entry")?.path();
        if is_supported_image(&path) {
            files.push(path);
        } else if path.is_file() {
            log::warn!("Skipping {} (unsupported format)", path.display());
        }
    }
    files.sort();
    Ok(files)
}
