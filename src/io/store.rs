//! Durable, named profile storage
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<name>/profile.json   metadata (format version, descriptor, sources)
//! <root>/<name>/index.bin      entries and projection forest
//! <root>/<name>/images/        copies of the source images
//! ```
//!
//! A save is staged in a hidden temporary folder inside the root and only
//! renamed into place once every file is written and synced, so an
//! interrupted save never leaves a half-written profile under its name.

use crate::analysis::descriptor::DescriptorConfig;
use crate::index::forest::IndexParams;
use crate::index::profile::{Profile, validate_name};
use crate::index::profile_index::{IndexData, ProfileIndex, TileReference};
use crate::io::configuration::{
    IMAGES_DIRECTORY, INDEX_FILE, METADATA_FILE, PROFILE_FORMAT_VERSION,
};
use crate::io::error::{CollageError, Result, WithPath};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, IntoInnerError};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize)]
struct ProfileMetadata {
    format_version: u32,
    name: String,
    descriptor: DescriptorConfig,
    vector_len: usize,
    index: IndexParams,
    entry_count: usize,
    sources: Vec<PathBuf>,
}

/// Listing information read from a profile's metadata alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    /// Profile name
    pub name: String,
    /// Number of source images
    pub source_count: usize,
    /// Number of indexed tiles
    pub tile_count: usize,
    /// Descriptor configuration
    pub descriptor: DescriptorConfig,
}

/// Folder of named profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Store rooted at a folder, which is created on first save
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Folder holding all profiles
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder of one profile
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether a complete profile with this name exists
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.profile_dir(name).join(METADATA_FILE).is_file()
    }

    /// Persist a profile under `name`, replacing any profile of that name
    ///
    /// Source images are copied into the profile. Returns the profile folder.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is invalid
    /// - A source image cannot be copied
    /// - The index cannot be encoded
    /// - Any file cannot be written or the staged profile cannot be committed
    pub fn save(&self, profile: &Profile, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        fs::create_dir_all(&self.root).with_path(&self.root, "create profile root")?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .with_path(&self.root, "create staging directory")?;

        let sources = copy_sources(profile.sources(), staging.path())?;

        let index_path = staging.path().join(INDEX_FILE);
        let index_file = File::create(&index_path).with_path(&index_path, "create index")?;
        let mut writer = BufWriter::new(index_file);
        bincode::serialize_into(&mut writer, &profile.index().to_data()).map_err(|error| {
            CollageError::Serialization {
                name: name.to_string(),
                reason: error.to_string(),
            }
        })?;
        sync_writer(writer, &index_path)?;

        let metadata = ProfileMetadata {
            format_version: PROFILE_FORMAT_VERSION,
            name: name.to_string(),
            descriptor: *profile.descriptor(),
            vector_len: profile.descriptor().vector_len(),
            index: *profile.index().params(),
            entry_count: profile.tile_count(),
            sources,
        };
        let metadata_path = staging.path().join(METADATA_FILE);
        let metadata_file =
            File::create(&metadata_path).with_path(&metadata_path, "create metadata")?;
        let mut writer = BufWriter::new(metadata_file);
        serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|error| {
            CollageError::Serialization {
                name: name.to_string(),
                reason: error.to_string(),
            }
        })?;
        sync_writer(writer, &metadata_path)?;

        let destination = self.profile_dir(name);
        self.commit(staging.path(), &destination)?;
        log::info!("Saved profile '{name}' to {}", destination.display());
        Ok(destination)
    }

    // Moves any previous profile aside before renaming the staged folder in,
    // restoring it if the rename fails. The set-aside copy is removed when
    // its temporary folder is dropped, unless it could not be restored.
    fn commit(&self, staged: &Path, destination: &Path) -> Result<()> {
        if !destination.exists() {
            return fs::rename(staged, destination).with_path(destination, "commit profile");
        }

        let replaced = tempfile::Builder::new()
            .prefix(".replaced-")
            .tempdir_in(&self.root)
            .with_path(&self.root, "create replacement directory")?;
        let previous = replaced.path().join("previous");
        fs::rename(destination, &previous).with_path(destination, "move previous profile")?;

        if let Err(error) = fs::rename(staged, destination) {
            restore_previous(replaced, destination);
            return Err(error).with_path(destination, "commit profile");
        }
        Ok(())
    }

    /// Load a profile by name
    ///
    /// Source image paths are resolved inside the profile folder.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No profile of that name exists ([`CollageError::ProfileNotFound`])
    /// - Its files fail version or structural validation
    ///   ([`CollageError::ProfileCorrupt`])
    pub fn load(&self, name: &str) -> Result<Profile> {
        if !self.exists(name) {
            return Err(CollageError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        let directory = self.profile_dir(name);
        let corrupt = |reason: String| CollageError::ProfileCorrupt {
            name: name.to_string(),
            reason,
        };

        let metadata = self.read_metadata(name)?;

        let index_path = directory.join(INDEX_FILE);
        let index_file = File::open(&index_path)
            .map_err(|error| corrupt(format!("cannot open {INDEX_FILE}: {error}")))?;
        let data: IndexData = bincode::deserialize_from(BufReader::new(index_file))
            .map_err(|error| corrupt(format!("cannot decode {INDEX_FILE}: {error}")))?;

        if data.dimension != metadata.vector_len {
            return Err(corrupt(format!(
                "index has {} dimensions but the descriptor produces {}",
                data.dimension, metadata.vector_len
            )));
        }
        if data.entries.len() != metadata.entry_count {
            return Err(corrupt(format!(
                "index holds {} entries but metadata records {}",
                data.entries.len(),
                metadata.entry_count
            )));
        }
        let source_count = metadata.sources.len();
        if data.entries.iter().any(|entry| {
            matches!(entry.reference, TileReference::Source { source, .. } if source as usize >= source_count)
        }) {
            return Err(corrupt("an entry references an unlisted source image".to_string()));
        }

        let index = ProfileIndex::from_data(data).map_err(corrupt)?;
        let sources = metadata
            .sources
            .iter()
            .map(|relative| directory.join(relative))
            .collect();

        Profile::new(name, metadata.descriptor, sources, index)
            .map_err(|error| corrupt(error.to_string()))
    }

    fn read_metadata(&self, name: &str) -> Result<ProfileMetadata> {
        let corrupt = |reason: String| CollageError::ProfileCorrupt {
            name: name.to_string(),
            reason,
        };
        let metadata_path = self.profile_dir(name).join(METADATA_FILE);
        let file = File::open(&metadata_path).with_path(&metadata_path, "open metadata")?;
        let metadata: ProfileMetadata = serde_json::from_reader(BufReader::new(file))
            .map_err(|error| corrupt(format!("cannot decode {METADATA_FILE}: {error}")))?;

        if metadata.format_version != PROFILE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "format version {} is not supported (expected {PROFILE_FORMAT_VERSION})",
                metadata.format_version
            )));
        }
        let descriptor = metadata.descriptor;
        DescriptorConfig::new(
            descriptor.tile_width,
            descriptor.tile_height,
            descriptor.sample_dimension,
            descriptor.color_space,
        )
        .map_err(|error| corrupt(error.to_string()))?;
        if descriptor.vector_len() != metadata.vector_len {
            return Err(corrupt(format!(
                "vector length {} does not match the descriptor ({})",
                metadata.vector_len,
                descriptor.vector_len()
            )));
        }
        if let Some(path) = metadata.sources.iter().find(|path| !is_contained(path)) {
            return Err(corrupt(format!(
                "source path '{}' escapes the profile folder",
                path.display()
            )));
        }
        Ok(metadata)
    }

    /// Names of all stored profiles, sorted
    ///
    /// # Errors
    ///
    /// Returns an error if the store root exists but cannot be read
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).with_path(&self.root, "read profile root")? {
            let entry = entry.with_path(&self.root, "read profile root entry")?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.exists(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Listing information for every stored profile, sorted by name
    ///
    /// Profiles whose metadata cannot be read are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the store root exists but cannot be read
    pub fn summaries(&self) -> Result<Vec<ProfileSummary>> {
        let mut summaries = Vec::new();
        for name in self.list()? {
            match self.read_metadata(&name) {
                Ok(metadata) => summaries.push(ProfileSummary {
                    name,
                    source_count: metadata.sources.len(),
                    tile_count: metadata.entry_count,
                    descriptor: metadata.descriptor,
                }),
                Err(error) => log::warn!("Skipping profile '{name}': {error}"),
            }
        }
        Ok(summaries)
    }

    /// Remove a stored profile
    ///
    /// # Errors
    ///
    /// Returns an error if the profile does not exist or cannot be removed
    pub fn delete(&self, name: &str) -> Result<()> {
        if !self.exists(name) {
            return Err(CollageError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        let directory = self.profile_dir(name);
        fs::remove_dir_all(&directory).with_path(&directory, "remove profile")
    }
}

// Copies sources into `<staging>/images/`, prefixing each file with its
// source identifier so equal file names from different folders cannot clash.
fn copy_sources(sources: &[PathBuf], staging: &Path) -> Result<Vec<PathBuf>> {
    let images = staging.join(IMAGES_DIRECTORY);
    fs::create_dir_all(&images).with_path(&images, "create images directory")?;

    let mut relative_paths = Vec::with_capacity(sources.len());
    for (id, source) in sources.iter().enumerate() {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let stored_name = format!("{id:05}_{file_name}");
        let destination = images.join(&stored_name);
        fs::copy(source, &destination).with_path(source, "copy source image")?;
        relative_paths.push(Path::new(IMAGES_DIRECTORY).join(stored_name));
    }
    Ok(relative_paths)
}

fn sync_writer(writer: BufWriter<File>, path: &Path) -> Result<()> {
    let file = writer
        .into_inner()
        .map_err(IntoInnerError::into_error)
        .with_path(path, "flush")?;
    file.sync_all().with_path(path, "sync")
}

// Moves a set-aside profile back into place. If that fails too, the
// temporary folder is kept so the old profile survives, and its location
// is returned.
fn restore_previous(replaced: TempDir, destination: &Path) -> Option<PathBuf> {
    let previous = replaced.path().join("previous");
    let error = fs::rename(&previous, destination).err()?;
    let kept = replaced.keep().join("previous");
    log::warn!(
        "Could not restore previous profile to {} ({error}); it was left in {}",
        destination.display(),
        kept.display()
    );
    Some(kept)
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
}
