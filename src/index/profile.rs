//! The persisted unit: a named index with its descriptor configuration

use crate::analysis::descriptor::DescriptorConfig;
use crate::index::profile_index::{ProfileIndex, TileReference};
use crate::io::error::{Result, invalid_parameter};
use std::path::PathBuf;

/// Named, searchable collection of source tiles
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    descriptor: DescriptorConfig,
    sources: Vec<PathBuf>,
    index: ProfileIndex,
}

impl Profile {
    /// Assemble a profile from a built index
    ///
    /// `sources` is indexed by the `source` field of
    /// [`TileReference::Source`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is not a valid profile name
    /// - The index dimensionality differs from the descriptor's vector length
    /// - An entry references a source image that is not listed
    pub fn new(
        name: &str,
        descriptor: DescriptorConfig,
        sources: Vec<PathBuf>,
        index: ProfileIndex,
    ) -> Result<Self> {
        validate_name(name)?;
        if index.dimension() != descriptor.vector_len() {
            return Err(invalid_parameter(
                "index",
                &index.dimension(),
                &format!(
                    "descriptor produces {}-dimensional vectors",
                    descriptor.vector_len()
                ),
            ));
        }
        if let Some(missing) = index.entries().iter().find_map(|entry| match entry.reference {
            TileReference::Source { source, .. } if source as usize >= sources.len() => {
                Some(source)
            }
            _ => None,
        }) {
            return Err(invalid_parameter(
                "sources",
                &missing,
                &format!("only {} source images are listed", sources.len()),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            descriptor,
            sources,
            index,
        })
    }

    /// Profile name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor configuration every entry was computed with
    pub const fn descriptor(&self) -> &DescriptorConfig {
        &self.descriptor
    }

    /// Source image paths, indexed by source identifier
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// The searchable index
    pub const fn index(&self) -> &ProfileIndex {
        &self.index
    }

    /// Mutable access for adjusting search parameters after loading
    pub fn index_mut(&mut self) -> &mut ProfileIndex {
        &mut self.index
    }

    /// Number of indexed tiles
    pub fn tile_count(&self) -> usize {
        self.index.len()
    }
}

/// Check that a name is usable as a profile folder
///
/// Names are non-empty and limited to ASCII letters, digits, `-` and `_`.
///
/// # Errors
///
/// Returns an error describing why the name is rejected
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid_parameter("name", &name, &"profile name is empty"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(invalid_parameter(
            "name",
            &name,
            &format!("character '{bad}' is not allowed in profile names"),
        ));
    }
    Ok(())
}
