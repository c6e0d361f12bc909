//! Tests for profile persistence, listing and corruption handling

#[cfg(test)]
mod tests {
    use anncollage::CollageError;
    use anncollage::algorithm::gather::{GatherOptions, gather};
    use anncollage::algorithm::resolver::TileResolver;
    use anncollage::analysis::descriptor::{ColorSpace, DescriptorConfig};
    use anncollage::index::forest::IndexParams;
    use anncollage::index::profile::Profile;
    use anncollage::index::profile_index::IndexData;
    use anncollage::io::configuration::{INDEX_FILE, METADATA_FILE};
    use anncollage::io::progress::ProgressReporter;
    use anncollage::io::store::ProfileStore;
    use image::{Rgb, RgbImage};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn temp() -> TempDir {
        let Ok(dir) = tempfile::tempdir() else {
            unreachable!("temporary directory must be creatable");
        };
        dir
    }

    // Profile over `count` 20x20 sources with 10x10 tiles
    fn gathered(input: &Path, name: &str, count: u8) -> Profile {
        let sources: Vec<_> = (0..count)
            .map(|i| {
                let path = input.join(format!("source_{i}.png"));
                let image = RgbImage::from_fn(20, 20, |x, y| {
                    Rgb([i * 50, (x * 12) as u8, (y * 12) as u8])
                });
                assert!(image.save(&path).is_ok());
                path
            })
            .collect();
        let descriptor = DescriptorConfig {
            tile_width: 10,
            tile_height: 10,
            sample_dimension: 2,
            color_space: ColorSpace::Rgb,
        };
        let options = GatherOptions::new(descriptor, IndexParams::default());
        let Ok(profile) = gather(name, &sources, &options, &mut ProgressReporter::hidden()) else {
            unreachable!("generated sources must gather");
        };
        profile
    }

    fn hidden_entries(root: &Path) -> Vec<String> {
        fs::read_dir(root)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.file_name().to_string_lossy().to_string())
                    .filter(|name| name.starts_with('.'))
                    .collect()
            })
            .unwrap_or_default()
    }

    // Tests a saved profile loads with the same index and descriptor
    // Verified by writing the metadata before the index
    #[test]
    fn test_save_and_load() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        let profile = gathered(input.path(), "round", 2);

        let saved = store.save(&profile, "round");
        assert!(saved.is_ok_and(|dir| dir == root.path().join("round")));
        assert!(store.exists("round"));

        let Ok(loaded) = store.load("round") else {
            unreachable!("saved profile must load");
        };
        assert_eq!(loaded.name(), "round");
        assert_eq!(loaded.tile_count(), 8);
        assert_eq!(loaded.descriptor(), profile.descriptor());
        assert_eq!(loaded.index().to_data(), profile.index().to_data());
        assert!(
            loaded
                .sources()
                .iter()
                .all(|path| path.starts_with(root.path().join("round")))
        );
        assert!(hidden_entries(root.path()).is_empty());
    }

    // Tests loaded profiles resolve tiles after the input folder is gone
    // Verified by recording the original source paths
    #[test]
    fn test_profile_is_self_contained() {
        let root = temp();
        let store = ProfileStore::new(root.path());
        {
            let input = temp();
            let profile = gathered(input.path(), "portable", 1);
            assert!(store.save(&profile, "portable").is_ok());
        }

        let Ok(loaded) = store.load("portable") else {
            unreachable!("saved profile must load");
        };
        let mut resolver = TileResolver::for_profile(&loaded);

        for entry in loaded.index().entries() {
            assert!(resolver.resolve(&entry.reference).is_ok());
        }
    }

    // Tests unknown and invalid names report the profile as missing
    // Verified by returning a corrupt error for absent folders
    #[test]
    fn test_load_missing() {
        let root = temp();
        let store = ProfileStore::new(root.path());

        assert!(matches!(
            store.load("nope"),
            Err(CollageError::ProfileNotFound { ref name }) if name == "nope"
        ));
        assert!(matches!(
            store.load("../etc"),
            Err(CollageError::ProfileNotFound { .. })
        ));
    }

    // Tests undecodable metadata is reported as corruption
    // Verified by treating unreadable metadata as a missing profile
    #[test]
    fn test_load_corrupt_metadata() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        assert!(store.save(&gathered(input.path(), "broken", 1), "broken").is_ok());

        let metadata = root.path().join("broken").join(METADATA_FILE);
        assert!(fs::write(&metadata, "{ not json").is_ok());

        assert!(matches!(
            store.load("broken"),
            Err(CollageError::ProfileCorrupt { .. })
        ));
    }

    // Tests a profile from an unknown format version is refused
    // Verified by skipping the version comparison
    #[test]
    fn test_load_version_mismatch() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        assert!(store.save(&gathered(input.path(), "future", 1), "future").is_ok());

        let metadata = root.path().join("future").join(METADATA_FILE);
        let text = fs::read_to_string(&metadata).unwrap_or_default();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        if let Some(version) = value.get_mut("format_version") {
            *version = serde_json::json!(99);
        }
        assert!(fs::write(&metadata, value.to_string()).is_ok());

        assert!(matches!(
            store.load("future"),
            Err(CollageError::ProfileCorrupt { ref reason, .. }) if reason.contains("99")
        ));
    }

    // Tests source paths leaving the profile folder are refused
    // Verified by joining stored paths without inspection
    #[test]
    fn test_load_escaping_source() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        assert!(store.save(&gathered(input.path(), "escape", 1), "escape").is_ok());

        let metadata = root.path().join("escape").join(METADATA_FILE);
        let text = fs::read_to_string(&metadata).unwrap_or_default();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        if let Some(sources) = value.get_mut("sources") {
            *sources = serde_json::json!(["../../outside.png"]);
        }
        assert!(fs::write(&metadata, value.to_string()).is_ok());

        assert!(matches!(
            store.load("escape"),
            Err(CollageError::ProfileCorrupt { .. })
        ));
    }

    // Tests a truncated index body is reported as corruption
    // Verified by rebuilding the index from metadata alone
    #[test]
    fn test_load_truncated_index() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        assert!(store.save(&gathered(input.path(), "cut", 1), "cut").is_ok());

        let index = root.path().join("cut").join(INDEX_FILE);
        let bytes = fs::read(&index).unwrap_or_default();
        assert!(fs::write(&index, bytes.get(..bytes.len() / 2).unwrap_or_default()).is_ok());

        assert!(matches!(
            store.load("cut"),
            Err(CollageError::ProfileCorrupt { .. })
        ));
    }

    // Tests an index whose forest loops back on itself is reported as corruption
    // Verified by validating only that child indices are inside the arena
    #[test]
    fn test_load_cyclic_forest() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        assert!(store.save(&gathered(input.path(), "loop", 1), "loop").is_ok());

        let index = root.path().join("loop").join(INDEX_FILE);
        let bytes = fs::read(&index).unwrap_or_default();
        let Ok(mut data) = bincode::deserialize::<IndexData>(&bytes) else {
            unreachable!("saved index must decode");
        };
        let Ok(forest) = serde_json::from_value(serde_json::json!({
            "nodes": [{ "Split": { "normal": [], "offset": 0.0, "left": 0, "right": 0 } }],
            "roots": [0]
        })) else {
            unreachable!("literal forest must decode");
        };
        data.forest = forest;
        let Ok(encoded) = bincode::serialize(&data) else {
            unreachable!("index data must encode");
        };
        assert!(fs::write(&index, encoded).is_ok());

        assert!(matches!(
            store.load("loop"),
            Err(CollageError::ProfileCorrupt { .. })
        ));
    }

    // Tests saving under an existing name replaces the whole profile
    // Verified by merging new files into the old folder
    #[test]
    fn test_save_replaces() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        assert!(store.save(&gathered(input.path(), "set", 1), "set").is_ok());
        assert!(store.save(&gathered(input.path(), "set", 3), "set").is_ok());

        let loaded = store.load("set");

        assert!(loaded.is_ok_and(|profile| profile.tile_count() == 12));
        assert!(hidden_entries(root.path()).is_empty());
        let copies = fs::read_dir(root.path().join("set").join("images"))
            .map(Iterator::count)
            .unwrap_or_default();
        assert_eq!(copies, 3);
    }

    // Tests listing returns sorted names and summaries
    // Verified by returning names in directory order
    #[test]
    fn test_list_and_summaries() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        for (name, count) in [("zeta", 1), ("alpha", 2)] {
            assert!(store.save(&gathered(input.path(), name, count), name).is_ok());
        }
        assert!(fs::create_dir(root.path().join("not_a_profile")).is_ok());

        assert_eq!(
            store.list().unwrap_or_default(),
            vec!["alpha".to_string(), "zeta".to_string()]
        );

        let summaries = store.summaries().unwrap_or_default();
        let first = summaries.first();
        assert_eq!(summaries.len(), 2);
        assert_eq!(first.map(|s| s.name.as_str()), Some("alpha"));
        assert_eq!(first.map(|s| (s.source_count, s.tile_count)), Some((2, 8)));
        assert_eq!(first.map(|s| s.descriptor.tile_width), Some(10));
    }

    // Tests listing a store that was never written to is empty
    // Verified by failing on a missing root folder
    #[test]
    fn test_list_missing_root() {
        let root = temp();
        let store = ProfileStore::new(root.path().join("never_created"));

        assert!(store.list().is_ok_and(|names| names.is_empty()));
    }

    // Tests deleting removes the profile and refuses unknown names
    // Verified by leaving the folder in place
    #[test]
    fn test_delete() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path());
        assert!(store.save(&gathered(input.path(), "gone", 1), "gone").is_ok());

        assert!(store.delete("gone").is_ok());
        assert!(!store.exists("gone"));
        assert!(!root.path().join("gone").exists());
        assert!(matches!(
            store.delete("gone"),
            Err(CollageError::ProfileNotFound { .. })
        ));
    }

    // Tests invalid names are refused before anything is written
    // Verified by creating the root before validating the name
    #[test]
    fn test_save_invalid_name() {
        let input = temp();
        let root = temp();
        let store = ProfileStore::new(root.path().join("store"));
        let profile = gathered(input.path(), "valid", 1);

        assert!(matches!(
            store.save(&profile, "bad/name"),
            Err(CollageError::InvalidParameter { .. })
        ));
        assert!(!store.root().exists());
    }
}
