//! Tests for error types including source chaining and message formatting

#[cfg(test)]
mod tests {
    use anncollage::CollageError;
    use anncollage::io::error::{WithPath, invalid_parameter};
    use std::error::Error;
    use std::path::Path;

    // Tests error source chaining works correctly
    // Verified by breaking source chain
    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = CollageError::FileSystem {
            path: "/tmp/test.png".into(),
            operation: "read",
            source: io_error,
        };

        assert!(error.source().is_some());
        assert!(
            CollageError::ProfileNotFound {
                name: "x".to_string()
            }
            .source()
            .is_none()
        );
    }

    // Tests profile errors are reported with the profile name
    // Verified by omitting the name from messages
    #[test]
    fn test_profile_error_messages() {
        let missing = CollageError::ProfileNotFound {
            name: "nope".to_string(),
        };
        let corrupt = CollageError::ProfileCorrupt {
            name: "beach".to_string(),
            reason: "format version 9 is not supported".to_string(),
        };
        let empty = CollageError::EmptyProfile {
            name: "void".to_string(),
        };

        assert!(missing.to_string().contains("'nope'"));
        assert!(corrupt.to_string().contains("'beach'"));
        assert!(corrupt.to_string().contains("format version 9"));
        assert!(empty.to_string().contains("'void'"));
    }

    // Tests tile resolution errors carry cell and pixel coordinates
    // Verified by printing only the cell column
    #[test]
    fn test_tile_resolution_message() {
        let error = CollageError::TileResolution {
            cell: (3, 4),
            origin: (120, 160),
            reason: "source missing".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("(3, 4)"));
        assert!(message.contains("(120, 160)"));
        assert!(message.contains("source missing"));
    }

    // Tests dimension mismatch messages show both sides
    // Verified by swapping expected and actual
    #[test]
    fn test_mismatch_messages() {
        let descriptor = CollageError::DescriptorConfigMismatch {
            expected: (40, 40),
            actual: (20, 30),
        };
        let query = CollageError::QueryDimensionMismatch {
            expected: 300,
            actual: 100,
        };

        assert!(descriptor.to_string().contains("40x40"));
        assert!(descriptor.to_string().contains("20x30"));
        assert!(query.to_string().contains("100 dimensions"));
        assert!(query.to_string().contains("expects 300"));
    }

    // Tests InvalidParameter error contains all fields
    // Verified by omitting value from message
    #[test]
    fn test_invalid_parameter_error() {
        let error = invalid_parameter("leaf_size", &0, &"leaves must hold at least one entry");

        assert!(matches!(
            &error,
            CollageError::InvalidParameter { parameter: "leaf_size", value, .. } if value == "0"
        ));
        let message = error.to_string();
        assert!(message.contains("leaf_size"));
        assert!(message.contains("at least one entry"));
    }

    // Tests raw I/O errors pick up path context
    // Verified by dropping the operation name
    #[test]
    fn test_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::other("disk full"));

        let error = result.with_path(Path::new("profiles/x/index.bin"), "write index");

        assert!(error.is_err_and(|e| {
            let message = e.to_string();
            message.contains("write index") && message.contains("profiles/x/index.bin")
        }));
    }

    // Tests bare I/O errors convert into file system errors
    // Verified by converting into InvalidParameter instead
    #[test]
    fn test_from_io_error() {
        let error = CollageError::from(std::io::Error::other("boom"));

        assert!(matches!(error, CollageError::FileSystem { .. }));
    }
}
