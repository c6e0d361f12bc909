//! Pipeline constants and runtime configuration defaults

// Tile geometry used when gathering a profile
/// Default tile width in pixels
pub const DEFAULT_TILE_WIDTH: u32 = 40;
/// Default tile height in pixels
pub const DEFAULT_TILE_HEIGHT: u32 = 40;

/// Side length of the block grid each tile is averaged down to
pub const DEFAULT_SAMPLE_DIMENSION: u32 = 10;

// Random projection forest parameters
/// Number of trees built per profile
pub const DEFAULT_TREE_COUNT: usize = 5;
/// Maximum number of entries held by a single leaf
pub const DEFAULT_LEAF_SIZE: usize = 16;
/// Attempts at drawing a hyperplane that separates a node before halving it
pub const MAX_SPLIT_ATTEMPTS: usize = 8;

// Default values for configurable parameters
/// Fixed seed for reproducible index construction
pub const DEFAULT_SEED: u64 = 42;

// No-repeat matching looks this far down the neighbor list for an unused entry
/// Candidates considered per cell when entries may not repeat
pub const NO_REPEAT_CANDIDATES: usize = 8;

// Bounded caches used while resolving matched tiles
/// Decoded source images kept in memory
pub const SOURCE_CACHE_CAPACITY: usize = 16;
/// Cropped tiles kept in memory
pub const TILE_CACHE_CAPACITY: usize = 1024;

// Persisted state layout
/// Version written into every profile; anything else is rejected on load
pub const PROFILE_FORMAT_VERSION: u32 = 1;
/// Directory holding one folder per profile
pub const PROFILES_DIRECTORY: &str = "profiles";
/// Default folder scanned for source images
pub const INPUT_DIRECTORY: &str = "input_images";
/// Default folder for collages when no output path is given
pub const OUTPUT_DIRECTORY: &str = "output";
/// Profile metadata file name
pub const METADATA_FILE: &str = "profile.json";
/// Serialized index file name
pub const INDEX_FILE: &str = "index.bin";
/// Folder inside a profile holding copies of its source images
pub const IMAGES_DIRECTORY: &str = "images";
/// Suffix added to default collage file names
pub const OUTPUT_SUFFIX: &str = "_collage";

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
