/// Command-line parsing and command orchestration
pub mod cli;
/// Pipeline constants and defaults
pub mod configuration;
/// Error types and result aliases
pub mod error;
/// Raster format detection, decoding and encoding
pub mod image;
/// Logger installation for the binary
pub mod logging;
/// Progress bars for long-running stages
pub mod progress;
/// Durable storage of named profiles
pub mod store;
