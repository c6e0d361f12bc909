//! Log output setup for the command-line binary

use env_logger::{Builder, Env};

/// Default filter when `RUST_LOG` is unset
pub const fn default_filter(quiet: bool) -> &'static str {
    if quiet { "warn" } else { "info" }
}

/// Install the global logger
///
/// `RUST_LOG` takes precedence over the quiet flag. Calling this more than
/// once keeps the first logger.
pub fn init(quiet: bool) {
    let _ = Builder::from_env(Env::default().default_filter_or(default_filter(quiet)))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
