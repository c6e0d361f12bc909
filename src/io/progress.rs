//! Stage progress display for long-running gather and create loops

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;

static STAGE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "[{{elapsed_precise}}] {{prefix}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Progress bar for one pipeline stage at a time
///
/// A reporter created with `enabled = false` accepts every call and draws
/// nothing, so callers never branch on quiet mode themselves.
pub struct ProgressReporter {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// Create a reporter; disabled reporters draw nothing
    pub const fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    /// Reporter that never draws, for library callers and tests
    pub const fn hidden() -> Self {
        Self::new(false)
    }

    /// Begin a stage of `len` steps, replacing any unfinished stage
    pub fn start_stage(&mut self, label: &str, len: usize) {
        self.finish_stage();
        if !self.enabled {
            return;
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(STAGE_STYLE.clone());
        bar.set_prefix(label.to_string());
        self.bar = Some(bar);
    }

    /// Advance the current stage by one step, showing `message`
    pub fn advance(&self, message: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(message.to_string());
            bar.inc(1);
        }
    }

    /// Complete and clear the current stage
    pub fn finish_stage(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish_stage();
    }
}
