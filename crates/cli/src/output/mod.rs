//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also handles the progress spinner and the size
//! units of the du report.

mod formatter;
mod progress;
mod units;

use ossdu_core::Defaults;

pub use formatter::Formatter;
pub use progress::{ProgressBar, UsageProgress};
pub use units::{BlockSize, format_mib};

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress display
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Fold in the `[defaults]` table of the config file
    ///
    /// Flags can only switch JSON on and progress off, so a setting from
    /// either source wins.
    pub fn with_defaults(mut self, defaults: &Defaults) -> Self {
        if defaults.output.eq_ignore_ascii_case("json") {
            self.json = true;
        }
        if !defaults.progress {
            self.no_progress = true;
        }
        self
    }
}
