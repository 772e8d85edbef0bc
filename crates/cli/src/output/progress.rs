//! Progress spinner for long-running listings
//!
//! A full bucket scan can take minutes, so `du` and `parts` keep a spinner
//! on stderr showing the running totals.

use humansize::{BINARY, format_size};
use ossdu_core::{AggregationTotals, PartRecord, PendingUpload, UsageObserver};

use super::OutputConfig;

/// Progress spinner wrapper
///
/// In quiet, JSON or no-progress mode, progress is suppressed.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a spinner for indeterminate progress
    pub fn spinner(config: &OutputConfig, message: &str) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            None
        } else {
            let bar = indicatif::ProgressBar::new_spinner();
            bar.set_style(
                indicatif::ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .expect("valid template"),
            );
            bar.set_message(message.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(bar)
        };

        Self { bar }
    }

    /// Set message
    pub fn set_message(&self, message: String) {
        if let Some(bar) = &self.bar {
            bar.set_message(message);
        }
    }

    /// Print a line above the spinner without tearing it
    pub fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    /// Finish and clear the spinner
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if the spinner is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

/// Feeds the running totals of a usage run into a spinner
pub struct UsageProgress {
    bar: ProgressBar,
}

impl UsageProgress {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl UsageObserver for UsageProgress {
    fn objects_listed(&self, totals: &AggregationTotals) {
        self.bar.set_message(describe(totals));
    }

    fn uploads_listed(&self, _uploads: usize, totals: &AggregationTotals) {
        self.bar.set_message(describe(totals));
    }

    fn parts_listed(
        &self,
        _upload: &PendingUpload,
        _parts: &[PartRecord],
        totals: &AggregationTotals,
    ) {
        self.bar.set_message(describe(totals));
    }
}

fn describe(totals: &AggregationTotals) -> String {
    format!(
        "objects: {} ({})  uploads: {}  parts: {} ({})",
        totals.object_count,
        format_size(totals.object_sum_size.max(0) as u64, BINARY),
        totals.upload_count,
        totals.part_count,
        format_size(totals.part_sum_size.max(0) as u64, BINARY),
    )
}
