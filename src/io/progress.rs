//! Per-phase progress display for cache building and assembly

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::LazyLock;

static PHASE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{prefix:>10}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Coordinates one progress bar per processing phase
///
/// A hidden manager hands out hidden bars, so callers can report progress
/// unconditionally. Bars are safe to advance from rayon worker threads.
#[derive(Clone)]
pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a manager drawing to the terminal
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled: true,
        }
    }

    /// Create a manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            enabled: false,
        }
    }

    /// Whether bars are drawn
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start a bar for a phase with `len` steps
    pub fn start_phase(&self, label: &str, len: usize) -> ProgressBar {
        if !self.enabled {
            let bar = ProgressBar::hidden();
            bar.set_length(len as u64);
            return bar;
        }

        let bar = self.multi_progress.add(ProgressBar::new(len as u64));
        bar.set_style(PHASE_STYLE.clone());
        bar.set_prefix(label.to_string());
        bar
    }

    /// Remove all bars from the terminal
    pub fn finish(&self) {
        let _ = self.multi_progress.clear();
    }
}
