//! Lightweight progress reporting for the load cycle.
//!
//! The loader emits typed events; the facade forwards them through this
//! trait. Use `NoopProgress` for headless callers and `BarProgress` for a
//! CLI/TTY.

use indicatif::{ProgressBar, ProgressStyle};

/// Minimal progress sink for one load cycle.
pub trait Progress: Send + Sync {
    /// One chunk advanced; `current` of `total` are done.
    fn advance(&self, _current: u64, _total: u64, _msg: &str) {}
    /// Phase message without a position change.
    fn message(&self, _msg: &str) {}
    /// Load cycle finished.
    fn finish(&self, _msg: &str) {}
}

/// No-op sink for headless runs.
#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

/// Indicatif-based chunk download bar.
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}/{len:3} chunks {msg}")
                .unwrap(),
        );
        Self { pb }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn advance(&self, current: u64, total: u64, msg: &str) {
        self.pb.set_length(total);
        self.pb.set_position(current);
        self.pb.set_message(msg.to_string());
    }
    fn message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }
    fn finish(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
