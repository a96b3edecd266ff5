//! Progress reporting utilities

use crate::error::Side;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// One spinner per side while both sources are fetched
#[derive(Debug)]
pub struct FetchProgress {
    _multi: Option<MultiProgress>,
    pub left_pb: Option<ProgressBar>,
    pub right_pb: Option<ProgressBar>,
}

impl FetchProgress {
    /// Create progress reporter for a two-sided fetch
    pub fn new_for_diff(left_label: &str, right_label: &str) -> Self {
        let multi = MultiProgress::new();
        let left_pb = multi.add(create_spinner(&format!("Fetching {}...", left_label)));
        let right_pb = multi.add(create_spinner(&format!("Fetching {}...", right_label)));

        Self {
            _multi: Some(multi),
            left_pb: Some(left_pb),
            right_pb: Some(right_pb),
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            _multi: None,
            left_pb: None,
            right_pb: None,
        }
    }

    fn bar(&self, side: Side) -> Option<&ProgressBar> {
        match side {
            Side::Left => self.left_pb.as_ref(),
            Side::Right => self.right_pb.as_ref(),
        }
    }

    /// Update a side's message without finishing
    pub fn update(&self, side: Side, message: &str) {
        if let Some(pb) = self.bar(side) {
            pb.set_message(message.to_string());
        }
    }

    /// Finish a side's spinner, leaving the message visible
    pub fn finish(&self, side: Side, message: &str) {
        if let Some(pb) = self.bar(side) {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for FetchProgress {
    fn drop(&mut self) {
        // Ensure all progress bars are cleaned up silently
        if let Some(pb) = self.left_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.right_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
