//! Spinners shown while external commands run.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(80);

/// Spinner for an operation of unknown length.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

pub fn finish_ok(pb: &ProgressBar, msg: &str) {
    finish_with(pb, "✓", msg);
}

pub fn finish_err(pb: &ProgressBar, msg: &str) {
    finish_with(pb, "✗", msg);
}

fn finish_with(pb: &ProgressBar, prefix: &str, msg: &str) {
    if let Ok(style) = ProgressStyle::default_spinner().template("{prefix} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.finish_with_message(msg.to_string());
}
