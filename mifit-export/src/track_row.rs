//! One line of `--list` output

use chrono::{DateTime, Local};
use mifit_core::Track;

/// `NNN: YYYY-MM-DD HH:MM:SS: track_<id> (status)`, start time in local time.
pub fn format_track_row(index: usize, track: &Track) -> String {
    let started = track
        .id()
        .start_time()
        .map(|utc| DateTime::<Local>::from(utc).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "????-??-?? ??:??:??".to_string());

    let row = format!(
        "{:03}: {}: track_{} {}",
        index + 1,
        started,
        track.id(),
        track.status().label()
    );
    row.trim_end().to_string()
}
