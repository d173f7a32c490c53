//! Display formatting
//!
//! Pure functions turning durations, tempo ratios and pitch offsets into the
//! strings shown on screen. None of them touch player state.

use crate::config::Labels;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Format a duration in seconds as `M:SS`.
///
/// Non-finite input (unknown duration, NaN) yields `"0:00"`. Negative
/// values are treated as zero. Both components are truncated, never rounded.
///
/// # Example
/// ```
/// use retempo::format::format_time;
/// assert_eq!(format_time(225.9), "3:45");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "0:00".to_string();
    }
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{minutes}:{secs:02}")
}

/// Tempo ratio with two decimals and a multiplication sign, e.g. `1.25×`
pub fn tempo_label(ratio: f64) -> String {
    format!("{ratio:.2}×")
}

/// Pitch offset label.
///
/// Zero reads `0 <unit>`. Positive offsets carry an explicit `+`. The plural
/// unit is used once the magnitude exceeds one semitone.
///
/// # Example
/// ```
/// use retempo::config::Labels;
/// use retempo::format::pitch_label;
/// let labels = Labels::default();
/// assert_eq!(pitch_label(5.0, &labels), "+5 demi-tons");
/// assert_eq!(pitch_label(-1.0, &labels), "-1 demi-ton");
/// ```
pub fn pitch_label(semitones: f64, labels: &Labels) -> String {
    if semitones == 0.0 {
        return format!("0 {}", labels.semitone);
    }
    let unit = if semitones.abs() > 1.0 {
        &labels.semitones
    } else {
        &labels.semitone
    };
    let sign = if semitones > 0.0 { "+" } else { "" };
    format!("{sign}{semitones} {unit}")
}

/// File size hint shown under the track title, e.g. `4.2 Mo ...`
pub fn file_hint(size_bytes: u64, labels: &Labels) -> String {
    let mib = size_bytes as f64 / BYTES_PER_MIB;
    format!("{mib:.1} {}", labels.file_hint_suffix)
}
