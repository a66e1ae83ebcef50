//! Timestamp formatting for cut lists and reports.

/// Format seconds as `HH:MM:SS.mmm`.
///
/// Negative and non-finite inputs format as zero.
///
/// # Examples
/// ```
/// use mcatch_models::timestamp::format_timestamp;
/// assert_eq!(format_timestamp(5400.0), "01:30:00.000");
/// assert_eq!(format_timestamp(90.25), "00:01:30.250");
/// ```
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_ms = (seconds * 1000.0).round() as u64;

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
        assert_eq!(format_timestamp(3.0), "00:00:03.000");
        assert_eq!(format_timestamp(28.5), "00:00:28.500");
        assert_eq!(format_timestamp(3661.001), "01:01:01.001");
    }

    #[test]
    fn test_format_timestamp_degenerate() {
        assert_eq!(format_timestamp(-4.0), "00:00:00.000");
        assert_eq!(format_timestamp(f64::NAN), "00:00:00.000");
    }
}
