//! Time formatting helpers.

/// Format a duration in seconds to a human-readable string.
///
/// Negative durations (clock going backwards between blocks) keep their sign.
pub fn format_duration(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let body = if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    };
    format!("{sign}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_unit() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(600), "10m 0s");
        assert_eq!(format_duration(6 * 3600 + 60), "6h 1m");
        assert_eq!(format_duration(1_209_600), "14d 0h");
    }

    #[test]
    fn keeps_sign() {
        assert_eq!(format_duration(-90), "-1m 30s");
    }
}
