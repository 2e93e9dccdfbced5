//! Unit formatting for dashboard cells.

const BYTE_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Binary-unit size with two decimals: `1536` → `1.50 KiB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", BYTE_UNITS[unit])
}

/// `93784` → `1d 2h 3m 4s`. The day field is omitted when zero.
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = secs % 86_400 / 3_600;
    let minutes = secs % 3_600 / 60;
    let seconds = secs % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else {
        format!("{hours}h {minutes}m {seconds}s")
    }
}

/// Seconds between two unix timestamps, clamped at zero.
pub fn clamped_delta(later: i64, earlier: i64) -> u64 {
    u64::try_from(later.saturating_sub(earlier)).unwrap_or(0)
}

/// `"<n>s ago"`; timestamps in the future read as `0s ago`.
pub fn seconds_ago(now: i64, then: i64) -> String {
    format!("{}s ago", clamped_delta(now, then))
}

/// Floored percentage of `part` in `sum`; 0 when `sum` is 0.
pub fn floor_pct(part: u64, sum: u64) -> u64 {
    if sum == 0 {
        0
    } else {
        (u128::from(part) * 100 / u128::from(sum)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(4 * 1024 * 1024), "4.00 MiB");
        assert_eq!(format_bytes(u64::MAX), "16.00 EiB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0h 0m 0s");
        assert_eq!(format_duration(3_725), "1h 2m 5s");
        assert_eq!(format_duration(93_784), "1d 2h 3m 4s");
    }

    #[test]
    fn ago_is_clamped() {
        assert_eq!(seconds_ago(1_700_000_010, 1_700_000_000), "10s ago");
        assert_eq!(seconds_ago(1_700_000_000, 1_700_000_050), "0s ago");
    }

    #[test]
    fn percentages_floor() {
        assert_eq!(floor_pct(1, 3), 33);
        assert_eq!(floor_pct(2, 3), 66);
        assert_eq!(floor_pct(5, 0), 0);
        assert_eq!(floor_pct(u64::MAX, u64::MAX), 100);
    }
}
