// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a UTC timestamp in ANSI C `asctime` layout (`Mon Jan  2 15:04:05 2006`).
pub fn format_ansic(date: DateTime<Utc>) -> String {
    date.format("%a %b %e %H:%M:%S %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_ansic_pads_day() {
        let date = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(format_ansic(date), "Mon Jan  2 15:04:05 2006");
    }

    #[test]
    fn test_format_rfc3339_uses_z() {
        let date = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-03-10T08:00:00Z");
    }
}
