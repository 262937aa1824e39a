// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Coarse "how long ago" text, e.g. `3m ago`.
pub fn describe_age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - since).num_seconds().max(0);
    match secs {
        0..=59 => format!("{}s ago", secs),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_rfc3339_uses_z_suffix() {
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2026-03-01T12:30:00Z");
    }

    #[test]
    fn test_describe_age_units() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(describe_age(now - Duration::seconds(5), now), "5s ago");
        assert_eq!(describe_age(now - Duration::minutes(3), now), "3m ago");
        assert_eq!(describe_age(now - Duration::hours(2), now), "2h ago");
        assert_eq!(describe_age(now - Duration::days(4), now), "4d ago");
        assert_eq!(describe_age(now + Duration::minutes(1), now), "0s ago");
    }
}
