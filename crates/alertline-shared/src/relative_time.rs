//! Human-readable "time ago" strings for map markers.
//!
//! Buckets follow the conventional humanized thresholds: under 45 s is
//! "a few seconds", under 90 s "a minute", under 45 min "N minutes", and so
//! on up to years. Each bucket rounds to the nearest whole unit.

use chrono::{DateTime, Utc};

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const MONTH_DAYS: f64 = 30.436_875;
const YEAR_DAYS: f64 = 365.242_5;

/// Describe `then` relative to `now`, e.g. `"5 minutes ago"` or
/// `"in 2 hours"`.
pub fn humanize_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta_ms = (now - then).num_milliseconds();
    let phrase = describe((delta_ms.abs() as f64) / 1000.0);
    if delta_ms < 0 {
        format!("in {phrase}")
    } else {
        format!("{phrase} ago")
    }
}

fn describe(secs: f64) -> String {
    let seconds = secs.round();
    if seconds <= 44.0 {
        return "a few seconds".into();
    }
    if seconds <= 89.0 {
        return "a minute".into();
    }

    let minutes = (secs / MINUTE).round();
    if minutes <= 44.0 {
        return format!("{minutes} minutes");
    }
    if minutes <= 89.0 {
        return "an hour".into();
    }

    let hours = (secs / HOUR).round();
    if hours <= 21.0 {
        return format!("{hours} hours");
    }
    if hours <= 35.0 {
        return "a day".into();
    }

    let days = (secs / DAY).round();
    if days <= 25.0 {
        return format!("{days} days");
    }
    if days <= 45.0 {
        return "a month".into();
    }

    let months = (secs / DAY / MONTH_DAYS).round();
    if months <= 10.0 {
        return format!("{months} months");
    }
    if months <= 17.0 {
        return "a year".into();
    }

    let years = (secs / DAY / YEAR_DAYS).round().max(2.0);
    format!("{years} years")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ago(delta: Duration) -> String {
        let now = Utc::now();
        humanize_since(now - delta, now)
    }

    #[test]
    fn test_buckets() {
        assert_eq!(ago(Duration::seconds(3)), "a few seconds ago");
        assert_eq!(ago(Duration::seconds(60)), "a minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(60)), "an hour ago");
        assert_eq!(ago(Duration::hours(3)), "3 hours ago");
        assert_eq!(ago(Duration::hours(30)), "a day ago");
        assert_eq!(ago(Duration::days(4)), "4 days ago");
        assert_eq!(ago(Duration::days(40)), "a month ago");
        assert_eq!(ago(Duration::days(95)), "3 months ago");
        assert_eq!(ago(Duration::days(400)), "a year ago");
        assert_eq!(ago(Duration::days(365 * 3)), "3 years ago");
    }

    #[test]
    fn test_future() {
        let now = Utc::now();
        assert_eq!(
            humanize_since(now + Duration::hours(2), now),
            "in 2 hours"
        );
    }
}
