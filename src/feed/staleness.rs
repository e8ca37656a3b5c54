// src/feed/staleness.rs
//! Age of the current snapshot and time left until it expires.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Staleness {
    pub last_updated: DateTime<Utc>,
    pub next_refresh: DateTime<Utc>,
    pub elapsed_secs: i64,
    pub remaining_secs: i64,
}

impl Staleness {
    pub fn at(last_updated: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> Self {
        let next_refresh = last_updated + ttl;
        Self {
            last_updated,
            next_refresh,
            elapsed_secs: (now - last_updated).num_seconds().max(0),
            remaining_secs: (next_refresh - now).num_seconds().max(0),
        }
    }

    pub fn is_due(&self) -> bool {
        self.remaining_secs == 0
    }

    pub fn time_until_refresh(&self) -> String {
        format_time_until(Duration::seconds(self.remaining_secs))
    }
}

/// "now", "5m" or "3h 12m".
pub fn format_time_until(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "now".to_string();
    }
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Short relative age of an item; older than a week shows the date.
pub fn format_relative(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - date;
    let days = diff.num_days();
    if days > 7 {
        if date.year() != now.year() {
            date.format("%b %-d, %Y").to_string()
        } else {
            date.format("%b %-d").to_string()
        }
    } else if days > 0 {
        format!("{days}d ago")
    } else if diff.num_hours() > 0 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_minutes() > 0 {
        format!("{}m ago", diff.num_minutes())
    } else {
        "Just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn countdown_formats() {
        assert_eq!(format_time_until(Duration::seconds(-5)), "now");
        assert_eq!(format_time_until(Duration::minutes(59)), "59m");
        assert_eq!(format_time_until(Duration::minutes(23 * 60 + 5)), "23h 5m");
    }

    #[test]
    fn relative_ages() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now - Duration::seconds(30), now), "Just now");
        assert_eq!(format_relative(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_relative(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_relative(now - Duration::days(2), now), "2d ago");
        assert_eq!(format_relative(now - Duration::days(10), now), "Jun 5");
        let last_year = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(format_relative(last_year, now), "Dec 1, 2023");
    }

    #[test]
    fn staleness_saturates() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let s = Staleness::at(t0, Duration::hours(24), t0 + Duration::hours(25));
        assert_eq!(s.remaining_secs, 0);
        assert!(s.is_due());
        assert_eq!(s.elapsed_secs, 25 * 3600);
        assert_eq!(s.time_until_refresh(), "now");
    }
}
