//! Lenient date parsing for feed timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a feed date.
///
/// Tries RFC 2822 (RSS `pubDate`), RFC 3339 (Atom), and a few common
/// variants. Returns None instead of failing on anything unrecognised.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // RFC 2822 with a named zone chrono doesn't know, e.g. "... 10:00:00 UTC"
    if let Some((head, zone)) = s.rsplit_once(' ') {
        if zone.chars().all(|c| c.is_ascii_alphabetic()) {
            if let Ok(dt) = DateTime::parse_from_rfc2822(&format!("{head} +0000")) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
