// src/ingest/dates.rs
//! Date formats used by the remote sources, converted to epoch milliseconds.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

use crate::error::ParseError;

/// Fixed offset for a source's local time. Out-of-range values fall back to UTC.
pub fn fixed_offset(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Forum style `dd.mm.yyyy[ HH:MM]`, optionally followed by a `~` marker and
/// an edit time, which is ignored. Day comes first; month is 1-based.
pub fn parse_forum_date(raw: &str, offset: FixedOffset) -> Result<i64, ParseError> {
    let head = raw.split('~').next().unwrap_or_default().trim();
    let mut parts = head.split_whitespace();

    let day_part = parts.next().ok_or_else(|| ParseError::date(raw))?;
    let dmy: Vec<&str> = day_part.split('.').collect();
    let [d, m, y] = dmy.as_slice() else {
        return Err(ParseError::date(raw));
    };
    let day: u32 = d.parse().map_err(|_| ParseError::date(raw))?;
    let month: u32 = m.parse().map_err(|_| ParseError::date(raw))?;
    let year: i32 = y.parse().map_err(|_| ParseError::date(raw))?;

    let (hour, minute) = match parts.next() {
        Some(t) => {
            let (h, mi) = t.split_once(':').ok_or_else(|| ParseError::date(raw))?;
            let h: u32 = h.parse().map_err(|_| ParseError::date(raw))?;
            let mi: u32 = mi.parse().map_err(|_| ParseError::date(raw))?;
            (h, mi)
        }
        None => (0, 0),
    };

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| ParseError::date(raw))?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| ParseError::date(raw))?;
    local_to_millis(date.and_time(time), offset).ok_or_else(|| ParseError::date(raw))
}

/// Social search style, e.g. `Wed Aug 27 13:08:45 +0000 2008`.
pub fn parse_social_date(raw: &str) -> Result<i64, ParseError> {
    DateTime::parse_from_str(raw.trim(), "%a %b %d %H:%M:%S %z %Y")
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| ParseError::date(raw))
}

/// RFC 3339, or a naive ISO datetime taken to be in `offset`.
pub fn parse_iso_date(raw: &str, offset: FixedOffset) -> Result<i64, ParseError> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return local_to_millis(naive, offset).ok_or_else(|| ParseError::date(raw));
        }
    }
    Err(ParseError::date(raw))
}

fn local_to_millis(naive: NaiveDateTime, offset: FixedOffset) -> Option<i64> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp_millis())
}
