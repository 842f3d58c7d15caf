use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Zone names that mean a zero offset.
const UTC_NAMES: &[&str] = &["UTC", "GMT"];

/// Calendar day of a `Last Visited` value.
///
/// Offset-bearing timestamps keep the date in their own offset.
pub fn parse_visit_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    let local = strip_utc_name(value);

    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date_naive())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(local, fmt).ok())
        })
        .or_else(|| parse_compact(local))
}

fn strip_utc_name(value: &str) -> &str {
    UTC_NAMES
        .iter()
        .find_map(|name| {
            let rest = value.strip_suffix(name)?;
            rest.strip_suffix(' ').map(str::trim_end)
        })
        .unwrap_or(value)
}

/// `YYYYMMDD`, optionally followed by `THHMMSS[.fff]`.
fn parse_compact(value: &str) -> Option<NaiveDate> {
    let (date, time) = match value.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (value, None),
    };

    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(time) = time {
        if time.len() < 6 || !time.as_bytes()[..6].iter().all(u8::is_ascii_digit) {
            return None;
        }
        NaiveTime::parse_from_str(time, "%H%M%S%.f").ok()?;
    }

    let year = date[..4].parse().ok()?;
    let month = date[4..6].parse().ok()?;
    let day = date[6..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Non-negative visit count, or `None` if `value` is not one.
///
/// Whole-number decimals such as `3.0` are accepted and truncated.
pub fn parse_visit_count(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(count) = value.parse::<u64>() {
        return Some(count);
    }

    match value.parse::<f64>() {
        Ok(count) if count.is_finite() && count >= 0.0 && count <= u64::MAX as f64 => {
            Some(count.trunc() as u64)
        }
        _ => None,
    }
}
