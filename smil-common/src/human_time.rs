//! Human-readable time values
//!
//! Parses the time expressions found in timed documents (`begin="12.5s"`,
//! `dur="2min"`, `end="1:02:03"`) into deci-seconds, and formats deci-second
//! values back for logs and trace output.
//!
//! # Grammar
//!
//! ```text
//! time        = [sign] ( clock-value | timecount [unit] )
//! clock-value = [hours ":"] minutes ":" seconds["." fraction]
//! timecount   = digits ["." digits]        (a single decimal point)
//! unit        = "ms" | "m…" (×60) | "h…" (×3600) | anything else (seconds)
//! ```
//!
//! A value without a numeric literal does not parse; callers treat that as
//! "no constraint" (zero offset) or try the event-reference grammar instead.

use crate::timing::{DECISECONDS_PER_HOUR, DECISECONDS_PER_MINUTE, DECISECONDS_PER_SECOND};

/// Display format thresholds (deci-seconds)
const SHORT_FORMAT_MAX: i64 = 1_000; // < 100s → S.Ss
const MEDIUM_FORMAT_MAX: i64 = 60_000; // < 100m → M:SS.S
                                        // >= 100m → H:MM:SS.S

/// Parse a time expression into deci-seconds.
///
/// Returns `None` when no numeric literal is present, so `"indefinite"`,
/// `"media"` and `"foo.begin"` are all left to the caller.
///
/// # Examples
///
/// ```
/// use smil_common::human_time::parse_time;
///
/// assert_eq!(parse_time("12.5s"), Some(125));
/// assert_eq!(parse_time("2min"), Some(1_200));
/// assert_eq!(parse_time("1h"), Some(36_000));
/// assert_eq!(parse_time("-1.5"), Some(-15));
/// assert_eq!(parse_time("1:02:03"), Some(37_230));
/// assert_eq!(parse_time("500ms"), Some(5));
/// assert_eq!(parse_time("indefinite"), None);
/// ```
pub fn parse_time(value: &str) -> Option<i64> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first() {
        Some(b'-') => (-1, &value[1..]),
        Some(b'+') => (1, &value[1..]),
        _ => (1, value),
    };
    let rest = rest.trim_start();

    if rest.contains(':') {
        return parse_clock_value(rest).map(|ds| sign * ds);
    }

    let literal_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let literal = &rest[..literal_end];
    if literal.matches('.').count() > 1 || !literal.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: f64 = literal.parse().ok()?;

    let tail = rest[literal_end..].trim_start();
    let unit_end = tail
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(tail.len());
    if !tail[unit_end..].trim().is_empty() {
        return None;
    }
    let unit = tail[..unit_end].to_ascii_lowercase();

    let seconds = if unit.starts_with("ms") {
        number / 1000.0
    } else if unit.starts_with('m') {
        number * 60.0
    } else if unit.starts_with('h') {
        number * 3600.0
    } else {
        number
    };

    Some(sign * (seconds * DECISECONDS_PER_SECOND as f64).round() as i64)
}

/// Parse `h:mm:ss(.f)` or `mm:ss(.f)` into deci-seconds
fn parse_clock_value(value: &str) -> Option<i64> {
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let (last, leading) = parts.split_last()?;
    let mut ds = 0_i64;
    let scales = [DECISECONDS_PER_HOUR, DECISECONDS_PER_MINUTE];
    let scales = &scales[scales.len() + 1 - parts.len()..];
    for (part, scale) in leading.iter().zip(scales) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let scaled = part.parse::<i64>().ok()?.checked_mul(*scale)?;
        ds = ds.checked_add(scaled)?;
    }

    if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let seconds: f64 = last.parse().ok()?;
    ds.checked_add((seconds * DECISECONDS_PER_SECOND as f64).round() as i64)
}

/// Format deci-seconds as a human-readable time.
///
/// - Short format (`S.Ss`): below 100 seconds
/// - Medium format (`M:SS.S`): below 100 minutes
/// - Long format (`H:MM:SS.S`): everything else
///
/// # Examples
///
/// ```
/// use smil_common::human_time::format_deciseconds;
///
/// assert_eq!(format_deciseconds(125), "12.5s");
/// assert_eq!(format_deciseconds(1_234), "2:03.4");
/// assert_eq!(format_deciseconds(72_030), "2:00:03.0");
/// assert_eq!(format_deciseconds(-15), "-1.5s");
/// ```
pub fn format_deciseconds(deciseconds: i64) -> String {
    let is_negative = deciseconds < 0;
    let abs = deciseconds.unsigned_abs() as i64;

    let formatted = if abs < SHORT_FORMAT_MAX {
        format!("{}.{}s", abs / 10, abs % 10)
    } else if abs < MEDIUM_FORMAT_MAX {
        let minutes = abs / DECISECONDS_PER_MINUTE;
        let rem = abs % DECISECONDS_PER_MINUTE;
        format!("{}:{:02}.{}", minutes, rem / 10, rem % 10)
    } else {
        let hours = abs / DECISECONDS_PER_HOUR;
        let minutes = (abs % DECISECONDS_PER_HOUR) / DECISECONDS_PER_MINUTE;
        let rem = abs % DECISECONDS_PER_MINUTE;
        format!("{}:{:02}:{:02}.{}", hours, minutes, rem / 10, rem % 10)
    };

    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}
