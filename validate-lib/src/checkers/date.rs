use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{Comparator, DateFormat};

static ISO_DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static TIME_24_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])$").unwrap());
static TIME_12_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(1[0-2]|0?[1-9]):([0-5][0-9]) ?([AaPp][Mm])$").unwrap());
static COMPACT_DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").unwrap());
static YEAR_MONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(0[1-9]|1[0-2])$").unwrap());
static YEAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4}|0)$").unwrap());

const GENERIC_DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const GENERIC_DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
];

/// Right-hand side of a date comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOperand<'a> {
    /// The `current_date` sentinel, resolved once per row
    Now(NaiveDateTime),
    /// Value of the compare column in the same row
    Value(&'a str),
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn capture_u32(caps: &regex::Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn capture_i32(caps: &regex::Captures<'_>, index: usize) -> Option<i32> {
    caps.get(index)?.as_str().parse().ok()
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE_REGEX.captures(value)?;
    NaiveDate::from_ymd_opt(
        capture_i32(&caps, 1)?,
        capture_u32(&caps, 2)?,
        capture_u32(&caps, 3)?,
    )
}

fn parse_time_24(value: &str) -> Option<NaiveTime> {
    let caps = TIME_24_REGEX.captures(value)?;
    NaiveTime::from_hms_opt(
        capture_u32(&caps, 1)?,
        capture_u32(&caps, 2)?,
        capture_u32(&caps, 3)?,
    )
}

fn parse_time_12(value: &str) -> Option<NaiveTime> {
    let caps = TIME_12_REGEX.captures(value)?;
    let hour = capture_u32(&caps, 1)? % 12;
    let minute = capture_u32(&caps, 2)?;
    let afternoon = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
    NaiveTime::from_hms_opt(if afternoon { hour + 12 } else { hour }, minute, 0)
}

/// Parse `value` under one date format. Times of day are placed on `anchor`.
pub fn parse_with_format(
    value: &str,
    format: &DateFormat,
    anchor: NaiveDate,
) -> Option<NaiveDateTime> {
    match format {
        DateFormat::IsoDate => parse_iso_date(value).map(|date| date.and_time(NaiveTime::MIN)),
        DateFormat::IsoDateTime => {
            let (date, time) = value.split_once(' ')?;
            Some(parse_iso_date(date)?.and_time(parse_time_24(time)?))
        }
        DateFormat::Time12Hour => parse_time_12(value).map(|time| anchor.and_time(time)),
        DateFormat::CompactDate => {
            let caps = COMPACT_DATE_REGEX.captures(value)?;
            // Reshaped into YYYY-MM-DD so both spellings validate the same way
            let reshaped = format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]);
            parse_iso_date(&reshaped).map(|date| date.and_time(NaiveTime::MIN))
        }
        DateFormat::YearMonth => {
            let caps = YEAR_MONTH_REGEX.captures(value)?;
            NaiveDate::from_ymd_opt(capture_i32(&caps, 1)?, capture_u32(&caps, 2)?, 1)
                .map(|date| date.and_time(NaiveTime::MIN))
        }
        DateFormat::Year => {
            let caps = YEAR_REGEX.captures(value)?;
            NaiveDate::from_ymd_opt(capture_i32(&caps, 1)?, 1, 1)
                .map(|date| date.and_time(NaiveTime::MIN))
        }
        DateFormat::Unknown(_) => None,
    }
}

pub fn matches_format(value: &str, format: &DateFormat) -> bool {
    parse_with_format(value, format, epoch()).is_some()
}

/// Lenient parser for datetime columns without a format list.
pub fn parse_generic(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_utc());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc2822(value) {
        return Some(datetime.naive_utc());
    }
    for pattern in GENERIC_DATETIME_PATTERNS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(datetime);
        }
    }
    for pattern in GENERIC_DATE_PATTERNS {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    parse_with_format(value, &DateFormat::Year, epoch())
}

/// Drop the parts of `now` that the format cannot express.
fn truncate_to_format(now: NaiveDateTime, format: &DateFormat) -> NaiveDateTime {
    let date = now.date();
    let truncated = match format {
        DateFormat::IsoDate | DateFormat::CompactDate => Some(date.and_time(NaiveTime::MIN)),
        DateFormat::YearMonth => date.with_day(1).map(|d| d.and_time(NaiveTime::MIN)),
        DateFormat::Year => date
            .with_day(1)
            .and_then(|d| d.with_month(1))
            .map(|d| d.and_time(NaiveTime::MIN)),
        DateFormat::Time12Hour => now.with_second(0).and_then(|t| t.with_nanosecond(0)),
        DateFormat::IsoDateTime | DateFormat::Unknown(_) => now.with_nanosecond(0),
    };
    truncated.unwrap_or(now)
}

pub fn compare_ordered<T: PartialOrd>(left: &T, right: &T, comparator: &Comparator) -> bool {
    match comparator {
        Comparator::Equal => left == right,
        Comparator::Greater => left > right,
        Comparator::GreaterEq => left >= right,
        Comparator::Lesser => left < right,
        Comparator::LesserEq => left <= right,
        Comparator::Unknown(_) => false,
    }
}

/// Format-aware comparison of a date value against another column or the current date.
///
/// Both sides blank on a non-required column holds. Any side that cannot be
/// parsed makes the comparison fail.
pub fn compare_dates(
    value: &str,
    operand: CompareOperand<'_>,
    comparator: &Comparator,
    format: &DateFormat,
    required: bool,
) -> bool {
    let operand_blank = matches!(operand, CompareOperand::Value(text) if text.is_empty());
    if !required && value.is_empty() && operand_blank {
        return true;
    }

    let (anchor, right) = match operand {
        CompareOperand::Now(now) => (now.date(), Some(truncate_to_format(now, format))),
        CompareOperand::Value(text) => (
            epoch(),
            parse_with_format(text, format, epoch()).or_else(|| parse_generic(text)),
        ),
    };
    let Some(right) = right else {
        return false;
    };
    let Some(left) = parse_with_format(value, format, anchor) else {
        return false;
    };

    compare_ordered(&left, &right, comparator)
}
