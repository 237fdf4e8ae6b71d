//! Cell classification.
//!
//! Spreadsheets store dates and clock times in the same physical cell type: a
//! day count from the 1899-12-30 epoch with a date or time number format.
//! Values at or before 1899-12-31 are read as clock times (durations); later
//! values are calendar dates. Every function here is total: unrecognised
//! content is classified as opaque instead of failing.

use crate::model::{CellKind, RawValue};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Serial zero. A time-formatted cell holding exactly this value is an
/// explicit zero-length shift.
pub static ZERO_DURATION: Lazy<NaiveDateTime> = Lazy::new(|| epoch_date().and_time(NaiveTime::MIN));

/// Largest timestamp still read as a clock time rather than a date.
pub static TIME_CEILING: Lazy<NaiveDateTime> =
    Lazy::new(|| *ZERO_DURATION + Duration::days(1));

const SECONDS_PER_DAY: f64 = 86_400.0;
// Excel's own limit is 9999-12-31 (serial 2_958_465).
const MAX_SERIAL_MAGNITUDE: f64 = 3_000_000.0;

static FORMAT_LITERALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|\\.|_.|\*.|\[[^\]]*\]"#).expect("literal pattern"));
static ELAPSED_TIME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(h+|m+|s+)\]").expect("elapsed pattern"));

const TEXT_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];
const TEXT_TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Converts a spreadsheet serial (1900 date system) into a timestamp,
/// rounded to the nearest second.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial.abs() > MAX_SERIAL_MAGNITUDE {
        return None;
    }
    let seconds = (serial * SECONDS_PER_DAY).round();
    ZERO_DURATION.checked_add_signed(Duration::seconds(seconds as i64))
}

/// Inverse of [`serial_to_datetime`] for whole dates.
pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - epoch_date()).num_days() as f64
}

/// True when a number format code renders dates or times.
pub fn is_temporal_format(code: &str) -> bool {
    if code.is_empty() || code.eq_ignore_ascii_case("general") {
        return false;
    }
    if ELAPSED_TIME_TOKEN.is_match(code) {
        return true;
    }
    let stripped = FORMAT_LITERALS.replace_all(code, "");
    stripped
        .chars()
        .any(|ch| matches!(ch.to_ascii_lowercase(), 'd' | 'm' | 'y' | 'h' | 's'))
}

/// Parses ISO-style date/time text. Bare times are anchored on the epoch so
/// they compare like time-formatted cells.
pub fn parse_temporal_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in TEXT_DATE_TIME_FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(stamp);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    for format in TEXT_TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(text, format) {
            return Some(epoch_date().and_time(time));
        }
    }
    None
}

fn temporal_kind(stamp: NaiveDateTime) -> CellKind {
    if stamp <= *TIME_CEILING {
        CellKind::Time(stamp)
    } else if stamp.time() == NaiveTime::MIN {
        CellKind::Date(stamp.date())
    } else {
        CellKind::Timestamp(stamp)
    }
}

/// Resolves the semantic kind of a raw value. Time takes precedence over
/// date: a value that is both date- and time-shaped is only ever a time.
pub fn classify(raw: &RawValue) -> CellKind {
    if raw.is_empty() {
        return CellKind::Empty;
    }
    match raw {
        RawValue::Empty => CellKind::Empty,
        RawValue::Temporal(stamp) => temporal_kind(*stamp),
        RawValue::Number(number) => CellKind::Number(*number),
        RawValue::Bool(_) => CellKind::Text,
        RawValue::Text(text) => parse_temporal_text(text)
            .map(temporal_kind)
            .unwrap_or(CellKind::Text),
    }
}

pub fn is_calendar_date(raw: &RawValue) -> bool {
    classify(raw).is_calendar_date()
}

pub fn is_clock_time(raw: &RawValue) -> bool {
    classify(raw).is_clock_time()
}

pub fn is_positive_duration(raw: &RawValue) -> bool {
    classify(raw).is_positive_duration()
}

pub fn is_empty(raw: &RawValue) -> bool {
    raw.is_empty()
}

impl CellKind {
    pub fn is_calendar_date(&self) -> bool {
        matches!(self, CellKind::Date(_))
    }

    pub fn is_clock_time(&self) -> bool {
        matches!(self, CellKind::Time(_))
    }

    pub fn is_positive_duration(&self) -> bool {
        matches!(self, CellKind::Time(stamp) if *stamp > *ZERO_DURATION)
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellKind::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveDateTime> {
        match self {
            CellKind::Time(stamp) => Some(*stamp),
            _ => None,
        }
    }
}

/// Hours worked for a clock-time value: whole hours plus minutes / 60.
/// Seconds are dropped, not rounded. Hours count from the zero epoch, so the
/// `24:00` ceiling is a full day rather than zero.
pub fn decimal_hours(stamp: NaiveDateTime) -> f64 {
    let minutes = (stamp - *ZERO_DURATION).num_minutes();
    (minutes / 60) as f64 + (minutes % 60) as f64 / 60.0
}
