//! Time codecs
//!
//! Telemetry timestamps arrive in two forms:
//!
//! - ISO day-of-year UTC strings (`yyyy-dddThh:mm:ss.fffffffff`), carrying up
//!   to nanosecond precision
//! - CCSDS Day Segmented (CDS) time codes, as attached by ground stations to
//!   every received frame
//!
//! All conversions here are UTC only. Conversions to other time systems are
//! handled elsewhere.

use crate::error::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NANOS_PER_MILLI: u32 = 1_000_000;
const MILLIS_PER_DAY: u32 = 86_400_000;
const MAX_FRACTION_DIGITS: usize = 9;

/// Output format for [`format_utc`]
const ISO_DOY_FORMAT: &str = "%Y-%jT%H:%M:%S%.9f";

/// Parse a UTC time string.
///
/// The ISO day-of-year form is the native one; RFC 3339 calendar strings are
/// accepted as well. A trailing `Z` is optional for the day-of-year form.
pub fn parse_utc(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    let (date, time) = trimmed
        .split_once('T')
        .ok_or_else(|| Error::time_parse(input, "missing 'T' separator"))?;

    // yyyy-mm-dd is a calendar date, yyyy-ddd is a day-of-year date
    if date.matches('-').count() == 2 {
        return DateTime::parse_from_rfc3339(trimmed)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| Error::time_parse(input, e.to_string()));
    }

    let (year, doy) = date
        .split_once('-')
        .ok_or_else(|| Error::time_parse(input, "expected yyyy-ddd date"))?;
    let year: i32 = parse_field(input, year, "year")?;
    let doy: u32 = parse_field(input, doy, "day of year")?;
    let date = NaiveDate::from_yo_opt(year, doy)
        .ok_or_else(|| Error::time_parse(input, "day of year out of range"))?;

    let time = time.strip_suffix('Z').unwrap_or(time);
    let (clock, fraction) = match time.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (time, None),
    };

    let mut parts = clock.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::time_parse(input, "expected hh:mm:ss time of day"));
    };
    let hour: u32 = parse_field(input, h, "hour")?;
    let minute: u32 = parse_field(input, m, "minute")?;
    let second: u32 = parse_field(input, s, "second")?;

    let mut nanos = match fraction {
        Some(f) => parse_fraction(input, f)?,
        None => 0,
    };

    // second 60 only occurs during a leap second
    let second = if second == 60 {
        nanos += 1_000_000_000;
        59
    } else {
        second
    };

    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| Error::time_parse(input, "time of day out of range"))?;

    Ok(NaiveDateTime::new(date, time).and_utc())
}

/// Format a UTC time as an ISO day-of-year string with nanosecond precision.
#[must_use]
pub fn format_utc(t: &DateTime<Utc>) -> String {
    t.format(ISO_DOY_FORMAT).to_string()
}

/// Sortable key of a time: whole seconds since the Unix epoch, then
/// nanoseconds within that second.
///
/// During a leap second the nanosecond part runs from 1_000_000_000 to
/// 1_999_999_999, so `23:59:60.5` sorts after `23:59:59.x` and before the
/// next day.
#[must_use]
pub fn epoch_key(t: &DateTime<Utc>) -> (i64, u32) {
    (t.timestamp(), t.nanosecond())
}

/// [`epoch_key`] truncated to the start of its millisecond
#[must_use]
pub fn epoch_key_millis(t: &DateTime<Utc>) -> (i64, u32) {
    let (secs, nanos) = epoch_key(t);
    (secs, nanos - nanos % NANOS_PER_MILLI)
}

/// Rebuild a time from whole seconds and a nanosecond remainder.
pub fn from_epoch_parts(secs: i64, nanos: u32) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| Error::OutOfRange(format!("{secs}s + {nanos}ns")))
}

fn parse_field<T: FromStr>(input: &str, field: &str, name: &str) -> Result<T> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::time_parse(input, format!("invalid {name} '{field}'")));
    }
    field
        .parse()
        .map_err(|_| Error::time_parse(input, format!("invalid {name} '{field}'")))
}

fn parse_fraction(input: &str, fraction: &str) -> Result<u32> {
    if fraction.len() > MAX_FRACTION_DIGITS {
        return Err(Error::time_parse(
            input,
            "higher-than-nanosecond precision is not supported",
        ));
    }
    let digits: u32 = parse_field(input, fraction, "fraction of second")?;
    // right-pad to nine digits
    let scale = 10u32.pow((MAX_FRACTION_DIGITS - fraction.len()) as u32);
    Ok(digits * scale)
}

/// CCSDS Day Segmented time code.
///
/// Counts days since 1958-01-01, milliseconds of day, and a sub-millisecond
/// segment in tenths of a microsecond. See CCSDS 301.0-B-4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CdsTimeCode {
    pub day: u32,
    pub ms_of_day: u32,
    pub sub_ms: u32,
}

impl CdsTimeCode {
    /// Create a time code from its three segments
    #[must_use]
    pub const fn new(day: u32, ms_of_day: u32, sub_ms: u32) -> Self {
        Self {
            day,
            ms_of_day,
            sub_ms,
        }
    }

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(1958, 1, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Convert to a UTC time.
    ///
    /// A millisecond-of-day value past the end of the day denotes a leap
    /// second and is only valid within the one extra second.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>> {
        let date = Self::epoch()
            .checked_add_days(Days::new(u64::from(self.day)))
            .ok_or_else(|| Error::OutOfRange(format!("CDS day {}", self.day)))?;

        if self.sub_ms >= 10_000 {
            return Err(Error::OutOfRange(format!("CDS sub-millisecond {}", self.sub_ms)));
        }
        let sub_nanos = self.sub_ms * 100;

        let (secs, nanos) = if self.ms_of_day < MILLIS_PER_DAY {
            (
                self.ms_of_day / 1000,
                (self.ms_of_day % 1000) * NANOS_PER_MILLI + sub_nanos,
            )
        } else {
            let leap_ms = self.ms_of_day - MILLIS_PER_DAY;
            if leap_ms >= 1000 {
                return Err(Error::OutOfRange(format!(
                    "CDS millisecond of day {}",
                    self.ms_of_day
                )));
            }
            (86_399, 1_000_000_000 + leap_ms * NANOS_PER_MILLI + sub_nanos)
        };

        let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
            .ok_or_else(|| Error::OutOfRange(format!("CDS time {self}")))?;
        Ok(NaiveDateTime::new(date, time).and_utc())
    }

    /// Convert from a UTC time, truncating below a tenth of a microsecond.
    pub fn from_datetime(t: &DateTime<Utc>) -> Result<Self> {
        let days = t.date_naive().signed_duration_since(Self::epoch()).num_days();
        let day = u32::try_from(days)
            .map_err(|_| Error::OutOfRange(format!("{} precedes the CDS epoch", format_utc(t))))?;
        let nanos = t.nanosecond();
        Ok(Self {
            day,
            ms_of_day: t.num_seconds_from_midnight() * 1000 + nanos / NANOS_PER_MILLI,
            sub_ms: (nanos % NANOS_PER_MILLI) / 100,
        })
    }

    /// ISO day-of-year string of this time code
    pub fn to_utc_string(&self) -> Result<String> {
        self.to_datetime().map(|t| format_utc(&t))
    }
}

impl fmt::Display for CdsTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{:04}", self.day, self.ms_of_day, self.sub_ms)
    }
}

impl FromStr for CdsTimeCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.split("::").collect();
        let [day, ms, sub_ms] = segments.as_slice() else {
            return Err(Error::time_parse(s, "expected day::ms_of_day::sub_ms"));
        };
        Ok(Self {
            day: parse_field(s, day, "CDS day")?,
            ms_of_day: parse_field(s, ms, "CDS millisecond of day")?,
            sub_ms: parse_field(s, sub_ms, "CDS sub-millisecond")?,
        })
    }
}
