//! Calendar arithmetic: unix conversion, shifting, comparison and the
//! weekday/yearday/week helpers.

use crate::error::DateTimeError;
use crate::packed::{DateTime, DateTimeParts, FormatHint, Precision};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::cmp::Ordering;

const MS_PER_DAY: i64 = 86_400_000;

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn naive_date(value: DateTime) -> Option<NaiveDate> {
    let (year, month, day) = match value.precision() {
        Precision::TimeOnly => (1970, 1, 1),
        Precision::YearOnly => (value.year(), 1, 1),
        Precision::DateOnly | Precision::DateTime => {
            (value.year(), value.month().max(1), value.day().max(1))
        }
    };
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn naive(value: DateTime) -> Result<NaiveDateTime, DateTimeError> {
    let date = naive_date(value)
        .ok_or_else(|| DateTimeError::invalid(format!("{} is not a calendar date", value)))?;
    let time = if value.precision().has_time() {
        NaiveTime::from_hms_milli_opt(
            value.hour() as u32,
            value.minute() as u32,
            value.second() as u32,
            value.millisecond() as u32,
        )
        .ok_or_else(|| DateTimeError::invalid(format!("{} is not a time of day", value)))?
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time))
}

fn from_naive(
    naive: NaiveDateTime,
    tz_offset: Option<i16>,
    hint: FormatHint,
    precision: Precision,
) -> Result<DateTime, DateTimeError> {
    DateTime::pack(DateTimeParts {
        year: naive.year(),
        month: naive.month() as u8,
        day: naive.day() as u8,
        hour: naive.hour() as u8,
        minute: naive.minute() as u8,
        second: naive.second() as u8,
        millisecond: (naive.nanosecond() / 1_000_000).min(999) as u16,
        tz_offset,
        precision,
        hint,
    })
}

fn offset_ms(value: DateTime) -> i64 {
    value.tz_offset().unwrap_or(0) as i64 * 60_000
}

/// Milliseconds since the unix epoch. A value without a timezone is read as UTC.
pub fn to_unix_ms(value: DateTime) -> Result<i64, DateTimeError> {
    let local = naive(value)?.and_utc().timestamp_millis();
    Ok(local - offset_ms(value))
}

pub fn to_unix(value: DateTime) -> Result<i64, DateTimeError> {
    to_unix_ms(value).map(|ms| ms.div_euclid(1000))
}

/// A UTC date-time for the given epoch milliseconds.
pub fn from_unix_ms(ms: i64) -> Result<DateTime, DateTimeError> {
    let utc = chrono::DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DateTimeError::range("unix", ms))?;
    from_naive(
        utc.naive_utc(),
        Some(0),
        FormatHint::IsoUtc,
        Precision::DateTime,
    )
}

pub fn from_unix(seconds: i64) -> Result<DateTime, DateTimeError> {
    let ms = seconds
        .checked_mul(1000)
        .ok_or_else(|| DateTimeError::range("unix", seconds))?;
    from_unix_ms(ms)
}

fn time_of_day_ms(value: DateTime) -> i64 {
    ((value.hour() as i64 * 60 + value.minute() as i64) * 60 + value.second() as i64) * 1000
        + value.millisecond() as i64
}

fn with_time_of_day(value: DateTime, ms: i64) -> Result<DateTime, DateTimeError> {
    let ms = ms.rem_euclid(MS_PER_DAY);
    let mut parts = value.unpack();
    parts.hour = (ms / 3_600_000) as u8;
    parts.minute = (ms / 60_000 % 60) as u8;
    parts.second = (ms / 1000 % 60) as u8;
    parts.millisecond = (ms % 1000) as u16;
    DateTime::pack(parts)
}

fn shift_local(value: DateTime, delta_ms: i64) -> Result<DateTime, DateTimeError> {
    let local = naive(value)?
        .and_utc()
        .timestamp_millis()
        .checked_add(delta_ms)
        .ok_or_else(|| DateTimeError::range("milliseconds", delta_ms))?;
    let shifted = chrono::DateTime::from_timestamp_millis(local)
        .ok_or_else(|| DateTimeError::range("unix", local))?;
    let precision = if value.precision() == Precision::DateOnly
        && value.day() != 0
        && delta_ms % MS_PER_DAY == 0
    {
        Precision::DateOnly
    } else {
        Precision::DateTime
    };
    from_naive(shifted.naive_utc(), value.tz_offset(), value.hint(), precision)
}

/// Adds `seconds` (possibly negative), keeping the timezone. Time-only
/// values wrap around midnight.
pub fn add_seconds(value: DateTime, seconds: i64) -> Result<DateTime, DateTimeError> {
    if value.precision() == Precision::TimeOnly {
        let within_day = seconds.rem_euclid(MS_PER_DAY / 1000) * 1000;
        return with_time_of_day(value, time_of_day_ms(value) + within_day);
    }
    let delta_ms = seconds
        .checked_mul(1000)
        .ok_or_else(|| DateTimeError::range("seconds", seconds))?;
    shift_local(value, delta_ms)
}

/// Re-expresses `value` in UTC. A value without a timezone is marked UTC
/// unchanged.
pub fn to_utc(value: DateTime) -> Result<DateTime, DateTimeError> {
    to_local(value, 0).map(|v| v.with_hint(value.hint().with_utc(true)))
}

/// Re-expresses `value` at the given offset in minutes.
pub fn to_local(value: DateTime, offset: i16) -> Result<DateTime, DateTimeError> {
    let current = value.tz_offset().unwrap_or(0) as i64;
    let delta_ms = (offset as i64 - current) * 60_000;
    let hint = value.hint().with_utc(false);
    if value.precision() == Precision::TimeOnly {
        let shifted = with_time_of_day(value, time_of_day_ms(value) + delta_ms)?;
        return shifted.with_tz_offset(Some(offset)).map(|v| v.with_hint(hint));
    }
    if delta_ms == 0 {
        return value.with_tz_offset(Some(offset)).map(|v| v.with_hint(hint));
    }
    shift_local(value, delta_ms)?
        .with_tz_offset(Some(offset))
        .map(|v| v.with_hint(hint))
}

/// Chronological order. Values with a date sort before time-only values;
/// time-only values compare by their UTC time of day.
pub fn compare(a: DateTime, b: DateTime) -> Ordering {
    let (a_date, b_date) = (a.precision().has_date(), b.precision().has_date());
    match (a_date, b_date) {
        (true, true) => match (to_unix_ms(a), to_unix_ms(b)) {
            (Ok(x), Ok(y)) => x.cmp(&y).then(a.precision().cmp_rank(b.precision())),
            _ => a.to_bits().cmp(&b.to_bits()),
        },
        (false, false) => {
            let x = (time_of_day_ms(a) - offset_ms(a)).rem_euclid(MS_PER_DAY);
            let y = (time_of_day_ms(b) - offset_ms(b)).rem_euclid(MS_PER_DAY);
            x.cmp(&y)
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
    }
}

impl Precision {
    fn cmp_rank(self, other: Precision) -> Ordering {
        (self as u8).cmp(&(other as u8))
    }
}

/// Day of week, 0 = Sunday. `None` for values without a complete date.
pub fn weekday(value: DateTime) -> Option<u8> {
    complete_date(value).map(|d| d.weekday().num_days_from_sunday() as u8)
}

/// Day of year, 1-based.
pub fn yearday(value: DateTime) -> Option<u16> {
    complete_date(value).map(|d| d.ordinal() as u16)
}

/// ISO-8601 week number.
pub fn week_number(value: DateTime) -> Option<u8> {
    complete_date(value).map(|d| d.iso_week().week() as u8)
}

pub fn quarter(value: DateTime) -> Option<u8> {
    match value.month() {
        m @ 1..=12 if value.precision().has_date() => Some((m - 1) / 3 + 1),
        _ => None,
    }
}

fn complete_date(value: DateTime) -> Option<NaiveDate> {
    match value.precision() {
        Precision::DateOnly | Precision::DateTime if value.day() != 0 => naive_date(value),
        _ => None,
    }
}

impl DateTime {
    pub fn to_unix(self) -> Result<i64, DateTimeError> {
        to_unix(self)
    }

    pub fn to_unix_ms(self) -> Result<i64, DateTimeError> {
        to_unix_ms(self)
    }

    pub fn from_unix(seconds: i64) -> Result<Self, DateTimeError> {
        from_unix(seconds)
    }

    pub fn from_unix_ms(ms: i64) -> Result<Self, DateTimeError> {
        from_unix_ms(ms)
    }

    pub fn add_seconds(self, seconds: i64) -> Result<Self, DateTimeError> {
        add_seconds(self, seconds)
    }

    pub fn to_utc(self) -> Result<Self, DateTimeError> {
        to_utc(self)
    }

    pub fn to_local(self, offset: i16) -> Result<Self, DateTimeError> {
        to_local(self, offset)
    }

    pub fn compare(self, other: DateTime) -> Ordering {
        compare(self, other)
    }

    pub fn weekday(self) -> Option<u8> {
        weekday(self)
    }

    pub fn yearday(self) -> Option<u16> {
        yearday(self)
    }

    pub fn week_number(self) -> Option<u8> {
        week_number(self)
    }

    pub fn quarter(self) -> Option<u8> {
        quarter(self)
    }

    pub fn is_leap_year(self) -> bool {
        is_leap_year(self.year())
    }

    pub fn days_in_month(self) -> u8 {
        days_in_month(self.year(), self.month())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Dialect, parse};

    fn dt(source: &str) -> DateTime {
        parse(source, Dialect::Lambda).unwrap().0
    }

    #[test]
    fn test_unix_round_trip() {
        for t in [0i64, 1, -1, 86_399, 1_723_473_045, -62_135_596_800, 32_503_680_000] {
            let value = from_unix(t).unwrap();
            assert_eq!(to_unix(value).unwrap(), t, "round trip of {}", t);
            assert!(value.is_utc());
        }
    }

    #[test]
    fn test_unix_honours_offset() {
        let local = dt("2024-08-12T14:30:45+05:30");
        let utc = dt("2024-08-12T09:00:45Z");
        assert_eq!(to_unix(local).unwrap(), to_unix(utc).unwrap());
    }

    #[test]
    fn test_unix_ms_keeps_millis() {
        let value = dt("1970-01-01T00:00:01.250Z");
        assert_eq!(to_unix_ms(value).unwrap(), 1250);
        assert_eq!(from_unix_ms(1250).unwrap().millisecond(), 250);
    }

    #[test]
    fn test_unix_out_of_range() {
        assert!(from_unix(i64::MAX).is_err());
        // Year 5000 does not fit the packed year field.
        assert!(from_unix(95_617_584_000).is_err());
    }

    #[test]
    fn test_add_seconds_crosses_day() {
        let value = dt("2024-02-28T23:59:30");
        let next = add_seconds(value, 60).unwrap();
        assert_eq!(next.to_string(), "2024-02-29T00:00:30");
    }

    #[test]
    fn test_add_seconds_time_only_wraps() {
        let value = dt("23:30");
        let next = add_seconds(value, 3600).unwrap();
        assert_eq!((next.hour(), next.minute()), (0, 30));
        assert_eq!(next.precision(), Precision::TimeOnly);
    }

    #[test]
    fn test_add_seconds_overflow_is_out_of_range() {
        let value = DateTime::date(2024, 1, 1).unwrap();
        assert!(matches!(
            add_seconds(value, i64::MAX),
            Err(DateTimeError::OutOfRange { field: "seconds", .. })
        ));
        assert!(matches!(
            add_seconds(value, i64::MAX / 1000),
            Err(DateTimeError::OutOfRange { .. })
        ));
        let clock = add_seconds(dt("23:30"), i64::MIN).unwrap();
        assert_eq!(clock.precision(), Precision::TimeOnly);
    }

    #[test]
    fn test_to_utc_and_back() {
        let value = dt("2024-08-12T14:30:45+05:30");
        let utc = to_utc(value).unwrap();
        assert_eq!(utc.to_string(), "2024-08-12T09:00:45Z");
        let local = to_local(utc, 330).unwrap();
        assert_eq!(local.to_string(), "2024-08-12T14:30:45+05:30");
    }

    #[test]
    fn test_compare() {
        let a = dt("2024-08-12T14:30:45+05:30");
        let b = dt("2024-08-12T09:00:46Z");
        assert_eq!(compare(a, b), Ordering::Less);
        assert_eq!(compare(b, a), Ordering::Greater);
        assert_eq!(compare(dt("10:00"), dt("09:00")), Ordering::Greater);
        assert_eq!(compare(dt("2024-01-01"), dt("09:00")), Ordering::Less);
    }

    #[test]
    fn test_calendar_helpers() {
        let value = dt("2024-08-12");
        assert_eq!(weekday(value), Some(1));
        assert_eq!(yearday(value), Some(225));
        assert_eq!(week_number(value), Some(33));
        assert_eq!(quarter(value), Some(3));
        assert!(value.is_leap_year());
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(weekday(dt("2024-08")), None);
    }
}
