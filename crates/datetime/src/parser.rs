//! Dialect-aware datetime scanner.
//!
//! The scanner records exactly which components it saw; precision and the
//! format hint are inferred from that record, never from defaults.

use crate::error::DateTimeError;
use crate::packed::{DateTime, DateTimeParts, FormatHint, Precision, TZ_MAX_OFFSET};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while1, take_while_m_n},
    character::complete::{char, one_of},
    combinator::{map, opt},
    sequence::preceded,
};

/// Textual conventions understood by [`parse`] and [`crate::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `YYYY[-MM[-DD]]([Tt ]HH:MM:SS[.fff])[Zz|±HH:MM]?`, or a bare
    /// `HH:MM:SS[.fff]` clock with the same optional zone.
    Iso8601,
    /// Compact iCalendar form `YYYYMMDD[THHMMSS[Z]]`.
    Ics,
    /// ISO-8601 plus optional seconds, negative years and `t'…'` quoting.
    Lambda,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Zone {
    Utc,
    Offset(i32),
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    hour: u32,
    minute: u32,
    second: u32,
    millisecond: u32,
}

#[derive(Debug, Default)]
struct Scanned {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    clock: Option<Clock>,
    zone: Option<Zone>,
    human: bool,
}

/// Parses a datetime prefix of `source`, returning the value and the number
/// of bytes consumed. Trailing input is left for the caller.
pub fn parse(source: &str, dialect: Dialect) -> Result<(DateTime, usize), DateTimeError> {
    let (body, prefix) = match dialect {
        Dialect::Lambda if source.starts_with("t'") => (&source[2..], 2),
        _ => (source, 0),
    };

    let scanned = match dialect {
        Dialect::Ics => scan_ics(body),
        Dialect::Iso8601 => scan_iso(body, false),
        Dialect::Lambda => scan_iso(body, true),
    };
    let (rest, scanned) = scanned.map_err(|e| syntax_error(body, e, prefix, dialect))?;

    let mut consumed = prefix + body.len() - rest.len();
    if prefix > 0 {
        if !rest.starts_with('\'') {
            return Err(DateTimeError::syntax(consumed, "closing quote"));
        }
        consumed += 1;
    }

    let value = build(scanned)?;
    log::trace!("parsed datetime {:?} ({} bytes, {:?})", value, consumed, dialect);
    Ok((value, consumed))
}

/// Parses the whole of `source`; trailing bytes are a syntax error.
pub fn parse_exact(source: &str, dialect: Dialect) -> Result<DateTime, DateTimeError> {
    let trimmed = source.trim();
    let (value, consumed) = parse(trimmed, dialect)?;
    if consumed != trimmed.len() {
        return Err(DateTimeError::syntax(consumed, "end of input"));
    }
    Ok(value)
}

fn syntax_error(
    body: &str,
    err: nom::Err<nom::error::Error<&str>>,
    prefix: usize,
    dialect: Dialect,
) -> DateTimeError {
    let offset = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => body.len() - e.input.len(),
        nom::Err::Incomplete(_) => body.len(),
    };
    let expected = match dialect {
        Dialect::Ics => "YYYYMMDD[THHMMSS[Z]]",
        Dialect::Iso8601 => "YYYY[-MM[-DD]][THH:MM:SS[.fff]][Z|±HH:MM] or HH:MM:SS[.fff][Z|±HH:MM]",
        Dialect::Lambda => "date, date-time or HH:MM[:SS[.fff]]",
    };
    DateTimeError::syntax(prefix + offset, expected)
}

fn digits(input: &str, count: usize) -> IResult<&str, u32> {
    let (rest, text) = take_while_m_n(count, count, |c: char| c.is_ascii_digit()).parse(input)?;
    let value = text
        .bytes()
        .fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);
    Ok((rest, value))
}

fn two(input: &str) -> IResult<&str, u32> {
    digits(input, 2)
}

fn signed_year(input: &str) -> IResult<&str, i32> {
    let (input, negative) = opt(char('-')).parse(input)?;
    let (input, year) = digits(input, 4)?;
    let year = year as i32;
    Ok((input, if negative.is_some() { -year } else { year }))
}

/// Fractional seconds of any width, normalized to milliseconds.
fn fraction(input: &str) -> IResult<&str, u32> {
    let (input, text) = preceded(char('.'), take_while1(|c: char| c.is_ascii_digit())).parse(input)?;
    let millis = text
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);
    Ok((input, millis))
}

fn clock(input: &str, seconds_optional: bool) -> IResult<&str, Clock> {
    let (input, hour) = two(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, minute) = two(input)?;
    let (input, second) = if seconds_optional {
        opt(preceded(char(':'), two)).parse(input)?
    } else {
        let (input, second) = preceded(char(':'), two).parse(input)?;
        (input, Some(second))
    };
    let (input, millisecond) = match second {
        Some(_) => opt(fraction).parse(input)?,
        None => (input, None),
    };
    Ok((
        input,
        Clock {
            hour,
            minute,
            second: second.unwrap_or(0),
            millisecond: millisecond.unwrap_or(0),
        },
    ))
}

fn iso_clock(input: &str) -> IResult<&str, Clock> {
    clock(input, false)
}

fn lambda_clock(input: &str) -> IResult<&str, Clock> {
    clock(input, true)
}

fn offset_zone(input: &str) -> IResult<&str, Zone> {
    let (input, sign) = one_of("+-").parse(input)?;
    let (input, hours) = two(input)?;
    let (input, _) = opt(char(':')).parse(input)?;
    let (input, minutes) = two(input)?;
    let total = (hours * 60 + minutes) as i32;
    Ok((input, Zone::Offset(if sign == '-' { -total } else { total })))
}

fn zone(input: &str) -> IResult<&str, Zone> {
    alt((map(one_of("Zz"), |_| Zone::Utc), offset_zone)).parse(input)
}

fn looks_like_clock(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit() && bytes[2] == b':'
}

fn scan_iso(input: &str, lambda: bool) -> IResult<&str, Scanned> {
    let mut scanned = Scanned::default();

    if looks_like_clock(input) {
        let (input, time) = if lambda { lambda_clock(input)? } else { iso_clock(input)? };
        scanned.clock = Some(time);
        let (input, tz) = opt(zone).parse(input)?;
        scanned.zone = tz;
        return Ok((input, scanned));
    }

    let (input, year) = signed_year(input)?;
    scanned.year = Some(year);
    let (mut input, month) = opt(preceded(char('-'), two)).parse(input)?;
    scanned.month = month;
    if month.is_some() {
        let (rest, day) = opt(preceded(char('-'), two)).parse(input)?;
        scanned.day = day;
        input = rest;
    }

    if scanned.day.is_some() {
        let (rest, time) = if lambda {
            opt((one_of("Tt "), lambda_clock)).parse(input)?
        } else {
            opt((one_of("Tt "), iso_clock)).parse(input)?
        };
        if let Some((separator, time)) = time {
            scanned.human = separator == ' ';
            scanned.clock = Some(time);
        }
        input = rest;
    }

    let (input, tz) = opt(zone).parse(input)?;
    scanned.zone = tz;
    Ok((input, scanned))
}

fn compact_clock(input: &str) -> IResult<&str, Clock> {
    let (input, hour) = two(input)?;
    let (input, minute) = two(input)?;
    let (input, second) = two(input)?;
    Ok((
        input,
        Clock {
            hour,
            minute,
            second,
            millisecond: 0,
        },
    ))
}

fn ics_zone(input: &str) -> IResult<&str, Zone> {
    map(one_of("Zz"), |_| Zone::Utc).parse(input)
}

fn scan_ics(input: &str) -> IResult<&str, Scanned> {
    let mut scanned = Scanned::default();

    if input.starts_with(['T', 't']) {
        let (input, time) = preceded(one_of("Tt"), compact_clock).parse(input)?;
        scanned.clock = Some(time);
        let (input, tz) = opt(ics_zone).parse(input)?;
        scanned.zone = tz;
        return Ok((input, scanned));
    }

    let (input, year) = signed_year(input)?;
    scanned.year = Some(year);
    let (mut input, month) = opt(two).parse(input)?;
    scanned.month = month;
    if month.is_some() {
        let (rest, day) = opt(two).parse(input)?;
        scanned.day = day;
        input = rest;
    }
    if scanned.day.is_some() {
        let (rest, time) = opt(preceded(one_of("Tt"), compact_clock)).parse(input)?;
        scanned.clock = time;
        input = rest;
    }
    let (input, tz) = opt(ics_zone).parse(input)?;
    scanned.zone = tz;
    Ok((input, scanned))
}

fn build(scanned: Scanned) -> Result<DateTime, DateTimeError> {
    let mut parts = DateTimeParts::default();

    parts.precision = match (scanned.year, scanned.month, scanned.day, scanned.clock) {
        (None, _, _, Some(_)) => Precision::TimeOnly,
        (Some(_), None, _, _) => Precision::YearOnly,
        (Some(_), Some(_), Some(_), Some(_)) => Precision::DateTime,
        _ => Precision::DateOnly,
    };

    if let Some(year) = scanned.year {
        parts.year = year;
        parts.month = 0;
        parts.day = 0;
    }
    if let Some(month) = scanned.month {
        if !(1..=12).contains(&month) {
            return Err(DateTimeError::range("month", month as i64));
        }
        parts.month = month as u8;
    }
    if let Some(day) = scanned.day {
        if !(1..=31).contains(&day) {
            return Err(DateTimeError::range("day", day as i64));
        }
        parts.day = day as u8;
    }
    if let Some(time) = scanned.clock {
        if time.hour > 23 {
            return Err(DateTimeError::range("hour", time.hour as i64));
        }
        if time.minute > 59 {
            return Err(DateTimeError::range("minute", time.minute as i64));
        }
        if time.second > 59 {
            return Err(DateTimeError::range("second", time.second as i64));
        }
        parts.hour = time.hour as u8;
        parts.minute = time.minute as u8;
        parts.second = time.second as u8;
        parts.millisecond = time.millisecond as u16;
    }

    let utc = match scanned.zone {
        None => false,
        Some(Zone::Utc) => {
            parts.tz_offset = Some(0);
            true
        }
        Some(Zone::Offset(minutes)) => {
            if minutes.abs() > TZ_MAX_OFFSET {
                return Err(DateTimeError::range("timezone", minutes as i64));
            }
            parts.tz_offset = Some(minutes as i16);
            false
        }
    };
    let base = if scanned.human {
        FormatHint::HumanLocal
    } else {
        FormatHint::IsoLocal
    };
    parts.hint = base.with_utc(utc);

    let value = DateTime::pack(parts)?;
    if !value.is_valid() {
        return Err(DateTimeError::invalid(format!(
            "{:04}-{:02}-{:02} is not a calendar date",
            parts.year, parts.month, parts.day
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_inference_iso() {
        let (year, n) = parse("2024", Dialect::Iso8601).unwrap();
        assert_eq!(year.precision(), Precision::YearOnly);
        assert_eq!(n, 4);

        let (month, _) = parse("2024-08", Dialect::Iso8601).unwrap();
        assert_eq!(month.precision(), Precision::DateOnly);
        assert_eq!(month.day(), 0);

        let (date, _) = parse("2024-08-12", Dialect::Iso8601).unwrap();
        assert_eq!(date.precision(), Precision::DateOnly);
        assert_eq!(date.day(), 12);

        let (full, _) = parse("2024-08-12T14:30:45.123+05:30", Dialect::Iso8601).unwrap();
        assert_eq!(full.precision(), Precision::DateTime);
        assert_eq!(full.tz_offset(), Some(330));
        assert_eq!(full.millisecond(), 123);
    }

    #[test]
    fn test_fraction_normalized_to_millis() {
        let (short, _) = parse("2024-01-01T00:00:00.5", Dialect::Iso8601).unwrap();
        assert_eq!(short.millisecond(), 500);
        let (long, _) = parse("2024-01-01T00:00:00.123456Z", Dialect::Iso8601).unwrap();
        assert_eq!(long.millisecond(), 123);
        assert!(long.is_utc());
    }

    #[test]
    fn test_leap_day_validity() {
        assert!(parse("2024-02-29", Dialect::Iso8601).is_ok());
        assert!(matches!(
            parse("2023-02-29", Dialect::Iso8601),
            Err(DateTimeError::Invalid(_))
        ));
        assert!(matches!(
            parse("2024-02-30", Dialect::Iso8601),
            Err(DateTimeError::Invalid(_))
        ));
    }

    #[test]
    fn test_out_of_range_fields() {
        assert!(matches!(
            parse("2024-13-01", Dialect::Iso8601),
            Err(DateTimeError::OutOfRange { field: "month", .. })
        ));
        assert!(matches!(
            parse("2024-01-01T25:00:00", Dialect::Iso8601),
            Err(DateTimeError::OutOfRange { field: "hour", .. })
        ));
        assert!(matches!(
            parse("2024-01-01T10:00:00+23:00", Dialect::Iso8601),
            Err(DateTimeError::OutOfRange { field: "timezone", .. })
        ));
    }

    #[test]
    fn test_bad_syntax_reports_offset() {
        match parse("20x4", Dialect::Iso8601) {
            Err(DateTimeError::BadSyntax { offset, .. }) => assert_eq!(offset, 0),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_iso_requires_seconds() {
        // Without seconds the time part is not consumed.
        let (value, consumed) = parse("2024-01-01T10:30", Dialect::Iso8601).unwrap();
        assert_eq!(value.precision(), Precision::DateOnly);
        assert_eq!(consumed, 10);
    }

    #[test]
    fn test_space_separator_sets_human_hint() {
        let (value, _) = parse("2024-01-01 10:30:00", Dialect::Iso8601).unwrap();
        assert_eq!(value.hint(), FormatHint::HumanLocal);
    }

    #[test]
    fn test_iso_time_only_keeps_zone() {
        let value = DateTime::time(14, 30, 0, 0).unwrap().with_tz_offset(Some(330)).unwrap();
        let text = crate::to_string(value, Dialect::Iso8601);
        assert_eq!(text, "14:30:00+05:30");
        let (back, consumed) = parse(&text, Dialect::Iso8601).unwrap();
        assert_eq!(consumed, text.len());
        assert_eq!(back, value);

        let (plain, _) = parse("09:05:07.250", Dialect::Iso8601).unwrap();
        assert_eq!(plain.precision(), Precision::TimeOnly);
        assert_eq!(plain.millisecond(), 250);
        assert!(parse("14:30", Dialect::Iso8601).is_err());
    }

    #[test]
    fn test_lambda_extensions() {
        let (time, _) = parse("14:30", Dialect::Lambda).unwrap();
        assert_eq!(time.precision(), Precision::TimeOnly);
        assert_eq!((time.hour(), time.minute()), (14, 30));

        let (quoted, consumed) = parse("t'2024-05-06t07:08'", Dialect::Lambda).unwrap();
        assert_eq!(quoted.precision(), Precision::DateTime);
        assert_eq!(consumed, 19);

        let (negative, _) = parse("-0044-03-15", Dialect::Lambda).unwrap();
        assert_eq!(negative.year(), -44);

        assert!(parse("t'2024-05-06", Dialect::Lambda).is_err());
    }

    #[test]
    fn test_ics_dialect() {
        let (value, consumed) = parse("20240812T143045Z", Dialect::Ics).unwrap();
        assert_eq!(consumed, 16);
        assert_eq!(value.precision(), Precision::DateTime);
        assert!(value.is_utc());
        assert_eq!((value.hour(), value.minute(), value.second()), (14, 30, 45));

        let (date, _) = parse("20240812", Dialect::Ics).unwrap();
        assert_eq!(date.precision(), Precision::DateOnly);
    }

    #[test]
    fn test_consumed_excludes_trailing_text() {
        let (_, consumed) = parse("2024-08-12, later", Dialect::Iso8601).unwrap();
        assert_eq!(consumed, 10);
        assert!(parse_exact("2024-08-12, later", Dialect::Iso8601).is_err());
    }
}
