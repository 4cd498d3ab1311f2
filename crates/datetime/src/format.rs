//! Dialect formatting and the token-based pattern formatter.
//!
//! Formatters emit exactly the fields the precision makes meaningful.

use crate::calendar;
use crate::packed::{DateTime, Precision};
use crate::parser::Dialect;
use std::fmt::Write;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub fn to_string(value: DateTime, dialect: Dialect) -> String {
    let mut out = String::with_capacity(32);
    format_into(&mut out, value, dialect);
    out
}

/// Appends `value` to `out` in the given dialect.
pub fn format_into(out: &mut String, value: DateTime, dialect: Dialect) {
    match dialect {
        Dialect::Iso8601 => write_iso(out, value),
        Dialect::Lambda => {
            out.push_str("t'");
            write_iso(out, value);
            out.push('\'');
        }
        Dialect::Ics => write_ics(out, value),
    }
}

fn write_year(out: &mut String, year: i32) {
    if year < 0 {
        let _ = write!(out, "-{:04}", -year);
    } else {
        let _ = write!(out, "{:04}", year);
    }
}

fn write_iso_date(out: &mut String, value: DateTime) {
    write_year(out, value.year());
    if value.precision() == Precision::YearOnly || value.month() == 0 {
        return;
    }
    let _ = write!(out, "-{:02}", value.month());
    if value.day() != 0 {
        let _ = write!(out, "-{:02}", value.day());
    }
}

fn write_iso_time(out: &mut String, value: DateTime) {
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        value.hour(),
        value.minute(),
        value.second()
    );
    if value.millisecond() != 0 {
        let _ = write!(out, ".{:03}", value.millisecond());
    }
}

fn write_zone(out: &mut String, value: DateTime, colon: bool) {
    let Some(offset) = value.tz_offset() else {
        return;
    };
    if offset == 0 && value.hint().is_utc() {
        out.push('Z');
        return;
    }
    let sign = if offset < 0 { '-' } else { '+' };
    let abs = (offset as i32).abs();
    if colon {
        let _ = write!(out, "{}{:02}:{:02}", sign, abs / 60, abs % 60);
    } else {
        let _ = write!(out, "{}{:02}{:02}", sign, abs / 60, abs % 60);
    }
}

fn write_iso(out: &mut String, value: DateTime) {
    match value.precision() {
        Precision::YearOnly | Precision::DateOnly => write_iso_date(out, value),
        Precision::TimeOnly => write_iso_time(out, value),
        Precision::DateTime => {
            write_iso_date(out, value);
            out.push(if value.hint().is_human() { ' ' } else { 'T' });
            write_iso_time(out, value);
        }
    }
    write_zone(out, value, true);
}

fn write_ics(out: &mut String, value: DateTime) {
    // ICS only knows UTC; any other offset is folded into the clock.
    let value = match value.tz_offset() {
        Some(offset) if offset != 0 => calendar::to_utc(value).unwrap_or(value),
        _ => value,
    };
    let precision = value.precision();
    if precision.has_date() {
        write_year(out, value.year());
        if precision != Precision::YearOnly && value.month() != 0 {
            let _ = write!(out, "{:02}", value.month());
            if value.day() != 0 {
                let _ = write!(out, "{:02}", value.day());
            }
        }
    }
    if precision.has_time() {
        let _ = write!(
            out,
            "T{:02}{:02}{:02}",
            value.hour(),
            value.minute(),
            value.second()
        );
    }
    if value.tz_offset() == Some(0) {
        out.push('Z');
    }
}

/// Formats `value` by replacing tokens in `pattern`.
///
/// Tokens: `YYYY YY MMMM MMM MM M DD D dddd ddd HH hh h mm ss SSS A Z ZZ`.
/// Text inside `[...]` is copied verbatim; any other character is literal.
pub fn format_pattern(value: DateTime, pattern: &str) -> String {
    const TOKENS: [&str; 19] = [
        "YYYY", "MMMM", "dddd", "SSS", "MMM", "ddd", "YY", "MM", "DD", "HH", "hh", "mm", "ss",
        "ZZ", "M", "D", "h", "A", "Z",
    ];

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                out.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }
        match TOKENS.iter().find(|token| rest.starts_with(*token)) {
            Some(token) => {
                write_token(&mut out, value, token);
                rest = &rest[token.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

fn write_token(out: &mut String, value: DateTime, token: &str) {
    let month_index = value.month().clamp(1, 12) as usize - 1;
    let hour12 = match value.hour() % 12 {
        0 => 12,
        h => h,
    };
    let _ = match token {
        "YYYY" => {
            write_year(out, value.year());
            Ok(())
        }
        "YY" => write!(out, "{:02}", value.year().rem_euclid(100)),
        "MMMM" => write!(out, "{}", MONTH_NAMES[month_index]),
        "MMM" => write!(out, "{}", &MONTH_NAMES[month_index][..3]),
        "MM" => write!(out, "{:02}", value.month()),
        "M" => write!(out, "{}", value.month()),
        "DD" => write!(out, "{:02}", value.day()),
        "D" => write!(out, "{}", value.day()),
        "dddd" | "ddd" => {
            let weekday = calendar::weekday(value).unwrap_or(0) as usize;
            let name = WEEKDAY_NAMES[weekday];
            if token == "ddd" {
                write!(out, "{}", &name[..3])
            } else {
                write!(out, "{}", name)
            }
        }
        "HH" => write!(out, "{:02}", value.hour()),
        "hh" => write!(out, "{:02}", hour12),
        "h" => write!(out, "{}", hour12),
        "mm" => write!(out, "{:02}", value.minute()),
        "ss" => write!(out, "{:02}", value.second()),
        "SSS" => write!(out, "{:03}", value.millisecond()),
        "A" => write!(out, "{}", if value.hour() < 12 { "AM" } else { "PM" }),
        "Z" => {
            write_zone(out, value, true);
            Ok(())
        }
        "ZZ" => {
            write_zone(out, value, false);
            Ok(())
        }
        _ => Ok(()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn iso(source: &str) -> String {
        let (value, _) = parse(source, Dialect::Iso8601).unwrap();
        to_string(value, Dialect::Iso8601)
    }

    #[test]
    fn test_iso_round_trip_preserves_precision() {
        assert_eq!(iso("2024"), "2024");
        assert_eq!(iso("2024-08"), "2024-08");
        assert_eq!(iso("2024-08-12"), "2024-08-12");
        assert_eq!(
            iso("2024-08-12T14:30:45.123+05:30"),
            "2024-08-12T14:30:45.123+05:30"
        );
        assert_eq!(iso("2024-08-12T14:30:45Z"), "2024-08-12T14:30:45Z");
        assert_eq!(iso("2024-08-12 14:30:45"), "2024-08-12 14:30:45");
    }

    #[test]
    fn test_utc_and_zero_offset_differ() {
        assert_eq!(iso("2024-01-01T00:00:00+00:00"), "2024-01-01T00:00:00+00:00");
        assert_eq!(iso("2024-01-01T00:00:00z"), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_negative_year() {
        let value = DateTime::date(-44, 3, 15).unwrap();
        assert_eq!(to_string(value, Dialect::Iso8601), "-0044-03-15");
        assert_eq!(to_string(value, Dialect::Lambda), "t'-0044-03-15'");
    }

    #[test]
    fn test_year_extremes_round_trip_all_dialects() {
        for value in [
            DateTime::date(crate::YEAR_MIN, 1, 1).unwrap(),
            DateTime::date(crate::YEAR_MAX, 12, 31).unwrap(),
            DateTime::year_only(crate::YEAR_MIN).unwrap(),
            DateTime::date_time(crate::YEAR_MAX, 6, 30, 23, 59, 59, 0).unwrap(),
        ] {
            for dialect in [Dialect::Iso8601, Dialect::Ics, Dialect::Lambda] {
                let text = to_string(value, dialect);
                let (parsed, consumed) = parse(&text, dialect).unwrap();
                assert_eq!(consumed, text.len());
                assert_eq!(parsed, value, "{:?} via {}", dialect, text);
            }
        }
    }

    #[test]
    fn test_ics_output() {
        let (value, _) = parse("2024-08-12T14:30:45Z", Dialect::Iso8601).unwrap();
        assert_eq!(to_string(value, Dialect::Ics), "20240812T143045Z");
        let (offset, _) = parse("2024-08-12T14:30:45+02:00", Dialect::Iso8601).unwrap();
        assert_eq!(to_string(offset, Dialect::Ics), "20240812T123045Z");
    }

    #[test]
    fn test_time_only_lambda() {
        let (value, _) = parse("09:05", Dialect::Lambda).unwrap();
        assert_eq!(to_string(value, Dialect::Lambda), "t'09:05:00'");
    }

    #[test]
    fn test_format_pattern_tokens() {
        let (value, _) = parse("2024-08-12T14:05:09.007+05:30", Dialect::Iso8601).unwrap();
        assert_eq!(format_pattern(value, "YYYY-MM-DD"), "2024-08-12");
        assert_eq!(format_pattern(value, "dddd, MMMM D YY"), "Monday, August 12 24");
        assert_eq!(format_pattern(value, "ddd MMM"), "Mon Aug");
        assert_eq!(format_pattern(value, "h:mm A"), "2:05 PM");
        assert_eq!(format_pattern(value, "HH:mm:ss.SSS Z"), "14:05:09.007 +05:30");
        assert_eq!(format_pattern(value, "ZZ"), "+0530");
        assert_eq!(format_pattern(value, "[Day] D"), "Day 12");
    }
}
