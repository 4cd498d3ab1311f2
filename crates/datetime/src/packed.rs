//! The 64-bit packed calendar value.
//!
//! Layout, least significant bit first:
//!
//! | bits  | width | field                                   |
//! |-------|-------|-----------------------------------------|
//! | 0-1   | 2     | format hint                             |
//! | 2-3   | 2     | precision                               |
//! | 4-14  | 11    | biased timezone offset (0 = none)       |
//! | 15-24 | 10    | millisecond                             |
//! | 25-30 | 6     | second                                  |
//! | 31-36 | 6     | minute                                  |
//! | 37-41 | 5     | hour                                    |
//! | 42-46 | 5     | day (0 = month-only date)               |
//! | 47-63 | 17    | biased year * 16 + month (0 = unset)    |

use crate::error::DateTimeError;
use std::fmt;

pub const YEAR_MIN: i32 = -4000;
pub const YEAR_MAX: i32 = 4191;

/// Biased timezone value meaning "no timezone recorded".
pub const TZ_NONE: u16 = 0;
/// Bias added to a timezone offset in minutes. Also the encoding of UTC.
pub const TZ_BIAS: i32 = 1024;
pub const TZ_MAX_OFFSET: i32 = 1023;

const HINT_SHIFT: u32 = 0;
const PRECISION_SHIFT: u32 = 2;
const TZ_SHIFT: u32 = 4;
const MS_SHIFT: u32 = 15;
const SECOND_SHIFT: u32 = 25;
const MINUTE_SHIFT: u32 = 31;
const HOUR_SHIFT: u32 = 37;
const DAY_SHIFT: u32 = 42;
const YEAR_MONTH_SHIFT: u32 = 47;

const fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Which fields of a [`DateTime`] carry meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Precision {
    YearOnly = 0,
    DateOnly = 1,
    TimeOnly = 2,
    DateTime = 3,
}

impl Precision {
    fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => Precision::YearOnly,
            1 => Precision::DateOnly,
            2 => Precision::TimeOnly,
            _ => Precision::DateTime,
        }
    }

    pub fn has_date(self) -> bool {
        !matches!(self, Precision::TimeOnly)
    }

    pub fn has_time(self) -> bool {
        matches!(self, Precision::TimeOnly | Precision::DateTime)
    }
}

/// How the value was written, so formatters can reproduce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FormatHint {
    IsoLocal = 0,
    HumanLocal = 1,
    IsoUtc = 2,
    HumanUtc = 3,
}

impl FormatHint {
    fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => FormatHint::IsoLocal,
            1 => FormatHint::HumanLocal,
            2 => FormatHint::IsoUtc,
            _ => FormatHint::HumanUtc,
        }
    }

    pub fn is_utc(self) -> bool {
        matches!(self, FormatHint::IsoUtc | FormatHint::HumanUtc)
    }

    pub fn is_human(self) -> bool {
        matches!(self, FormatHint::HumanLocal | FormatHint::HumanUtc)
    }

    pub fn with_utc(self, utc: bool) -> Self {
        match (self.is_human(), utc) {
            (false, false) => FormatHint::IsoLocal,
            (true, false) => FormatHint::HumanLocal,
            (false, true) => FormatHint::IsoUtc,
            (true, true) => FormatHint::HumanUtc,
        }
    }
}

/// Unpacked view of a [`DateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeParts {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
    /// Offset from UTC in minutes, `None` when no timezone was given.
    pub tz_offset: Option<i16>,
    pub precision: Precision,
    pub hint: FormatHint,
}

impl Default for DateTimeParts {
    fn default() -> Self {
        Self {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
            tz_offset: None,
            precision: Precision::DateTime,
            hint: FormatHint::IsoLocal,
        }
    }
}

/// A calendar value packed into a single 64-bit word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateTime(u64);

impl DateTime {
    /// Packs `parts`, rejecting any field that does not fit its bitfield.
    ///
    /// Packing only checks representability; calendar consistency
    /// (Feb 30 and friends) is checked by [`DateTime::is_valid`].
    pub fn pack(parts: DateTimeParts) -> Result<Self, DateTimeError> {
        if !(YEAR_MIN..=YEAR_MAX).contains(&parts.year) {
            return Err(DateTimeError::range("year", parts.year as i64));
        }
        if parts.month > 15 {
            return Err(DateTimeError::range("month", parts.month as i64));
        }
        if parts.day > 31 {
            return Err(DateTimeError::range("day", parts.day as i64));
        }
        if parts.hour > 31 {
            return Err(DateTimeError::range("hour", parts.hour as i64));
        }
        if parts.minute > 63 {
            return Err(DateTimeError::range("minute", parts.minute as i64));
        }
        if parts.second > 63 {
            return Err(DateTimeError::range("second", parts.second as i64));
        }
        if parts.millisecond > 1023 {
            return Err(DateTimeError::range(
                "millisecond",
                parts.millisecond as i64,
            ));
        }
        let tz = match parts.tz_offset {
            None => TZ_NONE as u64,
            Some(offset) => {
                if (offset as i32).abs() > TZ_MAX_OFFSET {
                    return Err(DateTimeError::range("timezone", offset as i64));
                }
                (offset as i32 + TZ_BIAS) as u64
            }
        };
        let year_month = ((parts.year - YEAR_MIN) as u64) * 16 + parts.month as u64;

        let bits = (parts.hint as u64) << HINT_SHIFT
            | (parts.precision as u64) << PRECISION_SHIFT
            | tz << TZ_SHIFT
            | (parts.millisecond as u64) << MS_SHIFT
            | (parts.second as u64) << SECOND_SHIFT
            | (parts.minute as u64) << MINUTE_SHIFT
            | (parts.hour as u64) << HOUR_SHIFT
            | (parts.day as u64) << DAY_SHIFT
            | year_month << YEAR_MONTH_SHIFT;
        Ok(DateTime(bits))
    }

    pub fn unpack(self) -> DateTimeParts {
        DateTimeParts {
            year: self.year(),
            month: self.month(),
            day: self.day(),
            hour: self.hour(),
            minute: self.minute(),
            second: self.second(),
            millisecond: self.millisecond(),
            tz_offset: self.tz_offset(),
            precision: self.precision(),
            hint: self.hint(),
        }
    }

    pub fn from_bits(bits: u64) -> Self {
        DateTime(bits)
    }

    pub fn to_bits(self) -> u64 {
        self.0
    }

    /// A calendar date with [`Precision::DateOnly`].
    pub fn date(year: i32, month: u8, day: u8) -> Result<Self, DateTimeError> {
        Self::pack(DateTimeParts {
            year,
            month,
            day,
            precision: Precision::DateOnly,
            ..DateTimeParts::default()
        })
    }

    /// A local date and time with [`Precision::DateTime`] and no timezone.
    pub fn date_time(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        millisecond: u16,
    ) -> Result<Self, DateTimeError> {
        Self::pack(DateTimeParts {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
            ..DateTimeParts::default()
        })
    }

    /// A time of day with [`Precision::TimeOnly`].
    pub fn time(hour: u8, minute: u8, second: u8, millisecond: u16) -> Result<Self, DateTimeError> {
        Self::pack(DateTimeParts {
            hour,
            minute,
            second,
            millisecond,
            precision: Precision::TimeOnly,
            ..DateTimeParts::default()
        })
    }

    pub fn year_only(year: i32) -> Result<Self, DateTimeError> {
        Self::pack(DateTimeParts {
            year,
            month: 0,
            day: 0,
            precision: Precision::YearOnly,
            ..DateTimeParts::default()
        })
    }

    /// Returns a copy carrying the given offset in minutes.
    pub fn with_tz_offset(self, offset: Option<i16>) -> Result<Self, DateTimeError> {
        let mut parts = self.unpack();
        parts.tz_offset = offset;
        Self::pack(parts)
    }

    pub fn with_hint(self, hint: FormatHint) -> Self {
        DateTime((self.0 & !(mask(2) << HINT_SHIFT)) | (hint as u64) << HINT_SHIFT)
    }

    pub fn with_precision(self, precision: Precision) -> Self {
        DateTime((self.0 & !(mask(2) << PRECISION_SHIFT)) | (precision as u64) << PRECISION_SHIFT)
    }

    fn field(self, shift: u32, bits: u32) -> u64 {
        (self.0 >> shift) & mask(bits)
    }

    pub fn year(self) -> i32 {
        (self.field(YEAR_MONTH_SHIFT, 17) / 16) as i32 + YEAR_MIN
    }

    pub fn month(self) -> u8 {
        (self.field(YEAR_MONTH_SHIFT, 17) % 16) as u8
    }

    pub fn day(self) -> u8 {
        self.field(DAY_SHIFT, 5) as u8
    }

    pub fn hour(self) -> u8 {
        self.field(HOUR_SHIFT, 5) as u8
    }

    pub fn minute(self) -> u8 {
        self.field(MINUTE_SHIFT, 6) as u8
    }

    pub fn second(self) -> u8 {
        self.field(SECOND_SHIFT, 6) as u8
    }

    pub fn millisecond(self) -> u16 {
        self.field(MS_SHIFT, 10) as u16
    }

    /// The raw biased timezone field.
    pub fn tz_biased(self) -> u16 {
        self.field(TZ_SHIFT, 11) as u16
    }

    pub fn tz_offset(self) -> Option<i16> {
        match self.tz_biased() {
            TZ_NONE => None,
            biased => Some((biased as i32 - TZ_BIAS) as i16),
        }
    }

    pub fn has_timezone(self) -> bool {
        self.tz_biased() != TZ_NONE
    }

    /// True when the value is marked UTC: neutral offset plus a UTC format hint.
    pub fn is_utc(self) -> bool {
        self.tz_biased() as i32 == TZ_BIAS && self.hint().is_utc()
    }

    pub fn precision(self) -> Precision {
        Precision::from_bits(self.field(PRECISION_SHIFT, 2))
    }

    pub fn hint(self) -> FormatHint {
        FormatHint::from_bits(self.field(HINT_SHIFT, 2))
    }

    /// Checks every range constraint the precision makes meaningful,
    /// including leap-year February.
    pub fn is_valid(self) -> bool {
        let precision = self.precision();
        if precision.has_date() {
            let (year, month, day) = (self.year(), self.month(), self.day());
            if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
                return false;
            }
            match precision {
                Precision::YearOnly => {
                    if month > 12 {
                        return false;
                    }
                }
                _ => {
                    if !(1..=12).contains(&month) {
                        return false;
                    }
                    if day != 0 && day > crate::calendar::days_in_month(year, month) {
                        return false;
                    }
                    if day == 0 && precision == Precision::DateTime {
                        return false;
                    }
                }
            }
        }
        if precision.has_time()
            && (self.hour() > 23
                || self.minute() > 59
                || self.second() > 59
                || self.millisecond() > 999)
        {
            return false;
        }
        if let Some(offset) = self.tz_offset() {
            if (offset as i32).abs() > TZ_MAX_OFFSET {
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateTime({})", crate::format::to_string(*self, crate::Dialect::Iso8601))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::to_string(*self, crate::Dialect::Iso8601))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_fields() {
        let parts = DateTimeParts {
            year: 2024,
            month: 8,
            day: 12,
            hour: 14,
            minute: 30,
            second: 45,
            millisecond: 123,
            tz_offset: Some(330),
            precision: Precision::DateTime,
            hint: FormatHint::IsoLocal,
        };
        let dt = DateTime::pack(parts).unwrap();
        assert_eq!(dt.unpack(), parts);
        assert_eq!(dt.tz_biased(), 330 + 1024);
    }

    #[test]
    fn test_year_extremes_fit() {
        let low = DateTime::year_only(YEAR_MIN).unwrap();
        let high = DateTime::year_only(YEAR_MAX).unwrap();
        assert_eq!(low.year(), -4000);
        assert_eq!(high.year(), 4191);
        assert!(DateTime::year_only(YEAR_MAX + 1).is_err());
        assert!(DateTime::year_only(YEAR_MIN - 1).is_err());
    }

    #[test]
    fn test_no_timezone_differs_from_utc() {
        let local = DateTime::date_time(2024, 1, 1, 0, 0, 0, 0).unwrap();
        let utc = local
            .with_tz_offset(Some(0))
            .unwrap()
            .with_hint(FormatHint::IsoUtc);
        assert!(!local.has_timezone());
        assert!(!local.is_utc());
        assert!(utc.is_utc());
        assert_eq!(utc.tz_biased() as i32, TZ_BIAS);
        assert_ne!(local, utc);
    }

    #[test]
    fn test_validity_leap_years() {
        assert!(DateTime::date(2024, 2, 29).unwrap().is_valid());
        assert!(!DateTime::date(2023, 2, 29).unwrap().is_valid());
        assert!(!DateTime::date(2024, 2, 30).unwrap().is_valid());
        assert!(!DateTime::date(2024, 4, 31).unwrap().is_valid());
        assert!(DateTime::date(2000, 2, 29).unwrap().is_valid());
        assert!(!DateTime::date(1900, 2, 29).unwrap().is_valid());
    }

    #[test]
    fn test_validity_partial_dates() {
        let month_only = DateTime::date(2024, 8, 0).unwrap();
        assert!(month_only.is_valid());
        let bad_month = DateTime::date(2024, 13, 0).unwrap();
        assert!(!bad_month.is_valid());
    }

    #[test]
    fn test_validity_time_ranges() {
        assert!(DateTime::time(23, 59, 59, 999).unwrap().is_valid());
        assert!(!DateTime::time(24, 0, 0, 0).unwrap().is_valid());
        assert!(!DateTime::time(12, 60, 0, 0).unwrap().is_valid());
        assert!(!DateTime::time(12, 0, 0, 1000).unwrap().is_valid());
    }

    #[test]
    fn test_timezone_out_of_range_rejected() {
        let dt = DateTime::date(2024, 1, 1).unwrap();
        assert!(dt.with_tz_offset(Some(1023)).is_ok());
        assert!(dt.with_tz_offset(Some(-1023)).is_ok());
        assert!(matches!(
            dt.with_tz_offset(Some(1024)),
            Err(DateTimeError::OutOfRange { field: "timezone", .. })
        ));
    }
}
