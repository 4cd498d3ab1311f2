//! Bit-packed calendar values.
//!
//! A [`DateTime`] is a single `u64` carrying year/month, day, clock fields,
//! a biased timezone offset, a precision tag and a format hint. The crate
//! parses and formats three textual dialects:
//!
//! - [`Dialect::Iso8601`]: `YYYY[-MM[-DD]]([Tt ]HH:MM:SS[.fff])[Zz|±HH:MM]?`, or a bare clock
//! - [`Dialect::Ics`]: `YYYYMMDD[THHMMSS[Z]]`
//! - [`Dialect::Lambda`]: ISO-8601 plus optional seconds and `t'…'` quoting
//!
//! # Example
//!
//! ```ignore
//! use mosaic_datetime::{parse, to_string, Dialect};
//!
//! let (value, consumed) = parse("2024-08-12T14:30:45.123+05:30", Dialect::Iso8601)?;
//! assert_eq!(to_string(value, Dialect::Iso8601), "2024-08-12T14:30:45.123+05:30");
//! ```

pub mod calendar;
pub mod error;
pub mod format;
pub mod packed;
pub mod parser;

pub use calendar::{days_in_month, is_leap_year};
pub use error::DateTimeError;
pub use format::{format_into, format_pattern, to_string};
pub use packed::{
    DateTime, DateTimeParts, FormatHint, Precision, TZ_BIAS, TZ_MAX_OFFSET, TZ_NONE, YEAR_MAX,
    YEAR_MIN,
};
pub use parser::{Dialect, parse, parse_exact};
