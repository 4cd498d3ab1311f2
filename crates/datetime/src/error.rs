use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("Bad datetime syntax at byte {offset}: expected {expected}")]
    BadSyntax { offset: usize, expected: String },

    #[error("Datetime field '{field}' out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("Invalid datetime: {0}")]
    Invalid(String),
}

impl DateTimeError {
    pub fn syntax(offset: usize, expected: impl Into<String>) -> Self {
        Self::BadSyntax {
            offset,
            expected: expected.into(),
        }
    }

    pub fn range(field: &'static str, value: i64) -> Self {
        Self::OutOfRange { field, value }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
