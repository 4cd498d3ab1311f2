use mosaic_value::{Diagnostic, ErrorKind, ValueError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("{format} syntax error at byte {offset}: {message}")]
    Syntax {
        format: &'static str,
        offset: usize,
        message: String,
    },

    #[error("Invalid {format} input: {message}")]
    Invalid {
        format: &'static str,
        message: String,
    },

    #[error("Unknown {format} flavor '{flavor}'")]
    UnsupportedFlavor { format: &'static str, flavor: String },

    #[error("Unknown data format '{0}'")]
    UnknownFormat(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl DataError {
    pub fn syntax(format: &'static str, offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            format,
            offset,
            message: message.into(),
        }
    }

    pub fn invalid(format: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            format,
            message: message.into(),
        }
    }

    pub fn flavor(format: &'static str, flavor: impl Into<String>) -> Self {
        Self::UnsupportedFlavor {
            format,
            flavor: flavor.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::Syntax { .. } => ErrorKind::BadSyntax,
            DataError::Invalid { .. } => ErrorKind::Invalid,
            DataError::UnsupportedFlavor { .. } | DataError::UnknownFormat(_) => {
                ErrorKind::UnsupportedFormat
            }
            DataError::Value(err) => err.kind(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.kind(), self.to_string());
        match self {
            DataError::Syntax { offset, .. } => diagnostic.at(*offset),
            _ => diagnostic,
        }
    }
}

/// Byte offset of a 1-based `line`/`column` position, clamped to the source.
pub(crate) fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}
