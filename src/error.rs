// src/error.rs
use mosaic_data::DataError;
use mosaic_markup::MarkupError;
use mosaic_math::MathError;
use mosaic_value::{Diagnostic, ErrorKind, ValueError};
use thiserror::Error;

/// The error type of the top-level `parse`/`format` entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MosaicError {
    #[error("Data format error: {0}")]
    Data(#[from] DataError),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("Parsing failed: {0}")]
    Parse(Diagnostic),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Format '{format}' does not support {operation}")]
    NotSupported {
        format: String,
        operation: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MosaicError {
    pub fn unsupported(format: impl Into<String>) -> Self {
        MosaicError::UnsupportedFormat(format.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MosaicError::Data(err) => err.kind(),
            MosaicError::Markup(err) => err.kind(),
            MosaicError::Math(err) => err.kind(),
            MosaicError::Value(err) => err.kind(),
            MosaicError::Parse(diagnostic) => diagnostic.kind,
            MosaicError::UnsupportedFormat(_) | MosaicError::NotSupported { .. } => {
                ErrorKind::UnsupportedFormat
            }
            MosaicError::NotFound(_) => ErrorKind::NotFound,
            MosaicError::Config(_) => ErrorKind::Invalid,
        }
    }

    /// The diagnostic to embed when the failure is reported as an error item.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            MosaicError::Data(err) => err.to_diagnostic(),
            MosaicError::Math(err) => err.to_diagnostic(),
            MosaicError::Parse(diagnostic) => diagnostic.clone(),
            other => Diagnostic::new(other.kind(), other.to_string()),
        }
    }
}

// Engine options are loaded from JSON; report a bad document as a config error.
impl From<serde_json::Error> for MosaicError {
    fn from(e: serde_json::Error) -> Self {
        MosaicError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_the_wrapped_error() {
        let err = MosaicError::from(DataError::syntax("json", 3, "expected ','"));
        assert_eq!(err.kind(), ErrorKind::BadSyntax);
        assert_eq!(err.to_diagnostic().offset, Some(3));

        assert_eq!(MosaicError::unsupported("rtf").kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(
            MosaicError::NotFound("sys://disk".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MosaicError::from(ValueError::DepthExceeded(50)).kind(),
            ErrorKind::DepthExceeded
        );
    }

    #[test]
    fn test_json_errors_become_config_errors() {
        let err: MosaicError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, MosaicError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
