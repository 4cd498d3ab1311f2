use mosaic_value::{Diagnostic, ErrorKind, ValueError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Math syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("Math flavor '{0}' is not supported here")]
    UnsupportedFlavor(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl MathError {
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MathError::Syntax { .. } => ErrorKind::BadSyntax,
            MathError::UnsupportedFlavor(_) => ErrorKind::UnsupportedFormat,
            MathError::Value(err) => err.kind(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.kind(), self.to_string());
        match self {
            MathError::Syntax { offset, .. } => diagnostic.at(*offset),
            _ => diagnostic,
        }
    }
}
