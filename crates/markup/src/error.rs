use mosaic_value::{Diagnostic, ErrorKind, ValueError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("{dialect} syntax error on line {line}: {message}")]
    Syntax {
        dialect: &'static str,
        line: usize,
        message: String,
    },

    #[error("Unknown markup dialect: {0}")]
    UnknownDialect(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl MarkupError {
    pub fn syntax(dialect: &'static str, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            dialect,
            line,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MarkupError::Syntax { .. } => ErrorKind::BadSyntax,
            MarkupError::UnknownDialect(_) => ErrorKind::UnsupportedFormat,
            MarkupError::Value(err) => err.kind(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.kind(), self.to_string())
    }
}
