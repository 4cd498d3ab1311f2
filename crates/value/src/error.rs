use crate::tag::TypeTag;
use std::fmt;
use thiserror::Error;

/// The error taxonomy shared by every parser and formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadSyntax,
    OutOfRange,
    Invalid,
    TypeMismatch,
    UnsupportedFormat,
    NotFound,
    OutOfMemory,
    DepthExceeded,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadSyntax => "bad-syntax",
            ErrorKind::OutOfRange => "out-of-range",
            ErrorKind::Invalid => "invalid",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::UnsupportedFormat => "unsupported-format",
            ErrorKind::NotFound => "not-found",
            ErrorKind::OutOfMemory => "out-of-memory",
            ErrorKind::DepthExceeded => "depth-exceeded",
        }
    }

    /// Terminal kinds abort the current call instead of becoming error items.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ErrorKind::OutOfMemory | ErrorKind::DepthExceeded | ErrorKind::UnsupportedFormat
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an [`crate::Item::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    /// Byte offset into the source, when the failure has a location.
    pub offset: Option<usize>,
    /// Tokens the parser would have accepted at `offset`.
    pub expected: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: None,
            expected: Vec::new(),
        }
    }

    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BadSyntax,
            message: message.into(),
            offset: Some(offset),
            expected: Vec::new(),
        }
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn expecting<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected = tokens.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " at byte {}", offset)?;
        }
        if !self.expected.is_empty() {
            write!(f, " (expected {})", self.expected.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: TypeTag, found: TypeTag },

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error("Out of memory: requested {requested} bytes with {available} available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("Recursion depth {0} exceeded")]
    DepthExceeded(usize),
}

impl ValueError {
    pub fn mismatch(expected: TypeTag, found: TypeTag) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ValueError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ValueError::OutOfRange(_) => ErrorKind::OutOfRange,
            ValueError::Invalid(_) => ErrorKind::Invalid,
            ValueError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            ValueError::DepthExceeded(_) => ErrorKind::DepthExceeded,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.kind(), self.to_string())
    }
}
