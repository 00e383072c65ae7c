use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid cell reference: {0}")]
    InvalidCellId(String),
}

/// Error values produced by formula evaluation. These are data, displayed in
/// place of a computed result, never propagated to the caller as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// Bad address, bad range, or circular reference.
    #[error("#REF!")]
    Ref,
    /// Unsupported function or non-numeric residual expression.
    #[error("#NAME?")]
    Name,
    /// The arithmetic evaluator failed.
    #[error("#ERROR!")]
    Error,
}

/// Failure inside the arithmetic evaluator. Surfaces to users only as
/// [`FormulaError::Error`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithmeticError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("legacy binary spreadsheet format (.{0}) is not supported; save the file as CSV first")]
    LegacyFormat(String),
    #[error("unrecognized file format ({0}); only .csv files can be imported")]
    UnrecognizedFormat(String),
    #[error("the file contains no data")]
    Empty,
    #[error("line {line} has {found} fields, expected {expected}")]
    ShapeMismatch { line: u64, expected: usize, found: usize },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for ExportError {
    fn from(err: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        ExportError::Io(err.into_error())
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard access denied: {0}")]
    Access(String),
    #[error("clipboard is empty")]
    Empty,
}
