//! Error types for the extraction pipeline.
//!
//! Parsers use `ParseError` internally and collapse it to the format's
//! default record at their public boundary; only schema contract
//! violations cross the pipeline boundary as errors.

use crate::core::schema::SchemaViolation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standardized failure kinds inside a structural or encryption parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum ParseErrorKind {
    Io,
    ShortRead,
    BadMagic,
    Truncated,
    IncoherentFields,
    BudgetExceeded,
    Other,
}

/// Concrete parser error with optional context message.
///
/// Never escapes a parser's public `parse`; the public boundary converts
/// it into the default record with `parser_ok = false`.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message:?}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: Option<String>) -> Self {
        Self { kind, message }
    }

    pub fn short_read() -> Self {
        Self::new(ParseErrorKind::ShortRead, None)
    }

    pub fn bad_magic() -> Self {
        Self::new(ParseErrorKind::BadMagic, None)
    }

    pub fn truncated() -> Self {
        Self::new(ParseErrorKind::Truncated, None)
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ParseErrorKind::Io, Some(e.to_string()))
    }
}

/// Pipeline-level extraction error.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The merged feature map does not match the declared schema. Fatal
    /// for a batch run.
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
    /// The file could not be opened or statted at all.
    #[error("i/o error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractError::Schema(_))
    }
}
