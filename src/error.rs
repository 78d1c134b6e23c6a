//! Central error types for schema inference.
//!
//! Every structural failure aborts the whole inference job. No variant ever
//! carries a partially built schema.

use core::fmt;
use std::borrow::Cow;

/// All failures the inference pipeline can report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Unbalanced tags, a stream ending with open frames, or no root element.
    MalformedInput(Cow<'static, str>),
    /// A namespace-crossing build produced no document, or a reference node
    /// could not be bound to any import.
    NamespaceResolutionFailure(String),
    /// Rendering a schema document to text failed.
    SerializationFailure(String),
    /// The schema text list is shorter than the import graph requires.
    DeserializationIndexOutOfRange {
        /// Position that was requested.
        index: usize,
        /// Number of texts that were supplied.
        len: usize,
    },
    /// Nesting (element depth plus namespace alternations) exceeded the guard.
    DepthLimitExceeded { depth: usize, max: usize },
    /// The XML tokenizer rejected the input.
    XmlParseError(String),
    /// A schema text could not be read back into a document.
    XsdParseError(String),
    /// Input larger than the configured byte limit.
    InputTooLarge { len: usize, max: usize },
    /// Ein IO-Fehler (Temp-Verzeichnis, CLI).
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInput(msg) => {
                if msg.is_empty() {
                    write!(f, "malformed input")
                } else {
                    write!(f, "malformed input: {msg}")
                }
            }
            Self::NamespaceResolutionFailure(ns) => {
                write!(f, "namespace resolution failed for '{ns}'")
            }
            Self::SerializationFailure(msg) => write!(f, "schema serialization failed: {msg}"),
            Self::DeserializationIndexOutOfRange { index, len } => write!(
                f,
                "schema list index {index} out of range (only {len} schema texts supplied)"
            ),
            Self::DepthLimitExceeded { depth, max } => {
                write!(f, "nesting depth {depth} exceeds limit {max}")
            }
            Self::XmlParseError(msg) => write!(f, "XML parse error: {msg}"),
            Self::XsdParseError(msg) => write!(f, "XSD parse error: {msg}"),
            Self::InputTooLarge { len, max } => {
                write!(f, "input too large: {len} bytes (max {max} bytes)")
            }
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Erstellt einen `MalformedInput` Fehler mit Nachricht.
    pub fn malformed(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::MalformedInput(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
