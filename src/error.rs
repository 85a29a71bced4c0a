//! Error types for thriftwire.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::wire::Type;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for all thriftwire operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying byte stream, including short reads
    /// promoted to `ErrorKind::UnexpectedEof`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An unknown or structurally invalid wire type tag.
    #[error("invalid wire type: {0}")]
    InvalidType(u8),

    /// A message header without the expected version or protocol id.
    #[error("version mismatch: {0}")]
    VersionMismatch(String),

    /// A protocol sequencing violation (re-entrant message write, frame
    /// underflow/overrun, unmatched struct end, ...).
    #[error("framing violation: {0}")]
    Framing(String),

    /// A varint ran past 10 bytes without terminating.
    #[error("varint overflows a 64-bit integer")]
    VarintOverflow,

    /// An error from an underlying wire call, tagged with the name of the
    /// failing operation (e.g. `ReadFieldBegin`).
    #[error("{action}: {source}")]
    Wire {
        /// The wire operation that failed.
        action: &'static str,
        /// The underlying error.
        source: Box<Error>,
    },

    /// A mismatch between declared and encoded types in the value layer,
    /// or a malformed field tag.
    #[error(transparent)]
    Semantic(Box<SemanticError>),

    /// Sentinel returned by the [`memo`](crate::memo) recorder when a step
    /// reaches its breakpoint.
    #[error("break")]
    Break,
}

impl Error {
    pub(crate) fn wire(action: &'static str, source: Error) -> Error {
        Error::Wire {
            action,
            source: Box::new(source),
        }
    }

    /// Returns the innermost wire action tag, if any.
    ///
    /// Walks through [`Error::Semantic`] wrappers so test oracles can match
    /// on the specific operation that failed.
    pub fn wire_action(&self) -> Option<&'static str> {
        match self {
            Error::Wire { action, .. } => Some(action),
            Error::Semantic(e) => e.source.as_deref().and_then(Error::wire_action),
            _ => None,
        }
    }
}

/// Describes an error determining the meaning of Thrift data as an
/// in-memory value or vice-versa.
#[derive(Debug)]
pub struct SemanticError {
    /// Either `"marshal"` or `"unmarshal"`; empty when unknown.
    pub action: &'static str,
    /// The Thrift type that could not be handled, if known.
    pub thrift_type: Option<Type>,
    /// The name of the user type that could not be handled, if known.
    pub type_name: Option<&'static str>,
    /// The underlying error, if any.
    pub source: Option<Box<Error>>,
}

impl SemanticError {
    pub(crate) fn boxed(self) -> Error {
        Error::Semantic(Box::new(self))
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preposition = match self.action {
            "marshal" => {
                f.write_str("cannot marshal")?;
                " from"
            }
            "unmarshal" => {
                f.write_str("cannot unmarshal")?;
                " into"
            }
            _ => {
                f.write_str("cannot handle")?;
                " with"
            }
        };
        let mut wrote_type = false;
        if let Some(t) = self.thrift_type {
            write!(f, " Thrift {t}")?;
            wrote_type = true;
        }
        if let Some(name) = self.type_name {
            if wrote_type {
                f.write_str(preposition)?;
            }
            write!(f, " value of type {name}")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SemanticError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
