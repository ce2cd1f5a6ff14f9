//! Error taxonomy for decoding, encoding, and editing operations.

use kcboard_sexpr::ParseError;
use thiserror::Error;

/// Malformed or structurally invalid input encountered during decode.
///
/// Decode never recovers from these internally; the first failure aborts the
/// whole decode. Unknown keyed children are not errors (see the per-record
/// decoders), only structural violations are.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("expected a list at the document root")]
    RootNotList,

    #[error("{record} must have at least {min} children")]
    TooShort { record: &'static str, min: usize },

    #[error("missing leading {expected} marker")]
    BadMarker { expected: &'static str },

    #[error("{record} is missing required field {field}")]
    Missing {
        record: &'static str,
        field: &'static str,
    },

    #[error("{record}.{field}: expected {expected}")]
    Field {
        record: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{record}.{field}: unknown value {value:?}")]
    UnknownValue {
        record: &'static str,
        field: &'static str,
        value: String,
    },
}

/// An internally-detected impossible geometric state.
///
/// This signals a logic defect rather than bad input; callers should treat it
/// as fatal rather than retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("line crosses the region boundary {count} times")]
    TooManyCrossings { count: usize },
}

/// Failure while carving drawings out of a board.
#[derive(Debug, Error)]
pub enum CarveError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("cannot carve {kind} drawings")]
    Unsupported { kind: &'static str },
}

/// Failure while loading a document from disk.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),
}
