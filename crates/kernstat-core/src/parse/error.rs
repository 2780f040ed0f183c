//! Error types shared by every parser in the crate.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Why a single token could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    Empty,
    NotNumeric,
    UnknownSuffix(char),
    OutOfRange,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeErrorKind::Empty => write!(f, "empty token"),
            DecodeErrorKind::NotNumeric => write!(f, "not a number"),
            DecodeErrorKind::UnknownSuffix(c) => write!(f, "unknown magnitude suffix '{}'", c),
            DecodeErrorKind::OutOfRange => write!(f, "value out of range"),
        }
    }
}

/// A single token failed numeric decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {token:?}: {kind}")]
pub struct DecodeError {
    pub token: String,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(token: impl Into<String>, kind: DecodeErrorKind) -> Self {
        Self {
            token: token.into(),
            kind,
        }
    }
}

/// Error returned by the parsing engine.
///
/// Every variant carries the raw token, line or path that caused it so the
/// caller can log it without re-reading the input.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("malformed {what}: {line:?}")]
    Structural { what: String, line: String },

    #[error("cannot resolve {}: {reason}", path.display())]
    Resolution { path: PathBuf, reason: String },

    #[error("read failed: {0}")]
    Stream(#[from] io::Error),
}

impl ParseError {
    pub fn structural(what: impl Into<String>, line: impl Into<String>) -> Self {
        ParseError::Structural {
            what: what.into(),
            line: line.into(),
        }
    }

    pub fn resolution(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ParseError::Resolution {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A directory-level unit (bcache set, iSCSI LUN) left out of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    pub path: PathBuf,
    pub reason: String,
}

impl SkippedUnit {
    pub fn new(path: impl Into<PathBuf>, error: &ParseError) -> Self {
        Self {
            path: path.into(),
            reason: error.to_string(),
        }
    }
}
