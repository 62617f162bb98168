//! Error type for record encoding and decoding.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors produced while writing or reading a session record.
#[derive(Debug)]
pub enum RecordError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// The file does not start with the record magic bytes.
    InvalidMagic,
    /// The file's format version is not supported by this build.
    UnsupportedVersion {
        /// The version byte found in the header.
        found: u8,
    },
    /// A frame's encoding is internally inconsistent or truncated.
    MalformedFrame {
        /// Human-readable description of the problem.
        detail: String,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "record I/O error: {e}"),
            Self::InvalidMagic => write!(f, "not a session record (bad magic bytes)"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported record format version {found}")
            }
            Self::MalformedFrame { detail } => write!(f, "malformed record frame: {detail}"),
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RecordError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
