//! Session recording and playback format.
//!
//! A record is the session roster followed by every confirmed input
//! frame in tick order. Because the simulation is deterministic, that
//! is enough to reproduce the entire run: feed the frames back through
//! the same systems and every tick hashes identically.
//!
//! The format is append-only and EOF-delimited, so a recording cut off
//! mid-session (a crash, a kill -9) stays readable up to its last
//! complete frame.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use error::RecordError;
pub use reader::RecordReader;
pub use writer::RecordWriter;

/// Magic bytes at the start of every record file.
pub const MAGIC: [u8; 4] = *b"CDNC";

/// Current record format version.
pub const FORMAT_VERSION: u8 = 1;
