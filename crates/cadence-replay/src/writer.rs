//! Streaming record writer.

use std::io::Write;

use log::debug;

use cadence_core::{Frame, Roster};

use crate::codec::{encode_frame, encode_header};
use crate::error::RecordError;

/// Writes a session record to any [`Write`] sink.
///
/// The header goes out at construction; confirmed frames are appended
/// one at a time as the session verifies them. The format carries no
/// frame count, so a recording interrupted mid-session is still
/// readable up to its last complete frame.
pub struct RecordWriter<W: Write> {
    sink: W,
    frames_written: u64,
}

impl<W: Write> RecordWriter<W> {
    /// Start a record for the given roster.
    pub fn new(mut sink: W, roster: &Roster) -> Result<Self, RecordError> {
        encode_header(&mut sink, roster)?;
        debug!("record started for {} actors", roster.actor_count);
        Ok(Self {
            sink,
            frames_written: 0,
        })
    }

    /// Append one confirmed frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), RecordError> {
        encode_frame(&mut self.sink, frame)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Frames appended so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<(), RecordError> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and return the sink.
    pub fn into_inner(mut self) -> Result<W, RecordError> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}
