//! Streaming record reader.

use std::io::Read;

use cadence_core::{Frame, ReplayScript, Roster};

use crate::codec::{decode_frame, decode_header};
use crate::error::RecordError;

/// Reads a session record from any [`Read`] source.
///
/// The header is decoded at construction; frames stream out one at a
/// time until clean EOF.
pub struct RecordReader<R: Read> {
    source: R,
    roster: Roster,
}

impl<R: Read> RecordReader<R> {
    /// Open a record, validating its header.
    pub fn new(mut source: R) -> Result<Self, RecordError> {
        let roster = decode_header(&mut source)?;
        Ok(Self { source, roster })
    }

    /// The roster recorded in the header.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The next frame, or `Ok(None)` at the end of the record.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, RecordError> {
        decode_frame(&mut self.source)
    }

    /// Read every remaining frame into a [`ReplayScript`].
    pub fn read_script(mut self) -> Result<ReplayScript, RecordError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(ReplayScript {
            roster: self.roster,
            frames,
        })
    }
}
