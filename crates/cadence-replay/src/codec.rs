//! Binary encode/decode for the record format.
//!
//! All integers are little-endian. Strings and byte arrays are
//! length-prefixed with a `u32` length. No compression, no alignment
//! padding, no self-describing schema.

use std::io::{Read, Write};

use cadence_core::{ActorId, ActorInput, Frame, InputCommand, PlayerInfo, Roster, Tick};

use crate::error::RecordError;
use crate::{FORMAT_VERSION, MAGIC};

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), RecordError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), RecordError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), RecordError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), RecordError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Write a length-prefixed byte array (u32 length + bytes).
pub fn write_length_prefixed_bytes(w: &mut dyn Write, b: &[u8]) -> Result<(), RecordError> {
    write_u32_le(w, b.len() as u32)?;
    w.write_all(b)?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, RecordError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, RecordError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, RecordError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, RecordError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| RecordError::MalformedFrame {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

/// Read a length-prefixed byte array.
pub fn read_length_prefixed_bytes(r: &mut dyn Read) -> Result<Vec<u8>, RecordError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

// ── Header encode/decode ────────────────────────────────────────

/// Encode the record header: magic, version, and the session roster.
pub fn encode_header(w: &mut dyn Write, roster: &Roster) -> Result<(), RecordError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;

    write_u8(w, roster.actor_count)?;
    write_u8(w, roster.local_actor.0)?;
    write_u32_le(w, roster.players.len() as u32)?;
    for player in &roster.players {
        write_u8(w, player.actor.0)?;
        write_length_prefixed_str(w, &player.name)?;
        write_length_prefixed_bytes(w, &player.descriptor)?;
    }
    Ok(())
}

/// Decode and validate the record header, returning the roster.
pub fn decode_header(r: &mut dyn Read) -> Result<Roster, RecordError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(RecordError::InvalidMagic);
    }

    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(RecordError::UnsupportedVersion { found: version });
    }

    let actor_count = read_u8(r)?;
    let local_actor = ActorId(read_u8(r)?);
    let player_count = read_u32_le(r)? as usize;
    let mut players = Vec::with_capacity(player_count);
    for _ in 0..player_count {
        players.push(PlayerInfo {
            actor: ActorId(read_u8(r)?),
            name: read_length_prefixed_str(r)?,
            descriptor: read_length_prefixed_bytes(r)?,
        });
    }

    Ok(Roster {
        actor_count,
        local_actor,
        players,
    })
}

// ── Frame encode/decode ─────────────────────────────────────────

/// Encode a single confirmed frame.
pub fn encode_frame(w: &mut dyn Write, frame: &Frame) -> Result<(), RecordError> {
    write_u64_le(w, frame.tick.0)?;
    write_u32_le(w, frame.inputs.len() as u32)?;
    for input in &frame.inputs {
        write_u8(w, input.actor.0)?;
        write_u32_le(w, input.commands.len() as u32)?;
        for cmd in &input.commands {
            write_u8(w, cmd.opcode)?;
            write_length_prefixed_bytes(w, &cmd.payload)?;
        }
    }
    Ok(())
}

/// Decode a single frame.
///
/// Returns `Ok(None)` on clean EOF (no bytes available),
/// `Ok(Some(frame))` on success, or an error on truncated or corrupt
/// data.
pub fn decode_frame(r: &mut dyn Read) -> Result<Option<Frame>, RecordError> {
    // Read the tick header byte-by-byte to distinguish clean EOF
    // (zero bytes available) from truncation (1-7 bytes before EOF).
    let mut tick_buf = [0u8; 8];
    let mut filled = 0;
    while filled < 8 {
        match r.read(&mut tick_buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    // Clean EOF, no more frames.
                    return Ok(None);
                }
                return Err(RecordError::MalformedFrame {
                    detail: format!("truncated frame header: got {filled} of 8 bytes for tick"),
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RecordError::Io(e)),
        }
    }
    let tick = Tick(u64::from_le_bytes(tick_buf));

    let input_count = read_u32_le(r)? as usize;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let actor = ActorId(read_u8(r)?);
        let command_count = read_u32_le(r)? as usize;
        let mut commands = Vec::with_capacity(command_count);
        for _ in 0..command_count {
            let opcode = read_u8(r)?;
            let payload = read_length_prefixed_bytes(r)?;
            commands.push(InputCommand::new(opcode, &payload));
        }
        inputs.push(ActorInput::with_commands(actor, commands));
    }

    Ok(Some(Frame::new(tick, inputs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_roster() -> Roster {
        Roster {
            actor_count: 2,
            local_actor: ActorId(0),
            players: vec![
                PlayerInfo {
                    actor: ActorId(0),
                    name: "alice".into(),
                    descriptor: vec![1, 2, 3],
                },
                PlayerInfo {
                    actor: ActorId(1),
                    name: "bob".into(),
                    descriptor: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn roundtrip_header() {
        let roster = sample_roster();
        let mut buf = Vec::new();
        encode_header(&mut buf, &roster).unwrap();
        let got = decode_header(&mut buf.as_slice()).unwrap();
        assert_eq!(roster, got);
    }

    #[test]
    fn bad_magic_rejected() {
        let data = b"XDNC\x01";
        let result = decode_header(&mut data.as_slice());
        assert!(matches!(result, Err(RecordError::InvalidMagic)));
    }

    #[test]
    fn bad_version_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.push(99);
        let result = decode_header(&mut buf.as_slice());
        assert!(matches!(
            result,
            Err(RecordError::UnsupportedVersion { found: 99 })
        ));
    }

    #[test]
    fn roundtrip_frame_with_inputs() {
        let frame = Frame::new(
            Tick(7),
            vec![
                ActorInput::with_commands(
                    ActorId(0),
                    [InputCommand::new(1, &[5, 6]), InputCommand::new(2, &[])],
                ),
                ActorInput::empty(ActorId(1)),
            ],
        );
        let mut buf = Vec::new();
        encode_frame(&mut buf, &frame).unwrap();
        let got = decode_frame(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(frame, got);
    }

    #[test]
    fn eof_returns_none() {
        let buf: Vec<u8> = Vec::new();
        assert!(decode_frame(&mut buf.as_slice()).unwrap().is_none());
    }

    #[test]
    fn partial_tick_header_is_error_not_eof() {
        for partial_len in 1..=7 {
            let buf = vec![0xAA; partial_len];
            match decode_frame(&mut buf.as_slice()) {
                Err(RecordError::MalformedFrame { detail }) => {
                    assert!(
                        detail.contains("truncated frame header"),
                        "wrong detail for {partial_len} bytes: {detail}"
                    );
                }
                other => panic!("expected MalformedFrame for {partial_len} bytes, got {other:?}"),
            }
        }
    }

    #[test]
    fn complete_tick_header_but_truncated_body_is_error() {
        let buf = 42u64.to_le_bytes().to_vec();
        assert!(decode_frame(&mut buf.as_slice()).is_err());
    }

    proptest! {
        #[test]
        fn roundtrip_arbitrary_frame(
            tick in any::<u64>(),
            actors in prop::collection::vec(
                (0u8..8, prop::collection::vec(
                    (any::<u8>(), prop::collection::vec(any::<u8>(), 0..16)),
                    0..3,
                )),
                0..4,
            ),
        ) {
            let inputs: Vec<_> = actors
                .into_iter()
                .map(|(actor, commands)| {
                    ActorInput::with_commands(
                        ActorId(actor),
                        commands
                            .into_iter()
                            .map(|(op, payload)| InputCommand::new(op, &payload)),
                    )
                })
                .collect();
            let frame = Frame::new(Tick(tick), inputs);

            let mut buf = Vec::new();
            encode_frame(&mut buf, &frame).unwrap();
            let got = decode_frame(&mut buf.as_slice()).unwrap().unwrap();
            prop_assert_eq!(frame, got);
        }
    }
}
