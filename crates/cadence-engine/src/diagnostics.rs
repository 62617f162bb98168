//! Desync post-mortem report.

use std::fmt;
use std::io;

use cadence_core::Tick;

/// Everything captured when a state-hash verification fails.
///
/// Built at the moment of detection, before the session pauses, so the
/// per-system hashes reflect the diverged state.
#[derive(Clone, Debug)]
pub struct DesyncReport {
    /// The tick whose hashes disagreed.
    pub tick: Tick,
    /// Hash recorded when the tick first executed.
    pub recorded: u64,
    /// Hash computed on re-execution, or received from a peer.
    pub computed: u64,
    /// Per-system hash breakdown at detection time.
    pub system_hashes: Vec<(String, u64)>,
    /// Trailing window of recorded aggregate hashes, oldest first.
    pub recent_hashes: Vec<(Tick, u64)>,
}

impl DesyncReport {
    /// Write the report in a line-oriented dump format.
    pub fn write_to<W: io::Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "desync at tick {}", self.tick)?;
        writeln!(w, "recorded {:#018x}", self.recorded)?;
        writeln!(w, "computed {:#018x}", self.computed)?;
        writeln!(w, "systems:")?;
        for (name, hash) in &self.system_hashes {
            writeln!(w, "  {name} {hash:#018x}")?;
        }
        writeln!(w, "recent:")?;
        for (tick, hash) in &self.recent_hashes {
            writeln!(w, "  {tick} {hash:#018x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DesyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "desync at tick {}: recorded {:#x}, computed {:#x} ({} systems)",
            self.tick,
            self.recorded,
            self.computed,
            self.system_hashes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DesyncReport {
        DesyncReport {
            tick: Tick(42),
            recorded: 0xaa,
            computed: 0xbb,
            system_hashes: vec![("movement".to_string(), 0x1), ("counter".to_string(), 0x2)],
            recent_hashes: vec![(Tick(41), 0x9), (Tick(42), 0xaa)],
        }
    }

    #[test]
    fn dump_lists_systems_and_recent_hashes() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("desync at tick 42\n"));
        assert!(text.contains("movement"));
        assert!(text.contains("counter"));
        assert!(text.contains("41"));
    }

    #[test]
    fn display_is_single_line() {
        let line = sample().to_string();
        assert!(!line.contains('\n'));
        assert!(line.contains("tick 42"));
    }
}
