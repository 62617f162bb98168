//! Per-tick state hash ledger.
//!
//! Records the world's aggregate hash at every executed tick, verifies
//! re-simulated ticks against the first execution, and batches verified
//! hashes for cross-peer exchange.

use std::collections::BTreeMap;

use log::warn;

use cadence_core::{SyncError, Tick};

/// Rolling window of per-tick state hashes.
pub struct StateHasher {
    hashes: BTreeMap<u64, u64>,
    window: u64,
    next_broadcast: Tick,
}

impl StateHasher {
    /// A hasher retaining the trailing `window` ticks of hashes.
    pub fn new(window: u64) -> Self {
        Self {
            hashes: BTreeMap::new(),
            window,
            next_broadcast: Tick(0),
        }
    }

    /// Record the hash observed for `tick`, overwriting any previous
    /// recording, and drop entries that fell out of the window.
    pub fn record(&mut self, tick: Tick, hash: u64) {
        self.hashes.insert(tick.0, hash);
        if let Some(cutoff) = tick.0.checked_sub(self.window) {
            self.hashes = self.hashes.split_off(&(cutoff + 1));
        }
    }

    /// The recorded hash for `tick`, if still retained.
    pub fn get(&self, tick: Tick) -> Option<u64> {
        self.hashes.get(&tick.0).copied()
    }

    /// Compare `computed` against the hash recorded for `tick`.
    ///
    /// A tick with no recording passes: it either predates the window
    /// or was never executed before, and neither is evidence of
    /// divergence.
    pub fn verify(&self, tick: Tick, computed: u64) -> Result<(), SyncError> {
        match self.get(tick) {
            Some(recorded) if recorded != computed => Err(SyncError::HashMismatch {
                tick,
                recorded,
                computed,
            }),
            _ => Ok(()),
        }
    }

    /// Contiguous run of recorded hashes from the broadcast cursor up
    /// to and including `verified`, advancing the cursor past them.
    ///
    /// Returns `None` when nothing new is verified or the run's first
    /// tick is missing. Only verified ticks are ever exchanged, so a
    /// peer comparing against these can treat any mismatch as a true
    /// desync rather than a misprediction.
    pub fn take_broadcast(&mut self, verified: Tick) -> Option<(Tick, Vec<u64>)> {
        if verified < self.next_broadcast {
            return None;
        }
        // If the cursor fell behind the retention window, resume at the
        // oldest retained hash instead of stalling forever.
        if let Some(&oldest) = self.hashes.keys().next() {
            if self.next_broadcast.0 < oldest {
                self.next_broadcast = Tick(oldest);
            }
        }
        let first = self.next_broadcast;
        let mut run = Vec::new();
        for t in first.0..=verified.0 {
            match self.hashes.get(&t) {
                Some(&h) => run.push(h),
                None => break,
            }
        }
        if run.is_empty() {
            return None;
        }
        self.next_broadcast = Tick(first.0 + run.len() as u64);
        Some((first, run))
    }

    /// Compare a peer's verified hash run against local recordings.
    ///
    /// Returns the first tick whose hashes disagree, with the local and
    /// remote values. Ticks the local window no longer retains, and
    /// ticks beyond `verified` locally, are skipped: only ticks both
    /// sides have confirmed are comparable.
    pub fn check_peer_hashes(
        &self,
        first_tick: Tick,
        hashes: &[u64],
        verified: Tick,
    ) -> Option<(Tick, u64, u64)> {
        for (i, &remote) in hashes.iter().enumerate() {
            let tick = Tick(first_tick.0 + i as u64);
            if tick > verified {
                break;
            }
            match self.get(tick) {
                Some(local) if local != remote => {
                    warn!("peer hash mismatch at tick {tick}: local {local:#x}, remote {remote:#x}");
                    return Some((tick, local, remote));
                }
                _ => {}
            }
        }
        None
    }

    /// The newest `n` recorded hashes, oldest first.
    pub fn recent(&self, n: usize) -> Vec<(Tick, u64)> {
        let mut out: Vec<_> = self
            .hashes
            .iter()
            .rev()
            .take(n)
            .map(|(&t, &h)| (Tick(t), h))
            .collect();
        out.reverse();
        out
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether any hashes are retained.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_matches_recorded_hash() {
        let mut hasher = StateHasher::new(10);
        hasher.record(Tick(3), 0xabc);
        assert!(hasher.verify(Tick(3), 0xabc).is_ok());
        assert_eq!(
            hasher.verify(Tick(3), 0xdef),
            Err(SyncError::HashMismatch {
                tick: Tick(3),
                recorded: 0xabc,
                computed: 0xdef,
            })
        );
    }

    #[test]
    fn verify_unrecorded_tick_passes() {
        let hasher = StateHasher::new(10);
        assert!(hasher.verify(Tick(7), 0x123).is_ok());
    }

    #[test]
    fn window_evicts_old_entries() {
        let mut hasher = StateHasher::new(3);
        for t in 0..10u64 {
            hasher.record(Tick(t), t);
        }
        assert_eq!(hasher.get(Tick(6)), None);
        assert_eq!(hasher.get(Tick(7)), Some(7));
        assert_eq!(hasher.len(), 3);
    }

    #[test]
    fn take_broadcast_returns_contiguous_run() {
        let mut hasher = StateHasher::new(100);
        for t in 0..5u64 {
            hasher.record(Tick(t), t * 10);
        }
        let (first, run) = hasher.take_broadcast(Tick(2)).unwrap();
        assert_eq!(first, Tick(0));
        assert_eq!(run, vec![0, 10, 20]);

        // Cursor advanced: the next take starts at tick 3.
        let (first, run) = hasher.take_broadcast(Tick(4)).unwrap();
        assert_eq!(first, Tick(3));
        assert_eq!(run, vec![30, 40]);

        // Nothing new.
        assert_eq!(hasher.take_broadcast(Tick(4)), None);
    }

    #[test]
    fn take_broadcast_stops_at_gap() {
        let mut hasher = StateHasher::new(100);
        hasher.record(Tick(0), 1);
        hasher.record(Tick(2), 3);
        let (first, run) = hasher.take_broadcast(Tick(2)).unwrap();
        assert_eq!(first, Tick(0));
        assert_eq!(run, vec![1]);
    }

    #[test]
    fn check_peer_hashes_finds_first_divergence() {
        let mut hasher = StateHasher::new(100);
        for t in 0..5u64 {
            hasher.record(Tick(t), t);
        }
        let remote = [0u64, 1, 99, 98];
        let hit = hasher.check_peer_hashes(Tick(0), &remote, Tick(4));
        assert_eq!(hit, Some((Tick(2), 2, 99)));
    }

    #[test]
    fn check_peer_hashes_skips_unverified_ticks() {
        let mut hasher = StateHasher::new(100);
        for t in 0..5u64 {
            hasher.record(Tick(t), t);
        }
        // Ticks past the local verified frontier are predictions and
        // must not count as divergence.
        let remote = [0u64, 1, 99];
        assert_eq!(hasher.check_peer_hashes(Tick(0), &remote, Tick(1)), None);
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let mut hasher = StateHasher::new(100);
        for t in 0..5u64 {
            hasher.record(Tick(t), t * 2);
        }
        assert_eq!(
            hasher.recent(2),
            vec![(Tick(3), 6), (Tick(4), 8)]
        );
    }
}
