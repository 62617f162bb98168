//! Generic tick-keyed snapshot storage.

use std::collections::BTreeMap;

use crate::id::Tick;

/// Ordered tick → snapshot map backing [`TimeMachine`](crate::TimeMachine)
/// implementations.
///
/// Systems embed one of these per state blob: `backup` maps to
/// [`record`](SnapshotStore::record), `rollback_to` to
/// [`restore_at_or_before`](SnapshotStore::restore_at_or_before), and
/// `clean` to [`prune_before`](SnapshotStore::prune_before).
#[derive(Clone, Debug, Default)]
pub struct SnapshotStore<S: Clone> {
    snapshots: BTreeMap<u64, S>,
}

impl<S: Clone> SnapshotStore<S> {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            snapshots: BTreeMap::new(),
        }
    }

    /// Record a snapshot keyed by `tick`, replacing any previous
    /// snapshot at the same tick.
    pub fn record(&mut self, tick: Tick, state: S) {
        self.snapshots.insert(tick.0, state);
    }

    /// The newest snapshot at or before `tick`, with the tick it was
    /// recorded at.
    pub fn restore_at_or_before(&self, tick: Tick) -> Option<(Tick, &S)> {
        self.snapshots
            .range(..=tick.0)
            .next_back()
            .map(|(&t, s)| (Tick(t), s))
    }

    /// Drop all snapshots strictly before `tick`.
    pub fn prune_before(&mut self, tick: Tick) {
        self.snapshots = self.snapshots.split_off(&tick.0);
    }

    /// The oldest retained snapshot tick.
    pub fn oldest(&self) -> Option<Tick> {
        self.snapshots.keys().next().map(|&t| Tick(t))
    }

    /// The newest retained snapshot tick.
    pub fn latest(&self) -> Option<Tick> {
        self.snapshots.keys().next_back().map(|&t| Tick(t))
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshots are retained.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
