//! Deterministic world stepper.
//!
//! [`World`] owns the authoritative tick and an ordered list of
//! [`GameSystem`]s. Registration order is part of the determinism
//! contract: all peers register the same systems in the same order,
//! and registration closes when the world starts.

use std::collections::BTreeSet;

use log::debug;

use cadence_core::hash::{fnv1a_bytes, fnv1a_u64, FNV_OFFSET};
use cadence_core::{Fixed, Frame, GameSystem, StepContext, SyncError, Tick};

/// The deterministic tick stepper and snapshot registry.
pub struct World {
    tick: Tick,
    dt: Fixed,
    systems: Vec<Box<dyn GameSystem>>,
    snapshot_ticks: BTreeSet<u64>,
    started: bool,
}

impl World {
    /// A world stepping with the given fixed delta time.
    pub fn new(dt: Fixed) -> Self {
        Self {
            tick: Tick(0),
            dt,
            systems: Vec::new(),
            snapshot_ticks: BTreeSet::new(),
            started: false,
        }
    }

    /// Register a system. Fails once the world has started.
    pub fn register(&mut self, system: Box<dyn GameSystem>) -> Result<(), SyncError> {
        if self.started {
            return Err(SyncError::AlreadyRunning);
        }
        self.systems.push(system);
        Ok(())
    }

    /// Close registration.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// The current tick: the next tick to be executed.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// The fixed step delta time.
    pub fn dt(&self) -> Fixed {
        self.dt
    }

    /// Execute one tick with the given input frame.
    ///
    /// Runs every enabled system in registration order, then advances
    /// the tick by exactly one.
    pub fn step(&mut self, frame: &Frame) {
        debug_assert_eq!(frame.tick, self.tick, "frame tick must match world tick");
        let ctx = StepContext {
            tick: self.tick,
            dt: self.dt,
            frame,
        };
        for system in &mut self.systems {
            if system.enabled() {
                system.update(&ctx);
            }
        }
        self.tick = self.tick.next();
    }

    /// Snapshot every system's state, keyed by `tick`.
    pub fn backup(&mut self, tick: Tick) {
        self.snapshot_ticks.insert(tick.0);
        for system in &mut self.systems {
            system.backup(tick);
        }
    }

    /// Restore every system to the newest snapshot at or before
    /// `target` and rewind the tick to it.
    ///
    /// Returns the tick actually restored, which is `target` itself
    /// when snapshots are taken every tick and may be earlier under a
    /// coarser snapshot cadence. Fails without touching the tick when
    /// no snapshot at or before `target` is retained.
    pub fn rollback_to(&mut self, target: Tick) -> Result<Tick, SyncError> {
        let restored = match self.snapshot_ticks.range(..=target.0).next_back() {
            Some(&t) => Tick(t),
            None => {
                return Err(SyncError::RollbackTargetUnavailable {
                    requested: target,
                    oldest_retained: self.snapshot_ticks.iter().next().map(|&t| Tick(t)),
                })
            }
        };
        for system in &mut self.systems {
            system.rollback_to(restored)?;
        }
        debug!("world rolled back from tick {} to {restored}", self.tick);
        self.tick = restored;
        Ok(restored)
    }

    /// Discard snapshots older than `bound` from every system.
    pub fn clean(&mut self, bound: Tick) {
        self.snapshot_ticks = self.snapshot_ticks.split_off(&bound.0);
        for system in &mut self.systems {
            system.clean(bound);
        }
    }

    /// Aggregate state hash across all systems.
    ///
    /// Order-independent: each system contributes an FNV chain over its
    /// name and state hash, and the contributions are combined with a
    /// commutative wrapping sum. Registering a hash-neutral observer on
    /// one peer therefore cannot perturb cross-peer comparison.
    pub fn state_hash(&self) -> u64 {
        let mut agg: u64 = 0;
        for system in &self.systems {
            let mut h = FNV_OFFSET;
            h = fnv1a_bytes(h, system.name().as_bytes());
            h = fnv1a_u64(h, system.state_hash());
            agg = agg.wrapping_add(h);
        }
        agg
    }

    /// Per-system hashes, for desync reports.
    pub fn system_hashes(&self) -> Vec<(String, u64)> {
        self.systems
            .iter()
            .map(|s| (s.name().to_string(), s.state_hash()))
            .collect()
    }

    /// Oldest snapshot tick still retained.
    pub fn oldest_snapshot(&self) -> Option<Tick> {
        self.snapshot_ticks.iter().next().map(|&t| Tick(t))
    }
}
