//! The system seams the world dispatches through.
//!
//! Game logic plugs into the engine as [`GameSystem`] implementations.
//! Every system also implements [`TimeMachine`]: the snapshot capability
//! the rollback machinery drives. How a system stores its snapshots is
//! its own business; [`SnapshotStore`](crate::SnapshotStore) covers the
//! common case.

use crate::error::SyncError;
use crate::fp::Fixed;
use crate::id::Tick;
use crate::input::Frame;

/// Per-step execution context handed to every system.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    /// The tick being executed.
    pub tick: Tick,
    /// Fixed delta time for this step, in seconds.
    pub dt: Fixed,
    /// The input frame for this tick.
    pub frame: &'a Frame,
}

/// Snapshot capability: backup, restore, and prune state by tick.
pub trait TimeMachine {
    /// Record a snapshot of the current state, keyed by `tick`.
    ///
    /// The snapshot captures the state *entering* `tick`, before the
    /// tick's update runs.
    fn backup(&mut self, tick: Tick);

    /// Restore state to the snapshot recorded at `tick`.
    ///
    /// Implementations restore the nearest snapshot at or before
    /// `tick` and report the restored tick's absence as
    /// [`SyncError::RollbackTargetUnavailable`]. Never restore past
    /// the target or guess.
    fn rollback_to(&mut self, tick: Tick) -> Result<(), SyncError>;

    /// Discard snapshots older than `max_verified`; they can no longer
    /// be rollback targets. `max_verified` itself stays restorable.
    fn clean(&mut self, max_verified: Tick);
}

/// One unit of game logic executed by the deterministic stepper.
///
/// Registration order is fixed before the world starts and is part of
/// the determinism contract: all peers register the same systems in
/// the same order.
pub trait GameSystem: TimeMachine {
    /// Stable name, used in logs and desync reports.
    fn name(&self) -> &str;

    /// Disabled systems are skipped by the stepper.
    fn enabled(&self) -> bool {
        true
    }

    /// Execute one tick of this system's logic.
    ///
    /// Must be deterministic: same state + same frame + same dt gives
    /// the same resulting state on every peer.
    fn update(&mut self, ctx: &StepContext<'_>);

    /// Hash of this system's current simulation state.
    ///
    /// Must cover everything that affects future updates. Observers
    /// with no simulation state return a constant.
    fn state_hash(&self) -> u64;
}
