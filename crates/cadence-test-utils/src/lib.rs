//! Test fixtures and mock types for Cadence development.
//!
//! Provides deterministic [`GameSystem`] fixtures, a [`NetworkPort`]
//! recorder, and frame builders used across the workspace's tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::BTreeMap;

use cadence_core::hash::{fnv1a_bytes, fnv1a_i64, fnv1a_u64, FNV_OFFSET};
use cadence_core::{
    ActorId, ActorInput, Fixed, Frame, GameSystem, InputCommand, NetworkPort, SnapshotStore,
    StepContext, SyncError, Tick, TimeMachine,
};

/// Opcode understood by [`MovementSystem`]: payload is `[dx, dy]` as i8.
pub const OP_MOVE: u8 = 1;

/// Build a move command for [`MovementSystem`].
pub fn move_cmd(dx: i8, dy: i8) -> InputCommand {
    InputCommand::new(OP_MOVE, &[dx as u8, dy as u8])
}

/// A frame where every actor in `0..actor_count` issued no commands.
pub fn empty_frame(tick: u64, actor_count: u8) -> Frame {
    Frame::empty(Tick(tick), actor_count)
}

/// An otherwise-empty frame where one actor issued the given commands.
pub fn frame_with(
    tick: u64,
    actor_count: u8,
    actor: u8,
    commands: impl IntoIterator<Item = InputCommand>,
) -> Frame {
    let mut frame = Frame::empty(Tick(tick), actor_count);
    frame.set_input(ActorInput::with_commands(ActorId(actor), commands));
    frame
}

/// Deterministic fixture: per-actor positions driven by [`OP_MOVE`]
/// commands, integrated with the fixed-point step delta.
pub struct MovementSystem {
    positions: BTreeMap<u8, (Fixed, Fixed)>,
    snapshots: SnapshotStore<BTreeMap<u8, (Fixed, Fixed)>>,
}

impl MovementSystem {
    pub fn new(actor_count: u8) -> Self {
        Self {
            positions: (0..actor_count).map(|a| (a, (Fixed::ZERO, Fixed::ZERO))).collect(),
            snapshots: SnapshotStore::new(),
        }
    }

    /// Current position of an actor, for test assertions.
    pub fn position(&self, actor: ActorId) -> Option<(Fixed, Fixed)> {
        self.positions.get(&actor.0).copied()
    }
}

impl TimeMachine for MovementSystem {
    fn backup(&mut self, tick: Tick) {
        self.snapshots.record(tick, self.positions.clone());
    }

    fn rollback_to(&mut self, tick: Tick) -> Result<(), SyncError> {
        match self.snapshots.restore_at_or_before(tick) {
            Some((_, state)) => {
                self.positions = state.clone();
                Ok(())
            }
            None => Err(SyncError::RollbackTargetUnavailable {
                requested: tick,
                oldest_retained: self.snapshots.oldest(),
            }),
        }
    }

    fn clean(&mut self, max_verified: Tick) {
        self.snapshots.prune_before(max_verified);
    }
}

impl GameSystem for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn update(&mut self, ctx: &StepContext<'_>) {
        for input in &ctx.frame.inputs {
            for cmd in &input.commands {
                if cmd.opcode != OP_MOVE || cmd.payload.len() < 2 {
                    continue;
                }
                let dx = Fixed::from_int(cmd.payload[0] as i8 as i64);
                let dy = Fixed::from_int(cmd.payload[1] as i8 as i64);
                let pos = self.positions.entry(input.actor.0).or_default();
                pos.0 += dx * ctx.dt;
                pos.1 += dy * ctx.dt;
            }
        }
    }

    fn state_hash(&self) -> u64 {
        let mut h = FNV_OFFSET;
        for (&actor, &(x, y)) in &self.positions {
            h = fnv1a_bytes(h, &[actor]);
            h = fnv1a_i64(h, x.raw());
            h = fnv1a_i64(h, y.raw());
        }
        h
    }
}

/// Minimal fixture: counts executed ticks. Its hash is the counter, so
/// any missed or doubled step shows up as a hash divergence.
pub struct CounterSystem {
    count: u64,
    snapshots: SnapshotStore<u64>,
}

impl CounterSystem {
    pub fn new() -> Self {
        Self {
            count: 0,
            snapshots: SnapshotStore::new(),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Default for CounterSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeMachine for CounterSystem {
    fn backup(&mut self, tick: Tick) {
        self.snapshots.record(tick, self.count);
    }

    fn rollback_to(&mut self, tick: Tick) -> Result<(), SyncError> {
        match self.snapshots.restore_at_or_before(tick) {
            Some((_, &count)) => {
                self.count = count;
                Ok(())
            }
            None => Err(SyncError::RollbackTargetUnavailable {
                requested: tick,
                oldest_retained: self.snapshots.oldest(),
            }),
        }
    }

    fn clean(&mut self, max_verified: Tick) {
        self.snapshots.prune_before(max_verified);
    }
}

impl GameSystem for CounterSystem {
    fn name(&self) -> &str {
        "counter"
    }

    fn update(&mut self, _ctx: &StepContext<'_>) {
        self.count += 1;
    }

    fn state_hash(&self) -> u64 {
        fnv1a_u64(FNV_OFFSET, self.count)
    }
}

/// One outbound call captured by [`RecordingPort`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortCall {
    SendInput { tick: Tick, input: ActorInput },
    RequestMissingFrames { from: Tick },
    AckMissingFrames { next_needed: Tick },
    BroadcastHashes { first_tick: Tick, hashes: Vec<u64> },
}

/// [`NetworkPort`] that records every call for test assertions.
#[derive(Debug, Default)]
pub struct RecordingPort {
    pub calls: Vec<PortCall>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_input_ticks(&self) -> Vec<Tick> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PortCall::SendInput { tick, .. } => Some(*tick),
                _ => None,
            })
            .collect()
    }

    pub fn resend_requests(&self) -> Vec<Tick> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PortCall::RequestMissingFrames { from } => Some(*from),
                _ => None,
            })
            .collect()
    }

    pub fn broadcasts(&self) -> Vec<(Tick, Vec<u64>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PortCall::BroadcastHashes { first_tick, hashes } => {
                    Some((*first_tick, hashes.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

impl NetworkPort for RecordingPort {
    fn send_input(&mut self, tick: Tick, input: &ActorInput) {
        self.calls.push(PortCall::SendInput {
            tick,
            input: input.clone(),
        });
    }

    fn request_missing_frames(&mut self, from: Tick) {
        self.calls.push(PortCall::RequestMissingFrames { from });
    }

    fn ack_missing_frames(&mut self, next_needed: Tick) {
        self.calls.push(PortCall::AckMissingFrames { next_needed });
    }

    fn broadcast_state_hashes(&mut self, first_tick: Tick, hashes: &[u64]) {
        self.calls.push(PortCall::BroadcastHashes {
            first_tick,
            hashes: hashes.to_vec(),
        });
    }
}

/// [`NetworkPort`] that discards everything.
#[derive(Debug, Default)]
pub struct NullPort;

impl NetworkPort for NullPort {
    fn send_input(&mut self, _tick: Tick, _input: &ActorInput) {}
    fn request_missing_frames(&mut self, _from: Tick) {}
    fn ack_missing_frames(&mut self, _next_needed: Tick) {}
    fn broadcast_state_hashes(&mut self, _first_tick: Tick, _hashes: &[u64]) {}
}
