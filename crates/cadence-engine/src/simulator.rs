//! Prediction/rollback session controller.
//!
//! [`Simulator`] ties the frame buffer, world, and hash ledger into a
//! single update pipeline. Each call to [`Simulator::update`]:
//!
//! 1. drains inbound session events into the frame buffer,
//! 2. advances confirmation and retransmission bookkeeping,
//! 3. sends local inputs up to the presend horizon,
//! 4. rolls back and clears the flag when a misprediction was found,
//! 5. executes confirmed ticks under the catch-up budget,
//! 6. predicts ahead of the confirmed frontier up to the wall clock,
//! 7. broadcasts newly-verified state hashes.
//!
//! A state-hash mismatch, local or against a peer, pauses the session
//! and captures a [`DesyncReport`] for post-mortem.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use cadence_core::{
    ActorInput, Frame, GameSystem, InputCommand, NetworkPort, ReplayScript, Roster, SessionEvent,
    SyncError, Tick,
};

use crate::config::{ConfigError, SyncConfig};
use crate::diagnostics::DesyncReport;
use crate::frame_buffer::FrameBuffer;
use crate::hasher::StateHasher;
use crate::ingress::{EventQueue, EventSender};
use crate::metrics::SyncMetrics;
use crate::world::World;

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Systems may still be registered; no ticks have run.
    Idle,
    /// The session is live (or replaying).
    Running,
    /// A desync was detected at the given tick; the session will not
    /// advance again.
    Paused {
        /// The tick whose hashes disagreed.
        tick: Tick,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Live,
    Replay,
}

/// Outcome of one [`Simulator::update`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The session advanced normally.
    Running {
        /// Ticks executed during this update.
        advanced: u64,
    },
    /// The catch-up budget expired with confirmed ticks still pending.
    CatchingUp {
        /// Confirmed ticks left to execute.
        remaining: u64,
    },
}

/// The lockstep session driver.
pub struct Simulator<N: NetworkPort> {
    config: SyncConfig,
    net: N,
    world: World,
    buffer: FrameBuffer,
    hasher: StateHasher,
    events: EventQueue,

    state: SessionState,
    mode: Mode,
    started_at_ms: Option<u64>,
    next_input_tick: Tick,
    sent_inputs: BTreeMap<u64, ActorInput>,
    next_broadcast_at: u64,

    roster: Option<Roster>,
    replay: Option<ReplayScript>,
    last_desync: Option<DesyncReport>,

    predicted_steps: u64,
    confirmed_steps: u64,
    rollbacks: u64,
    resimulated_steps: u64,
}

impl<N: NetworkPort> Simulator<N> {
    /// Build a simulator over the given transport port.
    pub fn new(config: SyncConfig, net: N) -> Result<Self, ConfigError> {
        config.validate()?;
        let buffer = FrameBuffer::new(&config);
        let world = World::new(config.dt());
        let hasher = StateHasher::new(config.hash_window);
        let events = EventQueue::new(config.max_event_queue);
        Ok(Self {
            config,
            net,
            world,
            buffer,
            hasher,
            events,
            state: SessionState::Idle,
            mode: Mode::Live,
            started_at_ms: None,
            next_input_tick: Tick(0),
            sent_inputs: BTreeMap::new(),
            next_broadcast_at: 0,
            roster: None,
            replay: None,
            last_desync: None,
            predicted_steps: 0,
            confirmed_steps: 0,
            rollbacks: 0,
            resimulated_steps: 0,
        })
    }

    /// Register a deterministic system. Only valid before the session
    /// starts.
    pub fn register_system(&mut self, system: Box<dyn GameSystem>) -> Result<(), SyncError> {
        self.world.register(system)
    }

    /// Start a live session. `now_ms` anchors the tick clock.
    pub fn start(&mut self, now_ms: u64) -> Result<(), SyncError> {
        if self.state != SessionState::Idle {
            return Err(SyncError::AlreadyRunning);
        }
        self.world.start();
        self.started_at_ms = Some(now_ms);
        self.state = SessionState::Running;
        info!(
            "session started: {} actors, local actor {}",
            self.config.actor_count, self.config.local_actor
        );
        Ok(())
    }

    // ── Live update pipeline ───────────────────────────────────

    /// Advance the live session.
    ///
    /// `now_ms` and `delta_ms` come from the caller's clock;
    /// `local_commands` are the local actor's inputs for every tick
    /// sent during this update.
    pub fn update(
        &mut self,
        now_ms: u64,
        delta_ms: u64,
        local_commands: &[InputCommand],
    ) -> Result<UpdateStatus, SyncError> {
        match self.state {
            SessionState::Idle => return Err(SyncError::NotRunning),
            SessionState::Paused { tick } => return Err(SyncError::SessionPaused { tick }),
            SessionState::Running => {}
        }
        if self.mode == Mode::Replay {
            return Err(SyncError::NotRunning);
        }

        self.drain_events(now_ms)?;
        self.buffer.update(delta_ms, self.world.tick(), &mut self.net);

        let started_at = self.started_at_ms.unwrap_or(now_ms);
        let should_be = now_ms.saturating_sub(started_at) / self.config.tick_interval_ms;
        self.send_local_inputs(now_ms, should_be, local_commands);

        let pre_rollback_tick = self.world.tick();
        if self.buffer.needs_rollback() {
            self.perform_rollback()?;
        }

        let mut advanced = 0u64;

        // Confirmed ticks run unconditionally, but re-simulation after
        // a deep rollback is spread across updates by the budget. At
        // least one pending tick executes per update so a tight budget
        // still makes forward progress.
        let budget = Duration::from_millis(self.config.catch_up_budget_ms);
        let begun = Instant::now();
        while let Some(frontier) = self.buffer.max_continue_server_tick() {
            let tick = self.world.tick();
            if tick > frontier {
                break;
            }
            if advanced > 0 && begun.elapsed() >= budget {
                let remaining = frontier.0 + 1 - tick.0;
                debug!("catch-up budget expired with {remaining} ticks pending");
                self.clean_snapshots();
                return Ok(UpdateStatus::CatchingUp { remaining });
            }
            let frame = match self.buffer.server_frame(tick) {
                Some(f) => f.clone(),
                None => return Err(SyncError::MissingConfirmedFrame { tick }),
            };
            self.buffer.push_local_frame(frame.clone());
            self.step_world(&frame);
            advanced += 1;
            if tick < pre_rollback_tick {
                self.resimulated_steps += 1;
            } else {
                self.confirmed_steps += 1;
            }
        }

        // Predict up to the wall clock, bounded by the predict window.
        let frontier_next = self
            .buffer
            .max_continue_server_tick()
            .map_or(0, |t| t.0 + 1);
        while self.world.tick().0 < should_be
            && self.world.tick().0 < frontier_next + self.config.max_predict_frames
        {
            let tick = self.world.tick();
            let frame = self.synthesize_frame(tick);
            self.buffer.push_local_frame(frame.clone());
            self.step_world(&frame);
            advanced += 1;
            self.predicted_steps += 1;
        }

        self.clean_snapshots();
        self.maybe_broadcast_hashes();
        Ok(UpdateStatus::Running { advanced })
    }

    fn drain_events(&mut self, now_ms: u64) -> Result<(), SyncError> {
        for event in self.events.drain() {
            match event {
                SessionEvent::ServerFrames(frames) => {
                    self.buffer.push_server_frames(frames, now_ms);
                }
                SessionEvent::MissFrameResponse(frames) => {
                    self.buffer
                        .push_miss_server_frames(frames, now_ms, &mut self.net);
                }
                SessionEvent::GameStart(roster) => {
                    info!("game start: {} players", roster.players.len());
                    self.roster = Some(roster);
                }
                SessionEvent::AllPlayersReady => {
                    info!("all players ready");
                }
                SessionEvent::PeerHashes {
                    peer,
                    first_tick,
                    hashes,
                } => {
                    let Some(verified) = self.buffer.next_tick_to_check().prev() else {
                        continue;
                    };
                    if let Some((tick, local, remote)) =
                        self.hasher.check_peer_hashes(first_tick, &hashes, verified)
                    {
                        error!("desync against peer {peer} at tick {tick}");
                        return Err(self.fail_desync(tick, local, remote));
                    }
                }
            }
        }
        Ok(())
    }

    fn send_local_inputs(&mut self, now_ms: u64, should_be: u64, commands: &[InputCommand]) {
        let horizon = should_be + self.config.presend_input_count;
        while self.next_input_tick.0 <= horizon {
            let tick = self.next_input_tick;
            let input =
                ActorInput::with_commands(self.config.local_actor, commands.iter().cloned());
            // Ticks the server has already confirmed are settled; only
            // inputs beyond its high-water mark are worth sending.
            if self.buffer.max_server_tick().is_none_or(|m| tick > m) {
                self.net.send_input(tick, &input);
                self.buffer.record_input_sent(tick, now_ms);
            }
            self.sent_inputs.insert(tick.0, input);
            self.next_input_tick = tick.next();
        }
        let verified = self.buffer.next_tick_to_check();
        self.sent_inputs = self.sent_inputs.split_off(&verified.0);
    }

    fn perform_rollback(&mut self) -> Result<(), SyncError> {
        let target = self.buffer.next_tick_to_check();
        let from = self.world.tick();
        let restored = self.world.rollback_to(target)?;
        // The restored snapshot must hash identically to the state the
        // hash ledger saw when the preceding tick first executed. A
        // disagreement means a system's backup/rollback is lossy.
        if let Some(prev) = restored.prev() {
            if let Err(SyncError::HashMismatch {
                tick,
                recorded,
                computed,
            }) = self.hasher.verify(prev, self.world.state_hash())
            {
                return Err(self.fail_desync(tick, recorded, computed));
            }
        }
        self.buffer.clear_rollback_flag();
        self.rollbacks += 1;
        info!("rollback from tick {from} to {restored} (target {target})");
        Ok(())
    }

    /// Predicted frame for `tick`: every remote actor repeats its most
    /// recent known input, the local actor uses what was actually sent.
    fn synthesize_frame(&self, tick: Tick) -> Frame {
        let mut frame = match tick.prev().and_then(|p| self.buffer.frame(p)) {
            Some(prev) => {
                let mut f = prev.clone();
                f.tick = tick;
                f
            }
            None => Frame::empty(tick, self.config.actor_count),
        };
        let local = match self.sent_inputs.get(&tick.0) {
            Some(input) => input.clone(),
            None => ActorInput::empty(self.config.local_actor),
        };
        frame.set_input(local);
        frame
    }

    fn step_world(&mut self, frame: &Frame) {
        let tick = self.world.tick();
        if tick.0 % self.config.snapshot_interval == 0 {
            self.world.backup(tick);
        }
        self.world.step(frame);
        self.hasher.record(tick, self.world.state_hash());
        self.buffer.set_client_tick(self.world.tick());
    }

    /// Drop snapshots no rollback can target any more.
    ///
    /// The deepest rollback target is `next_tick_to_check`, served by
    /// the newest snapshot at or before it; everything older goes.
    /// Replay sessions keep all snapshots so jumps stay cheap.
    fn clean_snapshots(&mut self) {
        if self.mode == Mode::Replay {
            return;
        }
        let verified = self.buffer.next_tick_to_check().0;
        let bound = verified - verified % self.config.snapshot_interval;
        self.world.clean(Tick(bound));
    }

    fn maybe_broadcast_hashes(&mut self) {
        if self.world.tick().0 < self.next_broadcast_at {
            return;
        }
        self.next_broadcast_at = self.world.tick().0 + self.config.hash_broadcast_interval;
        let Some(verified) = self.buffer.next_tick_to_check().prev() else {
            return;
        };
        if let Some((first, hashes)) = self.hasher.take_broadcast(verified) {
            self.net.broadcast_state_hashes(first, &hashes);
        }
    }

    fn fail_desync(&mut self, tick: Tick, recorded: u64, computed: u64) -> SyncError {
        let report = DesyncReport {
            tick,
            recorded,
            computed,
            system_hashes: self.world.system_hashes(),
            recent_hashes: self.hasher.recent(32),
        };
        error!("{report}");
        self.last_desync = Some(report);
        self.state = SessionState::Paused { tick };
        SyncError::HashMismatch {
            tick,
            recorded,
            computed,
        }
    }

    // ── Replay ─────────────────────────────────────────────────

    /// Load a recorded session for playback. Only valid before start.
    pub fn load_replay(&mut self, script: ReplayScript) -> Result<(), SyncError> {
        if self.state != SessionState::Idle {
            return Err(SyncError::AlreadyRunning);
        }
        self.mode = Mode::Replay;
        self.replay = Some(script);
        Ok(())
    }

    fn ensure_replaying(&mut self) -> Result<(), SyncError> {
        if self.replay.is_none() {
            return Err(SyncError::ReplayNotLoaded);
        }
        match self.state {
            SessionState::Idle => {
                self.world.start();
                self.state = SessionState::Running;
                Ok(())
            }
            SessionState::Running => Ok(()),
            SessionState::Paused { tick } => Err(SyncError::SessionPaused { tick }),
        }
    }

    /// Execute up to `ticks` recorded frames. Returns the world tick
    /// afterwards; stops early at the end of the recording.
    pub fn run_replay(&mut self, ticks: u64) -> Result<Tick, SyncError> {
        self.ensure_replaying()?;
        for _ in 0..ticks {
            let idx = self.world.tick().0 as usize;
            let frame = match self.replay.as_ref().and_then(|s| s.frames.get(idx)) {
                Some(f) => f.clone(),
                None => break,
            };
            self.step_world(&frame);
        }
        Ok(self.world.tick())
    }

    /// Jump playback to `target`, rewinding through a snapshot when the
    /// target is in the past and re-stepping recorded frames forward.
    pub fn jump_to(&mut self, target: Tick) -> Result<(), SyncError> {
        self.ensure_replaying()?;
        if target < self.world.tick() {
            self.world.rollback_to(target)?;
        }
        while self.world.tick() < target {
            let idx = self.world.tick().0 as usize;
            let frame = match self.replay.as_ref().and_then(|s| s.frames.get(idx)) {
                Some(f) => f.clone(),
                None => {
                    return Err(SyncError::MissingConfirmedFrame {
                        tick: self.world.tick(),
                    })
                }
            };
            self.step_world(&frame);
        }
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────

    /// A producer handle for transport threads.
    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    /// Session lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The world, for state inspection.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The transport port.
    pub fn port(&self) -> &N {
        &self.net
    }

    /// Roster received via [`SessionEvent::GameStart`], if any.
    pub fn roster(&self) -> Option<&Roster> {
        self.roster.as_ref()
    }

    /// The report captured by the most recent desync, if any.
    pub fn last_desync(&self) -> Option<&DesyncReport> {
        self.last_desync.as_ref()
    }

    /// Current health counters.
    pub fn metrics(&self) -> SyncMetrics {
        SyncMetrics {
            ping_ms: self.buffer.ping_ms(),
            world_tick: self.world.tick(),
            next_tick_to_check: self.buffer.next_tick_to_check(),
            confirmed_frontier: self.buffer.max_continue_server_tick(),
            predicted_steps: self.predicted_steps,
            confirmed_steps: self.confirmed_steps,
            rollbacks: self.rollbacks,
            resimulated_steps: self.resimulated_steps,
            dropped_frames: self.buffer.dropped_frames(),
            resend_requests: self.buffer.resend_requests(),
            dropped_events: self.events.dropped_events(),
        }
    }
}
