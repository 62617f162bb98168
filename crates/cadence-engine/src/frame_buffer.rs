//! Ring-buffered frame store.
//!
//! [`FrameBuffer`] holds two parallel ring buffers keyed by
//! `tick % buffer_size`: server-confirmed frames and locally-predicted
//! frames. A slot is valid only when the stored frame's own tick
//! matches the requested tick, which guards against reading stale
//! wrap-around data.
//!
//! The buffer owns three tick cursors:
//! - `next_tick_to_check`: first tick not yet verified against the
//!   server. Advances only when the server and local frames for it
//!   exist and carry identical inputs.
//! - `max_continue_server_tick`: end of the unbroken run of confirmed
//!   frames starting at `next_tick_to_check` (the frontier).
//! - `next_client_tick`: one past the newest locally-executed tick.
//!
//! Server frames at or beyond `next_tick_to_check + confirmation_window`
//! are dropped: accepting them would overwrite ring slots that still
//! hold unverified history.

use indexmap::IndexMap;
use log::{debug, warn};

use cadence_core::{Frame, NetworkPort, Tick};

use crate::config::SyncConfig;

/// Rolling ping recomputation interval.
const PING_INTERVAL_MS: u64 = 500;
/// Minimum frontier-to-server gap before a retransmission request.
const MIN_MISS_FRAME_REQ_TICK_DIFF: u64 = 10;
/// Cooldown between retransmission requests.
const RESEND_COOLDOWN_MS: u64 = 500;
/// Cap on outstanding send timestamps retained for ping sampling.
const MAX_SEND_TIMESTAMPS: usize = 1024;

/// Dual ring buffer of server-confirmed and locally-predicted frames.
pub struct FrameBuffer {
    server: Vec<Option<Frame>>,
    local: Vec<Option<Frame>>,
    size: u64,
    window: u64,
    max_predict: u64,

    next_tick_to_check: Tick,
    /// Highest tick seen from the server, including rejected frames.
    cur_server_tick: Option<Tick>,
    /// Highest tick accepted into the server buffer.
    max_server_tick: Option<Tick>,
    max_continue_server_tick: Option<Tick>,
    needs_rollback: bool,
    next_client_tick: Tick,

    send_timestamps: IndexMap<u64, u64>,
    ping_samples: Vec<u64>,
    ping_ms: u64,
    ping_timer_ms: u64,
    resend_cooldown_ms: u64,

    stale_dropped: u64,
    out_of_window_dropped: u64,
    resend_requests: u64,
}

impl FrameBuffer {
    /// Build a buffer sized per the session configuration.
    pub fn new(config: &SyncConfig) -> Self {
        let size = config.buffer_size;
        Self {
            server: vec![None; size as usize],
            local: vec![None; size as usize],
            size,
            window: config.confirmation_window(),
            max_predict: config.max_predict_frames,
            next_tick_to_check: Tick(0),
            cur_server_tick: None,
            max_server_tick: None,
            max_continue_server_tick: None,
            needs_rollback: false,
            next_client_tick: Tick(0),
            send_timestamps: IndexMap::new(),
            ping_samples: Vec::new(),
            ping_ms: 0,
            ping_timer_ms: 0,
            resend_cooldown_ms: 0,
            stale_dropped: 0,
            out_of_window_dropped: 0,
            resend_requests: 0,
        }
    }

    fn slot(&self, tick: Tick) -> usize {
        (tick.0 % self.size) as usize
    }

    fn valid<'a>(&self, stored: &'a Option<Frame>, tick: Tick) -> Option<&'a Frame> {
        stored.as_ref().filter(|f| f.tick == tick)
    }

    // ── Stores ─────────────────────────────────────────────────

    /// Store a locally-predicted (or re-executed) frame.
    pub fn push_local_frame(&mut self, frame: Frame) {
        let slot = self.slot(frame.tick);
        self.local[slot] = Some(frame);
    }

    /// Accept a batch of confirmed frames from the server.
    ///
    /// Each frame is judged on its own: a stale or out-of-window entry
    /// is skipped without aborting the rest of the batch. Frames whose
    /// tick has a pending send timestamp contribute a round-trip ping
    /// sample.
    pub fn push_server_frames(&mut self, frames: Vec<Frame>, now_ms: u64) {
        for frame in frames {
            self.accept_server_frame(frame, now_ms);
        }
    }

    /// Accept retransmitted frames and acknowledge the new frontier.
    pub fn push_miss_server_frames(
        &mut self,
        frames: Vec<Frame>,
        now_ms: u64,
        net: &mut dyn NetworkPort,
    ) {
        for frame in frames {
            self.accept_server_frame(frame, now_ms);
        }
        self.recompute_frontier();
        let next_needed = self.max_continue_server_tick.map_or(0, |t| t.0 + 1);
        net.ack_missing_frames(Tick(next_needed));
    }

    fn accept_server_frame(&mut self, frame: Frame, now_ms: u64) {
        let tick = frame.tick;
        if let Some(sent) = self.send_timestamps.shift_remove(&tick.0) {
            self.ping_samples.push(now_ms.saturating_sub(sent));
        }
        self.cur_server_tick = Some(self.cur_server_tick.map_or(tick, |c| c.max(tick)));

        if tick < self.next_tick_to_check {
            // Already verified; a late duplicate.
            self.stale_dropped += 1;
            return;
        }
        if tick.0 >= self.next_tick_to_check.0 + self.window {
            warn!(
                "server frame {tick} beyond confirmation window (next={}, window={})",
                self.next_tick_to_check, self.window
            );
            self.out_of_window_dropped += 1;
            return;
        }

        let slot = self.slot(tick);
        self.server[slot] = Some(frame);
        self.max_server_tick = Some(self.max_server_tick.map_or(tick, |m| m.max(tick)));
    }

    // ── Per-update maintenance ─────────────────────────────────

    /// Advance confirmation, recompute the frontier, refresh ping, and
    /// request retransmissions when the frontier stalls.
    ///
    /// `world_tick` is the world's current tick; only executed ticks
    /// can be confirmed.
    pub fn update(&mut self, delta_ms: u64, world_tick: Tick, net: &mut dyn NetworkPort) {
        self.update_ping(delta_ms);

        while self.next_tick_to_check < world_tick {
            let tick = self.next_tick_to_check;
            let server = match self.valid(&self.server[self.slot(tick)], tick) {
                Some(f) => f,
                None => break,
            };
            let local = match self.valid(&self.local[self.slot(tick)], tick) {
                Some(f) => f,
                None => break,
            };
            if server.same_inputs(local) {
                self.next_tick_to_check = tick.next();
            } else {
                debug!("input mismatch at tick {tick}, rollback required");
                self.needs_rollback = true;
                break;
            }
        }

        self.recompute_frontier();

        self.resend_cooldown_ms = self.resend_cooldown_ms.saturating_sub(delta_ms);
        let frontier_next = self.max_continue_server_tick.map_or(0, |t| t.0 + 1);
        let gap_behind = self
            .cur_server_tick
            .is_some_and(|cur| (cur.0 + 1).saturating_sub(frontier_next) >= MIN_MISS_FRAME_REQ_TICK_DIFF);
        let predicted_far = self.next_client_tick.0 > frontier_next + (self.max_predict - 3);
        if (gap_behind || predicted_far) && self.resend_cooldown_ms == 0 {
            debug!("requesting retransmission from tick {frontier_next}");
            net.request_missing_frames(Tick(frontier_next));
            self.resend_requests += 1;
            self.resend_cooldown_ms = RESEND_COOLDOWN_MS;
        }
    }

    fn update_ping(&mut self, delta_ms: u64) {
        self.ping_timer_ms += delta_ms;
        if self.ping_timer_ms < PING_INTERVAL_MS {
            return;
        }
        self.ping_timer_ms = 0;
        if !self.ping_samples.is_empty() {
            let sum: u64 = self.ping_samples.iter().sum();
            self.ping_ms = sum / self.ping_samples.len() as u64;
            self.ping_samples.clear();
        }
    }

    fn recompute_frontier(&mut self) {
        let mut t = self.next_tick_to_check.0;
        while self.valid(&self.server[(t % self.size) as usize], Tick(t)).is_some() {
            t += 1;
        }
        self.max_continue_server_tick = t.checked_sub(1).map(Tick);
    }

    // ── Accessors ──────────────────────────────────────────────

    /// The frame for `tick`, preferring the server-confirmed copy.
    pub fn frame(&self, tick: Tick) -> Option<&Frame> {
        self.server_frame(tick).or_else(|| self.local_frame(tick))
    }

    /// The server-confirmed frame for `tick`, if its slot is valid.
    pub fn server_frame(&self, tick: Tick) -> Option<&Frame> {
        self.valid(&self.server[self.slot(tick)], tick)
    }

    /// The locally-predicted frame for `tick`, if its slot is valid.
    pub fn local_frame(&self, tick: Tick) -> Option<&Frame> {
        self.valid(&self.local[self.slot(tick)], tick)
    }

    /// Record that the local input for `tick` was sent at `now_ms`, for
    /// ping sampling against the server's echo.
    pub fn record_input_sent(&mut self, tick: Tick, now_ms: u64) {
        if self.send_timestamps.len() >= MAX_SEND_TIMESTAMPS {
            self.send_timestamps.shift_remove_index(0);
        }
        self.send_timestamps.insert(tick.0, now_ms);
    }

    /// Inform the buffer of the newest executed world tick.
    pub fn set_client_tick(&mut self, tick: Tick) {
        self.next_client_tick = tick;
    }

    /// First tick not yet verified against the server.
    pub fn next_tick_to_check(&self) -> Tick {
        self.next_tick_to_check
    }

    /// End of the unbroken confirmed run (the frontier).
    pub fn max_continue_server_tick(&self) -> Option<Tick> {
        self.max_continue_server_tick
    }

    /// Highest tick accepted into the server buffer.
    pub fn max_server_tick(&self) -> Option<Tick> {
        self.max_server_tick
    }

    /// Highest tick seen from the server, accepted or not.
    pub fn cur_server_tick(&self) -> Option<Tick> {
        self.cur_server_tick
    }

    /// Whether a predicted-vs-confirmed mismatch is pending.
    pub fn needs_rollback(&self) -> bool {
        self.needs_rollback
    }

    /// Clear the rollback flag once the rollback has been performed.
    pub fn clear_rollback_flag(&mut self) {
        self.needs_rollback = false;
    }

    /// Rolling average round-trip time in milliseconds.
    pub fn ping_ms(&self) -> u64 {
        self.ping_ms
    }

    /// Retransmission requests issued so far.
    pub fn resend_requests(&self) -> u64 {
        self.resend_requests
    }

    /// Server frames dropped as stale or out-of-window.
    pub fn dropped_frames(&self) -> u64 {
        self.stale_dropped + self.out_of_window_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::ActorId;
    use cadence_test_utils::{empty_frame, frame_with, move_cmd, NullPort, RecordingPort};

    fn small_config() -> SyncConfig {
        let mut cfg = SyncConfig::new(2, ActorId(0));
        cfg.buffer_size = 8; // window = 6
        cfg
    }

    fn buffer() -> FrameBuffer {
        FrameBuffer::new(&small_config())
    }

    #[test]
    fn confirmation_advances_on_identical_frames() {
        let mut buf = buffer();
        for t in 0..4u64 {
            buf.push_local_frame(empty_frame(t, 2));
        }
        buf.push_server_frames((0..4).map(|t| empty_frame(t, 2)).collect(), 0);
        buf.update(0, Tick(4), &mut NullPort);
        assert_eq!(buf.next_tick_to_check(), Tick(4));
        assert!(!buf.needs_rollback());
    }

    #[test]
    fn confirmation_stops_at_world_tick() {
        let mut buf = buffer();
        for t in 0..4u64 {
            buf.push_local_frame(empty_frame(t, 2));
        }
        buf.push_server_frames((0..4).map(|t| empty_frame(t, 2)).collect(), 0);
        // Only 2 ticks executed: confirmation must not run ahead.
        buf.update(0, Tick(2), &mut NullPort);
        assert_eq!(buf.next_tick_to_check(), Tick(2));
    }

    #[test]
    fn mismatch_flags_rollback_at_divergent_tick() {
        let mut buf = buffer();
        for t in 0..6u64 {
            buf.push_local_frame(empty_frame(t, 2));
        }
        let mut frames: Vec<_> = (0..6).map(|t| empty_frame(t, 2)).collect();
        frames[3] = frame_with(3, 2, 1, [move_cmd(1, 0)]);
        buf.push_server_frames(frames, 0);
        buf.update(0, Tick(6), &mut NullPort);
        assert!(buf.needs_rollback());
        assert_eq!(buf.next_tick_to_check(), Tick(3));
    }

    #[test]
    fn stale_frame_skips_without_aborting_batch() {
        let mut buf = buffer();
        for t in 0..2u64 {
            buf.push_local_frame(empty_frame(t, 2));
        }
        buf.push_server_frames(vec![empty_frame(0, 2), empty_frame(1, 2)], 0);
        buf.update(0, Tick(2), &mut NullPort);
        assert_eq!(buf.next_tick_to_check(), Tick(2));

        // A batch with a stale tick 0 and a fresh tick 2: the fresh
        // frame must still be accepted.
        buf.push_server_frames(vec![empty_frame(0, 2), empty_frame(2, 2)], 0);
        assert!(buf.server_frame(Tick(2)).is_some());
        assert_eq!(buf.dropped_frames(), 1);
    }

    #[test]
    fn window_boundary_rejects_at_edge() {
        let mut buf = buffer(); // window = 6, next = 0
        buf.push_server_frames(vec![empty_frame(5, 2)], 0);
        assert!(buf.server_frame(Tick(5)).is_some(), "tick window-1 accepted");
        buf.push_server_frames(vec![empty_frame(6, 2)], 0);
        assert!(buf.server_frame(Tick(6)).is_none(), "tick window rejected");
        assert_eq!(buf.dropped_frames(), 1);
    }

    #[test]
    fn frontier_stops_at_first_gap() {
        let mut cfg = SyncConfig::new(2, ActorId(0));
        cfg.buffer_size = 32;
        let mut buf = FrameBuffer::new(&cfg);
        let frames: Vec<_> = (0..10).filter(|&t| t != 4).map(|t| empty_frame(t, 2)).collect();
        buf.push_server_frames(frames, 0);
        buf.update(0, Tick(0), &mut NullPort);
        assert_eq!(buf.max_continue_server_tick(), Some(Tick(3)));

        // Retransmission fills the gap and acks the new frontier.
        let mut port = RecordingPort::new();
        buf.push_miss_server_frames(vec![empty_frame(4, 2)], 0, &mut port);
        assert_eq!(buf.max_continue_server_tick(), Some(Tick(9)));
        assert_eq!(
            port.calls,
            vec![cadence_test_utils::PortCall::AckMissingFrames { next_needed: Tick(10) }]
        );
    }

    #[test]
    fn empty_buffer_has_no_frontier() {
        let mut buf = buffer();
        buf.update(0, Tick(0), &mut NullPort);
        assert_eq!(buf.max_continue_server_tick(), None);
    }

    #[test]
    fn resend_requested_when_far_behind_server() {
        let mut cfg = SyncConfig::new(2, ActorId(0));
        cfg.buffer_size = 64;
        let mut buf = FrameBuffer::new(&cfg);
        // Server has reached tick 14 but ticks 0..=13 never arrived.
        buf.push_server_frames(vec![empty_frame(14, 2)], 0);
        let mut port = RecordingPort::new();
        buf.update(0, Tick(0), &mut port);
        assert_eq!(buf.resend_requests(), 1);
        assert_eq!(port.resend_requests(), vec![Tick(0)]);

        // Cooldown suppresses an immediate repeat.
        buf.update(100, Tick(0), &mut port);
        assert_eq!(buf.resend_requests(), 1);
        // After the cooldown elapses the request repeats.
        buf.update(500, Tick(0), &mut port);
        assert_eq!(buf.resend_requests(), 2);
    }

    #[test]
    fn small_gap_does_not_trigger_resend() {
        let mut cfg = SyncConfig::new(2, ActorId(0));
        cfg.buffer_size = 64;
        let mut buf = FrameBuffer::new(&cfg);
        let frames: Vec<_> = (0..10).filter(|&t| t != 4).map(|t| empty_frame(t, 2)).collect();
        buf.push_server_frames(frames, 0);
        let mut port = RecordingPort::new();
        buf.update(0, Tick(0), &mut port);
        // Gap of 6 (< 10) and no prediction pressure: no request yet.
        assert!(port.resend_requests().is_empty());
    }

    #[test]
    fn ping_averages_round_trips() {
        let mut buf = buffer();
        buf.record_input_sent(Tick(0), 1_000);
        buf.record_input_sent(Tick(1), 1_030);
        buf.push_server_frames(vec![empty_frame(0, 2)], 1_100); // 100 ms
        buf.push_server_frames(vec![empty_frame(1, 2)], 1_230); // 200 ms
        buf.update(PING_INTERVAL_MS, Tick(0), &mut NullPort);
        assert_eq!(buf.ping_ms(), 150);
    }

    #[test]
    fn undersized_config_builds_a_closed_buffer() {
        // An unvalidated config with no room for a window must not
        // panic; the zero window simply admits nothing.
        let mut cfg = SyncConfig::new(2, ActorId(0));
        cfg.buffer_size = 1;
        let mut buf = FrameBuffer::new(&cfg);
        buf.push_server_frames(vec![empty_frame(0, 2)], 0);
        assert!(buf.server_frame(Tick(0)).is_none());
        assert_eq!(buf.dropped_frames(), 1);
    }

    #[test]
    fn wrapped_slot_is_invalid_for_other_tick() {
        let mut buf = buffer(); // size 8
        buf.push_local_frame(empty_frame(1, 2));
        assert!(buf.local_frame(Tick(1)).is_some());
        // Tick 9 maps to the same slot but was never stored.
        assert!(buf.local_frame(Tick(9)).is_none());
    }

    #[test]
    fn frame_prefers_server_copy() {
        let mut buf = buffer();
        buf.push_local_frame(empty_frame(0, 2));
        buf.push_server_frames(vec![frame_with(0, 2, 1, [move_cmd(1, 0)])], 0);
        let frame = buf.frame(Tick(0)).unwrap();
        assert!(!frame.input_for(ActorId(1)).unwrap().commands.is_empty());
    }
}
