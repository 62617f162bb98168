//! Session health counters.

use cadence_core::Tick;

/// Snapshot of simulator health, taken per update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    /// Smoothed round-trip estimate in milliseconds.
    pub ping_ms: u64,
    /// The world's current tick.
    pub world_tick: Tick,
    /// First tick not yet verified against a server frame.
    pub next_tick_to_check: Tick,
    /// Highest tick executable from confirmed server frames.
    pub confirmed_frontier: Option<Tick>,
    /// Ticks executed speculatively since the session started.
    pub predicted_steps: u64,
    /// Ticks executed from confirmed server frames.
    pub confirmed_steps: u64,
    /// Rollbacks performed.
    pub rollbacks: u64,
    /// Ticks re-executed during rollbacks.
    pub resimulated_steps: u64,
    /// Server frames rejected as stale or out of window.
    pub dropped_frames: u64,
    /// Miss-frame requests issued.
    pub resend_requests: u64,
    /// Session events dropped at the ingress queue.
    pub dropped_events: u64,
}
