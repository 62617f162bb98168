//! Session configuration and validation.

use std::error::Error;
use std::fmt;

use cadence_core::{ActorId, Fixed};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SyncConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `tick_interval_ms` is zero.
    ZeroTickInterval,
    /// The frame buffer is too small to leave a positive confirmation
    /// window (`buffer_size <= 2 * snapshot_interval`).
    BufferTooSmall {
        /// The configured buffer size.
        configured: u64,
        /// The minimum size that leaves a one-tick window.
        minimum: u64,
    },
    /// `snapshot_interval` is zero.
    ZeroSnapshotInterval,
    /// `max_predict_frames` is below the minimum of 4. The resend
    /// heuristic subtracts 3 from it.
    PredictWindowTooSmall {
        /// The configured value.
        configured: u64,
    },
    /// `actor_count` is zero.
    ZeroActorCount,
    /// `local_actor` is not a valid roster slot.
    LocalActorOutOfRange {
        /// The configured local actor.
        local_actor: ActorId,
        /// The configured actor count.
        actor_count: u8,
    },
    /// `max_event_queue` is zero.
    ZeroEventQueue,
    /// `hash_window` is zero.
    ZeroHashWindow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroTickInterval => write!(f, "tick_interval_ms must be at least 1"),
            Self::BufferTooSmall {
                configured,
                minimum,
            } => write!(
                f,
                "buffer_size {configured} is below minimum of {minimum} \
                 for the configured snapshot_interval"
            ),
            Self::ZeroSnapshotInterval => write!(f, "snapshot_interval must be at least 1"),
            Self::PredictWindowTooSmall { configured } => {
                write!(f, "max_predict_frames {configured} is below minimum of 4")
            }
            Self::ZeroActorCount => write!(f, "actor_count must be at least 1"),
            Self::LocalActorOutOfRange {
                local_actor,
                actor_count,
            } => write!(
                f,
                "local_actor {local_actor} out of range for {actor_count} actors"
            ),
            Self::ZeroEventQueue => write!(f, "max_event_queue must be at least 1"),
            Self::ZeroHashWindow => write!(f, "hash_window must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

// ── SyncConfig ─────────────────────────────────────────────────────

/// Complete configuration for a lockstep session.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Nominal tick duration in milliseconds. Default: 33 (~30 Hz).
    pub tick_interval_ms: u64,
    /// Ring buffer capacity in ticks. Default: 2000.
    pub buffer_size: u64,
    /// Snapshot every N ticks. 1 = every tick. Default: 1.
    pub snapshot_interval: u64,
    /// Maximum ticks the client may run ahead of the confirmed
    /// frontier. Default: 30.
    pub max_predict_frames: u64,
    /// Wall-clock budget per update for catch-up re-simulation, in
    /// milliseconds. At least one pending confirmed tick executes per
    /// update regardless, so zero means one tick per update. Default: 20.
    pub catch_up_budget_ms: u64,
    /// Input frames sent ahead of the current should-be tick.
    /// Default: 1.
    pub presend_input_count: u64,
    /// Trailing ticks of state hashes retained for verification and
    /// peer exchange. Default: 600.
    pub hash_window: u64,
    /// Broadcast verified hashes every N ticks. Default: 30.
    pub hash_broadcast_interval: u64,
    /// Session-event queue capacity. Default: 256.
    pub max_event_queue: usize,
    /// Number of actors in the session.
    pub actor_count: u8,
    /// Which actor this peer controls.
    pub local_actor: ActorId,
}

impl SyncConfig {
    /// A configuration with defaults for the given roster slot.
    pub fn new(actor_count: u8, local_actor: ActorId) -> Self {
        Self {
            tick_interval_ms: 33,
            buffer_size: 2000,
            snapshot_interval: 1,
            max_predict_frames: 30,
            catch_up_budget_ms: 20,
            presend_input_count: 1,
            hash_window: 600,
            hash_broadcast_interval: 30,
            max_event_queue: 256,
            actor_count,
            local_actor,
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.snapshot_interval == 0 {
            return Err(ConfigError::ZeroSnapshotInterval);
        }
        // The confirmation window is buffer_size - 2 * snapshot_interval;
        // it must cover at least one tick.
        let minimum = 2 * self.snapshot_interval + 1;
        if self.buffer_size < minimum {
            return Err(ConfigError::BufferTooSmall {
                configured: self.buffer_size,
                minimum,
            });
        }
        if self.max_predict_frames < 4 {
            return Err(ConfigError::PredictWindowTooSmall {
                configured: self.max_predict_frames,
            });
        }
        if self.actor_count == 0 {
            return Err(ConfigError::ZeroActorCount);
        }
        if self.local_actor.0 >= self.actor_count {
            return Err(ConfigError::LocalActorOutOfRange {
                local_actor: self.local_actor,
                actor_count: self.actor_count,
            });
        }
        if self.max_event_queue == 0 {
            return Err(ConfigError::ZeroEventQueue);
        }
        if self.hash_window == 0 {
            return Err(ConfigError::ZeroHashWindow);
        }
        Ok(())
    }

    /// Server frames at or beyond `next_tick_to_check + window` are
    /// rejected to protect unconfirmed ring slots from overwrite.
    ///
    /// Saturates to zero for configs `validate()` would reject, so an
    /// unvalidated config cannot panic downstream; a zero window admits
    /// no frames at all.
    pub fn confirmation_window(&self) -> u64 {
        self.buffer_size.saturating_sub(2 * self.snapshot_interval)
    }

    /// Fixed-point step delta time derived from the tick interval.
    pub fn dt(&self) -> Fixed {
        Fixed::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SyncConfig {
        SyncConfig::new(3, ActorId(0))
    }

    #[test]
    fn validate_default_succeeds() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_zero_tick_interval_fails() {
        let mut cfg = valid_config();
        cfg.tick_interval_ms = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTickInterval));
    }

    #[test]
    fn validate_buffer_too_small_fails() {
        let mut cfg = valid_config();
        cfg.buffer_size = 4;
        cfg.snapshot_interval = 2;
        match cfg.validate() {
            Err(ConfigError::BufferTooSmall { minimum: 5, .. }) => {}
            other => panic!("expected BufferTooSmall, got {other:?}"),
        }
    }

    #[test]
    fn validate_predict_window_minimum() {
        let mut cfg = valid_config();
        cfg.max_predict_frames = 3;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PredictWindowTooSmall { configured: 3 })
        ));
        cfg.max_predict_frames = 4;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_local_actor_out_of_range_fails() {
        let cfg = SyncConfig::new(2, ActorId(2));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::LocalActorOutOfRange { .. })
        ));
    }

    #[test]
    fn confirmation_window_accounts_for_snapshot_interval() {
        let mut cfg = valid_config();
        assert_eq!(cfg.confirmation_window(), 2000 - 2);
        cfg.snapshot_interval = 5;
        assert_eq!(cfg.confirmation_window(), 2000 - 10);
    }

    #[test]
    fn confirmation_window_saturates_for_undersized_buffer() {
        let mut cfg = valid_config();
        cfg.buffer_size = 1;
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.confirmation_window(), 0);
    }

    #[test]
    fn dt_matches_tick_interval() {
        let cfg = valid_config();
        assert_eq!(cfg.dt(), Fixed::from_millis(33));
    }
}
