//! Error types for the Cadence synchronization engine.

use std::error::Error;
use std::fmt;

use crate::id::Tick;

/// Errors from the synchronization engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// A rollback was requested to a tick with no retained snapshot at
    /// or before it. Rollback is never attempted silently in this case.
    RollbackTargetUnavailable {
        /// The requested rollback target.
        requested: Tick,
        /// The oldest snapshot still retained, if any.
        oldest_retained: Option<Tick>,
    },
    /// The state hash after a rollback restore (or a peer comparison)
    /// does not match the hash recorded when the tick first executed.
    HashMismatch {
        /// The tick at which the mismatch was detected.
        tick: Tick,
        /// Hash recorded at first execution.
        recorded: u64,
        /// Hash computed from the restored or remote state.
        computed: u64,
    },
    /// A confirmed tick inside the continuous frontier has no server
    /// frame. Internal invariant violation.
    MissingConfirmedFrame {
        /// The tick whose frame is absent.
        tick: Tick,
    },
    /// `start()` was called on a session that is already running, or a
    /// system was registered after the world started.
    AlreadyRunning,
    /// An operation that requires a running session was called before
    /// `start()`.
    NotRunning,
    /// The session is paused after a fatal desync; no further stepping
    /// is performed.
    SessionPaused {
        /// The tick at which the session desynced.
        tick: Tick,
    },
    /// A replay operation was requested with no replay script loaded.
    ReplayNotLoaded,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RollbackTargetUnavailable {
                requested,
                oldest_retained,
            } => {
                write!(f, "no snapshot at or before tick {requested}")?;
                if let Some(oldest) = oldest_retained {
                    write!(f, " (oldest retained: {oldest})")?;
                }
                Ok(())
            }
            Self::HashMismatch {
                tick,
                recorded,
                computed,
            } => write!(
                f,
                "state hash mismatch at tick {tick}: \
                 recorded={recorded:#018x}, computed={computed:#018x}"
            ),
            Self::MissingConfirmedFrame { tick } => {
                write!(f, "missing confirmed frame at tick {tick}")
            }
            Self::AlreadyRunning => write!(f, "session is already running"),
            Self::NotRunning => write!(f, "session is not running"),
            Self::SessionPaused { tick } => {
                write!(f, "session paused after desync at tick {tick}")
            }
            Self::ReplayNotLoaded => write!(f, "no replay script loaded"),
        }
    }
}

impl Error for SyncError {}
