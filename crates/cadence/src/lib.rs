//! Cadence: deterministic lockstep synchronization with prediction and
//! rollback.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Cadence sub-crates. For most users, adding `cadence` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//! use cadence_test_utils::{CounterSystem, NullPort};
//!
//! // Two actors, this peer controls actor 0. NullPort discards
//! // outbound traffic; a real transport implements NetworkPort.
//! let config = SyncConfig::new(2, ActorId(0));
//! let mut sim = Simulator::new(config, NullPort).unwrap();
//! sim.register_system(Box::new(CounterSystem::new())).unwrap();
//! sim.start(0).unwrap();
//!
//! // One tick interval of wall clock: one predicted step.
//! let status = sim.update(33, 33, &[]).unwrap();
//! assert_eq!(status, UpdateStatus::Running { advanced: 1 });
//! assert_eq!(sim.world().tick(), Tick(1));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | IDs, frames, fixed-point math, core traits |
//! | [`engine`] | `cadence-engine` | Simulator, frame buffer, hash ledger |
//! | [`replay`] | `cadence-replay` | Session recording and playback |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`cadence-core`).
///
/// Contains [`types::Tick`], [`types::Frame`], the deterministic
/// fixed-point type [`types::Fixed`], and the [`types::GameSystem`] and
/// [`types::NetworkPort`] traits.
pub use cadence_core as types;

/// The synchronization engine (`cadence-engine`).
///
/// [`engine::Simulator`] drives the session; [`engine::FrameBuffer`],
/// [`engine::World`], and [`engine::StateHasher`] are its parts,
/// exposed for direct use and testing.
pub use cadence_engine as engine;

/// Session recording and playback (`cadence-replay`).
///
/// Record confirmed frames with [`replay::RecordWriter`], load them
/// back with [`replay::RecordReader`], and drive playback through
/// [`engine::Simulator::load_replay`].
pub use cadence_replay as replay;

/// Common imports for typical Cadence usage.
///
/// ```rust
/// use cadence::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use cadence_core::{
        ActorId, ActorInput, Fixed, Frame, GameSystem, InputCommand, NetworkPort, PlayerInfo,
        ReplayScript, Roster, SessionEvent, SnapshotStore, StepContext, SyncError, Tick,
        TimeMachine,
    };

    // Engine
    pub use cadence_engine::{
        ConfigError, DesyncReport, EventSender, SessionState, Simulator, SyncConfig, SyncMetrics,
        UpdateStatus,
    };

    // Replay
    pub use cadence_replay::{RecordError, RecordReader, RecordWriter};
}
