//! Core types and traits for the Cadence lockstep synchronization framework.
//!
//! This crate holds everything the engine, replay, and test crates share:
//! strongly-typed identifiers, the deterministic fixed-point scalar,
//! per-tick input frames, FNV-1a hashing, the [`GameSystem`] and
//! [`TimeMachine`] traits, the generic [`SnapshotStore`], and the
//! network boundary types ([`NetworkPort`], [`SessionEvent`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod fp;
pub mod hash;
pub mod id;
pub mod input;
pub mod net;
pub mod snapshot;
pub mod traits;

pub use error::SyncError;
pub use fp::Fixed;
pub use id::{ActorId, Tick};
pub use input::{ActorInput, Frame, InputCommand};
pub use net::{NetworkPort, PlayerInfo, ReplayScript, Roster, SessionEvent};
pub use snapshot::SnapshotStore;
pub use traits::{GameSystem, StepContext, TimeMachine};
