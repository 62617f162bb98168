//! Prediction/rollback synchronization engine.
//!
//! The engine keeps a fixed-tick deterministic simulation in lockstep
//! with a relay server: local inputs are sent ahead, remote inputs are
//! predicted by repeating their last known values, and confirmed server
//! frames are checked against what was predicted. A misprediction rolls
//! the world back to the last verified tick and re-simulates with the
//! confirmed inputs; cross-peer hash exchange catches true divergence.
//!
//! [`Simulator`] is the entry point. It is transport-agnostic: outbound
//! traffic goes through a caller-supplied [`cadence_core::NetworkPort`],
//! inbound traffic arrives as [`cadence_core::SessionEvent`]s via an
//! [`EventSender`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod frame_buffer;
pub mod hasher;
pub mod ingress;
pub mod metrics;
pub mod simulator;
pub mod world;

pub use config::{ConfigError, SyncConfig};
pub use diagnostics::DesyncReport;
pub use frame_buffer::FrameBuffer;
pub use hasher::StateHasher;
pub use ingress::{EventQueue, EventSender};
pub use metrics::SyncMetrics;
pub use simulator::{SessionState, Simulator, UpdateStatus};
pub use world::World;
