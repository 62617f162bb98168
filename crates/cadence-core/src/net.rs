//! Network boundary types.
//!
//! The engine never touches a socket. Outbound traffic goes through the
//! [`NetworkPort`] trait; inbound traffic arrives as typed
//! [`SessionEvent`]s on the engine's event queue. Transports implement
//! the trait and feed the queue; the engine stays deterministic and
//! testable with an in-memory port.

use crate::id::{ActorId, Tick};
use crate::input::{ActorInput, Frame};

/// One roster entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    /// The actor slot this player occupies.
    pub actor: ActorId,
    /// Display name.
    pub name: String,
    /// Opaque game-side descriptor (loadout, character, etc.).
    pub descriptor: Vec<u8>,
}

/// The fixed set of players in a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roster {
    /// Number of actors in the session.
    pub actor_count: u8,
    /// Which actor this peer controls.
    pub local_actor: ActorId,
    /// Per-player descriptors, one per actor.
    pub players: Vec<PlayerInfo>,
}

/// A recorded session: roster plus every confirmed input frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayScript {
    /// The session roster.
    pub roster: Roster,
    /// Confirmed frames in tick order, starting at tick 0.
    pub frames: Vec<Frame>,
}

/// Outbound messages the engine sends to the transport.
///
/// Implementations must not block: the engine calls these from inside
/// its update loop.
pub trait NetworkPort {
    /// Send the local actor's input for `tick` to the server.
    fn send_input(&mut self, tick: Tick, input: &ActorInput);

    /// Ask the server to retransmit confirmed frames starting at `from`.
    fn request_missing_frames(&mut self, from: Tick);

    /// Acknowledge a retransmission: the next frame still needed is
    /// `next_needed`.
    fn ack_missing_frames(&mut self, next_needed: Tick);

    /// Broadcast verified per-tick state hashes to the other peers,
    /// covering consecutive ticks starting at `first_tick`.
    fn broadcast_state_hashes(&mut self, first_tick: Tick, hashes: &[u64]);
}

/// Inbound messages the transport feeds to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Confirmed frames from the server, in arbitrary order.
    ServerFrames(Vec<Frame>),
    /// Retransmitted frames answering a missing-frame request.
    MissFrameResponse(Vec<Frame>),
    /// The session roster; arrives once before the game starts.
    GameStart(Roster),
    /// All players have loaded and the server is about to tick.
    AllPlayersReady,
    /// Verified state hashes from another peer, covering consecutive
    /// ticks starting at `first_tick`.
    PeerHashes {
        /// The reporting peer.
        peer: ActorId,
        /// Tick of the first hash in `hashes`.
        first_tick: Tick,
        /// One hash per consecutive tick.
        hashes: Vec<u64>,
    },
}
