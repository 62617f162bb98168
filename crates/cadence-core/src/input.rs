//! Per-tick input frames.
//!
//! A [`Frame`] is the complete input record for one tick: one
//! [`ActorInput`] per actor, each carrying zero or more opaque
//! [`InputCommand`]s. Frames are immutable once stored; divergence
//! between a predicted frame and its server confirmation is detected
//! by comparing command content, never object identity.

use smallvec::SmallVec;

use crate::id::{ActorId, Tick};

/// One opaque game command.
///
/// The engine never interprets commands; it only stores, compares, and
/// replays them. `opcode` selects the game-side handler and `payload`
/// is its argument bytes. Payloads up to 8 bytes stay inline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputCommand {
    /// Game-defined operation code.
    pub opcode: u8,
    /// Operation arguments, uninterpreted by the engine.
    pub payload: SmallVec<[u8; 8]>,
}

impl InputCommand {
    /// Build a command from an opcode and payload bytes.
    pub fn new(opcode: u8, payload: &[u8]) -> Self {
        Self {
            opcode,
            payload: SmallVec::from_slice(payload),
        }
    }
}

/// All commands issued by one actor for one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorInput {
    /// The issuing actor.
    pub actor: ActorId,
    /// Commands for this tick, in issue order. Usually zero or one.
    pub commands: SmallVec<[InputCommand; 2]>,
}

impl ActorInput {
    /// An input record with no commands.
    pub fn empty(actor: ActorId) -> Self {
        Self {
            actor,
            commands: SmallVec::new(),
        }
    }

    /// An input record carrying the given commands.
    pub fn with_commands(actor: ActorId, commands: impl IntoIterator<Item = InputCommand>) -> Self {
        Self {
            actor,
            commands: commands.into_iter().collect(),
        }
    }
}

/// The input record for one tick across all actors.
///
/// Construction sorts entries by actor so that two frames built from
/// the same inputs in different orders are identical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// The tick this frame belongs to.
    pub tick: Tick,
    /// Per-actor inputs, sorted by actor id.
    pub inputs: Vec<ActorInput>,
}

impl Frame {
    /// Build a frame, sorting inputs by actor id.
    pub fn new(tick: Tick, mut inputs: Vec<ActorInput>) -> Self {
        inputs.sort_by_key(|i| i.actor);
        Self { tick, inputs }
    }

    /// A frame where every actor in `0..actor_count` issued no commands.
    pub fn empty(tick: Tick, actor_count: u8) -> Self {
        Self {
            tick,
            inputs: (0..actor_count).map(|a| ActorInput::empty(ActorId(a))).collect(),
        }
    }

    /// The input record for `actor`, if present.
    pub fn input_for(&self, actor: ActorId) -> Option<&ActorInput> {
        self.inputs.iter().find(|i| i.actor == actor)
    }

    /// Replace (or insert) the commands for one actor.
    pub fn set_input(&mut self, input: ActorInput) {
        match self.inputs.iter_mut().find(|i| i.actor == input.actor) {
            Some(slot) => *slot = input,
            None => {
                self.inputs.push(input);
                self.inputs.sort_by_key(|i| i.actor);
            }
        }
    }

    /// Whether two frames carry the same input content.
    ///
    /// Compares per-actor command sequences by value. An absent actor
    /// entry and an entry with zero commands are equivalent, and the
    /// frames' tick fields are ignored, so a predicted frame and its
    /// confirmation compare on content alone.
    pub fn same_inputs(&self, other: &Frame) -> bool {
        let empty: SmallVec<[InputCommand; 2]> = SmallVec::new();
        let commands_of = |frame: &Frame, actor: ActorId| -> SmallVec<[InputCommand; 2]> {
            frame
                .input_for(actor)
                .map(|i| i.commands.clone())
                .unwrap_or_else(|| empty.clone())
        };
        for input in self.inputs.iter().chain(other.inputs.iter()) {
            if commands_of(self, input.actor) != commands_of(other, input.actor) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(op: u8) -> InputCommand {
        InputCommand::new(op, &[1, 2])
    }

    #[test]
    fn new_sorts_by_actor() {
        let frame = Frame::new(
            Tick(0),
            vec![ActorInput::empty(ActorId(2)), ActorInput::empty(ActorId(0))],
        );
        assert_eq!(frame.inputs[0].actor, ActorId(0));
        assert_eq!(frame.inputs[1].actor, ActorId(2));
    }

    #[test]
    fn same_inputs_ignores_tick() {
        let a = Frame::new(Tick(1), vec![ActorInput::with_commands(ActorId(0), [cmd(1)])]);
        let b = Frame::new(Tick(9), vec![ActorInput::with_commands(ActorId(0), [cmd(1)])]);
        assert!(a.same_inputs(&b));
    }

    #[test]
    fn same_inputs_detects_command_difference() {
        let a = Frame::new(Tick(5), vec![ActorInput::with_commands(ActorId(0), [cmd(1)])]);
        let b = Frame::new(Tick(5), vec![ActorInput::with_commands(ActorId(0), [cmd(2)])]);
        assert!(!a.same_inputs(&b));
    }

    #[test]
    fn absent_actor_equals_empty_commands() {
        let a = Frame::new(Tick(0), vec![]);
        let b = Frame::empty(Tick(0), 3);
        assert!(a.same_inputs(&b));
        assert!(b.same_inputs(&a));
    }

    #[test]
    fn extra_actor_with_commands_differs() {
        let a = Frame::empty(Tick(0), 2);
        let mut b = Frame::empty(Tick(0), 2);
        b.set_input(ActorInput::with_commands(ActorId(1), [cmd(7)]));
        assert!(!a.same_inputs(&b));
    }

    #[test]
    fn set_input_replaces_existing() {
        let mut frame = Frame::empty(Tick(0), 2);
        frame.set_input(ActorInput::with_commands(ActorId(1), [cmd(3)]));
        assert_eq!(frame.input_for(ActorId(1)).unwrap().commands.len(), 1);
        assert_eq!(frame.inputs.len(), 2);
    }
}
