//! Strongly-typed identifiers.

use std::fmt;

/// Monotonically increasing tick counter.
///
/// One tick is one fixed-duration simulation step. The authoritative
/// value is owned by the world and increases by exactly one per step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// The tick following this one.
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }

    /// The tick preceding this one, or `None` at tick zero.
    pub fn prev(self) -> Option<Tick> {
        self.0.checked_sub(1).map(Tick)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Tick {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies one actor (player) in a session.
///
/// Actors are assigned sequential IDs at game start and the roster is
/// fixed for the lifetime of the session. `ActorId(n)` corresponds to
/// the n-th entry in the roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u8);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for ActorId {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_next_and_prev() {
        assert_eq!(Tick(0).next(), Tick(1));
        assert_eq!(Tick(5).prev(), Some(Tick(4)));
        assert_eq!(Tick(0).prev(), None);
    }

    #[test]
    fn tick_ordering() {
        assert!(Tick(1) < Tick(2));
        assert_eq!(Tick::from(7u64), Tick(7));
    }
}
