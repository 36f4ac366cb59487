//! Reactive heuristic controller over the fixed action vocabulary.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kinematics::Turn;
use crate::sensor::Contacts;

/// Below this draw a clear-ahead agent turns away from a blocked side.
pub const TURN_AWAY_THRESHOLD: f32 = 0.15;
/// Below this (and above [`TURN_AWAY_THRESHOLD`]) it turns toward the other side.
pub const TURN_TOWARD_THRESHOLD: f32 = 0.30;

/// Actions understood by the environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Left,
    Right,
    Forward,
}

impl Action {
    pub const ALL: [Self; 3] = [Self::Left, Self::Right, Self::Forward];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Forward => "Forward",
        }
    }

    /// Parse an action name as used by pattern tables and external callers.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
    }

    /// Rotation performed by this action, if any.
    #[must_use]
    pub const fn turn(self) -> Option<Turn> {
        match self {
            Self::Left => Some(Turn::Left),
            Self::Right => Some(Turn::Right),
            Self::Forward => None,
        }
    }

    #[must_use]
    pub const fn is_turn(self) -> bool {
        self.turn().is_some()
    }

    const fn from_turn(turn: Turn) -> Self {
        match turn {
            Turn::Left => Self::Left,
            Turn::Right => Self::Right,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-following heuristic.
///
/// The only state it consults besides the current contacts is the previous action, which the
/// caller passes in; randomness comes from the caller's RNG so runs replay under a fixed seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactivePolicy;

impl ReactivePolicy {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Choose the next action.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        contacts: Contacts,
        previous: Option<Action>,
        rng: &mut R,
    ) -> Action {
        if contacts.front {
            return Action::from_turn(Self::escape_turn(contacts, previous, rng));
        }

        let draw: f32 = rng.random();
        if draw < TURN_TOWARD_THRESHOLD {
            let away = if contacts.left && !contacts.right {
                Turn::Right
            } else {
                Turn::Left
            };
            let turn = if draw < TURN_AWAY_THRESHOLD {
                away
            } else {
                away.opposite()
            };
            return Action::from_turn(turn);
        }
        Action::Forward
    }

    fn escape_turn<R: Rng + ?Sized>(
        contacts: Contacts,
        previous: Option<Action>,
        rng: &mut R,
    ) -> Turn {
        match (contacts.right, contacts.left) {
            (false, false) => {
                // Persist in the previous turn direction.
                if let Some(turn) = previous.and_then(Action::turn) {
                    turn
                } else if rng.random::<f32>() < 0.5 {
                    Turn::Left
                } else {
                    Turn::Right
                }
            }
            (true, false) => Turn::Left,
            _ => Turn::Right,
        }
    }
}
