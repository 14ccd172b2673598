//! Signal transitions and timing arc senses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A signal edge direction at a pin.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum RiseFall {
    /// Low-to-high transition.
    Rise,
    /// High-to-low transition.
    Fall,
}

impl RiseFall {
    /// Both transitions, rise first.
    pub const BOTH: [RiseFall; 2] = [RiseFall::Rise, RiseFall::Fall];

    /// Returns the opposite transition.
    pub fn opposite(self) -> RiseFall {
        match self {
            RiseFall::Rise => RiseFall::Fall,
            RiseFall::Fall => RiseFall::Rise,
        }
    }

    /// Returns a stable index (rise = 0, fall = 1) for array storage.
    pub fn index(self) -> usize {
        match self {
            RiseFall::Rise => 0,
            RiseFall::Fall => 1,
        }
    }
}

impl fmt::Display for RiseFall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiseFall::Rise => write!(f, "^"),
            RiseFall::Fall => write!(f, "v"),
        }
    }
}

/// The unateness of a timing arc: how the output transition relates to the
/// input transition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TimingSense {
    /// Output follows input (buffer, AND input).
    PositiveUnate,
    /// Output opposes input (inverter, NAND input).
    NegativeUnate,
    /// Either output transition can result (XOR input).
    NonUnate,
}

impl TimingSense {
    /// Maps an input transition to the output transition for unate arcs.
    /// Non-unate arcs have no single answer and return `None`.
    pub fn to_transition(self, from: RiseFall) -> Option<RiseFall> {
        match self {
            TimingSense::PositiveUnate => Some(from),
            TimingSense::NegativeUnate => Some(from.opposite()),
            TimingSense::NonUnate => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite() {
        assert_eq!(RiseFall::Rise.opposite(), RiseFall::Fall);
        assert_eq!(RiseFall::Fall.opposite(), RiseFall::Rise);
    }

    #[test]
    fn sense_mapping() {
        assert_eq!(
            TimingSense::PositiveUnate.to_transition(RiseFall::Rise),
            Some(RiseFall::Rise)
        );
        assert_eq!(
            TimingSense::NegativeUnate.to_transition(RiseFall::Rise),
            Some(RiseFall::Fall)
        );
        assert_eq!(TimingSense::NonUnate.to_transition(RiseFall::Rise), None);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", RiseFall::Rise), "^");
        assert_eq!(format!("{}", RiseFall::Fall), "v");
    }
}
