//! Timing exceptions and their traversal state.
//!
//! An [`ExceptionPath`] is a from/thru/to pattern with a kind (false path,
//! multicycle, min/max delay override, filter, loop). Paths carry
//! [`ExceptionState`] cursors in their tags; the cursor records which `-thru`
//! points have been satisfied so far. A state is *complete* when every thru
//! has been matched and the exception has no `-to` (a `-to` is resolved at
//! the path end, not during traversal).

use crate::clocks::{ClockEdge, ClockId};
use crate::corner::define_id;
use serde::{Deserialize, Serialize};
use tempo_common::{Delay, MinMax, RiseFall};
use tempo_graph::PinId;

define_id!(
    /// Opaque, copyable ID for a timing exception.
    ExceptionId
);

/// What an exception does to the paths it matches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// `set_false_path`: matched paths are not timed.
    False,
    /// `set_multicycle_path`: the capture edge moves by `cycles - 1`
    /// periods of the end clock.
    Multicycle {
        /// Number of end-clock cycles allowed for propagation.
        cycles: u32,
    },
    /// `set_max_delay` / `set_min_delay`: the required time is the given
    /// delay instead of a clock-derived value.
    PathDelay {
        /// The delay bound in nanoseconds.
        delay: Delay,
        /// Which analysis direction the bound constrains.
        min_max: MinMax,
        /// `true` if clock latency is excluded from the check.
        ignore_clk_latency: bool,
    },
    /// An internal filter installed by path-end enumeration to restrict the
    /// search to `-from`/`-thru` matching paths.
    Filter,
    /// An internal marker carried around broken combinational loops.
    Loop,
}

impl ExceptionKind {
    /// Returns `true` for false-path exceptions.
    pub fn is_false(&self) -> bool {
        matches!(self, ExceptionKind::False)
    }

    /// Returns `true` for loop markers.
    pub fn is_loop(&self) -> bool {
        matches!(self, ExceptionKind::Loop)
    }

    /// Returns `true` for filter exceptions.
    pub fn is_filter(&self) -> bool {
        matches!(self, ExceptionKind::Filter)
    }

    /// Resolution priority when several exceptions complete at one path end;
    /// higher wins.
    pub fn priority(&self) -> u32 {
        match self {
            ExceptionKind::False => 4000,
            ExceptionKind::Loop => 4000,
            ExceptionKind::PathDelay { .. } => 3000,
            ExceptionKind::Multicycle { .. } => 2000,
            ExceptionKind::Filter => 1000,
        }
    }
}

/// The `-from` pattern of an exception: source pins and/or source clocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionFrom {
    /// Matching startpoint pins.
    pub pins: Vec<PinId>,
    /// Matching launch clocks.
    pub clocks: Vec<ClockId>,
    /// Required startpoint transition, if constrained.
    pub tr: Option<RiseFall>,
}

impl ExceptionFrom {
    /// Returns `true` if a path starting at `pin` with launch clock `clk`
    /// and transition `tr` matches this pattern.
    pub fn matches(&self, pin: Option<PinId>, clk: Option<ClockId>, tr: RiseFall) -> bool {
        if let Some(want_tr) = self.tr {
            if want_tr != tr {
                return false;
            }
        }
        let pin_match = pin.is_some_and(|p| self.pins.contains(&p));
        let clk_match = clk.is_some_and(|c| self.clocks.contains(&c));
        pin_match || clk_match
    }

    /// Returns `true` if the pattern names pins (not only clocks).
    pub fn has_pins(&self) -> bool {
        !self.pins.is_empty()
    }
}

/// One `-thru` point of an exception.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionThru {
    /// Pins the path must pass through (hierarchical pins expanded to
    /// leaf pins at registration).
    pub pins: Vec<PinId>,
    /// Required transition at the matched pin, if constrained.
    pub tr: Option<RiseFall>,
}

impl ExceptionThru {
    /// Returns `true` if the edge `from_pin → to_pin` with destination
    /// transition `to_tr` passes through this point.
    pub fn matches(&self, from_pin: PinId, to_pin: PinId, to_tr: RiseFall) -> bool {
        if let Some(want_tr) = self.tr {
            if want_tr != to_tr {
                return false;
            }
        }
        self.pins.contains(&from_pin) || self.pins.contains(&to_pin)
    }
}

/// The `-to` pattern of an exception: endpoint pins and/or capture clocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionTo {
    /// Matching endpoint pins.
    pub pins: Vec<PinId>,
    /// Matching capture clocks.
    pub clocks: Vec<ClockId>,
    /// Required endpoint transition, if constrained.
    pub tr: Option<RiseFall>,
}

impl ExceptionTo {
    /// Returns `true` if a path ending at `pin` with capture edge
    /// `clk_edge` and transition `tr` matches this pattern.
    pub fn matches(&self, pin: PinId, clk_edge: Option<ClockEdge>, tr: RiseFall) -> bool {
        if let Some(want_tr) = self.tr {
            if want_tr != tr {
                return false;
            }
        }
        if self.pins.is_empty() && self.clocks.is_empty() {
            return true;
        }
        self.pins.contains(&pin)
            || clk_edge.is_some_and(|e| self.clocks.contains(&e.clock))
    }
}

/// A timing exception.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExceptionPath {
    /// The unique ID of this exception.
    pub id: ExceptionId,
    /// What the exception does to matched paths.
    pub kind: ExceptionKind,
    /// The `-from` pattern, if any.
    pub from: Option<ExceptionFrom>,
    /// The ordered `-thru` points.
    pub thrus: Vec<ExceptionThru>,
    /// The `-to` pattern, if any.
    pub to: Option<ExceptionTo>,
    /// The analysis direction this exception applies to; `None` for both.
    pub min_max: Option<MinMax>,
}

impl ExceptionPath {
    /// Returns `true` if this exception applies to the given direction.
    pub fn matches_min_max(&self, min_max: MinMax) -> bool {
        self.min_max.is_none() || self.min_max == Some(min_max)
    }

    /// Returns the resolution priority of this exception.
    pub fn priority(&self) -> u32 {
        self.kind.priority()
    }

    /// Returns `true` if `state` has satisfied every `-thru` point and no
    /// `-to` remains to be resolved.
    pub fn state_complete(&self, state: ExceptionState) -> bool {
        state.next_thru as usize >= self.thrus.len() && self.to.is_none()
    }

    /// Returns `true` if `state` has satisfied every `-thru` point (the
    /// `-to`, if any, is resolved at the path end).
    pub fn thrus_complete(&self, state: ExceptionState) -> bool {
        state.next_thru as usize >= self.thrus.len()
    }

    /// Returns `true` if the edge satisfies the state's next pending thru.
    pub fn matches_next_thru(
        &self,
        state: ExceptionState,
        from_pin: PinId,
        to_pin: PinId,
        to_tr: RiseFall,
    ) -> bool {
        self.thrus
            .get(state.next_thru as usize)
            .is_some_and(|thru| thru.matches(from_pin, to_pin, to_tr))
    }
}

/// A cursor into an exception's `-thru` sequence, carried by tags.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ExceptionState {
    /// The exception this state belongs to.
    pub exception: ExceptionId,
    /// Index of the next unsatisfied `-thru` point.
    pub next_thru: u16,
}

impl ExceptionState {
    /// The initial state of an exception (no thrus satisfied yet).
    pub fn first(exception: ExceptionId) -> Self {
        Self {
            exception,
            next_thru: 0,
        }
    }

    /// The state after satisfying the next thru.
    pub fn advanced(self) -> Self {
        Self {
            exception: self.exception,
            next_thru: self.next_thru + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn false_path(id: u32, thrus: Vec<ExceptionThru>, to: Option<ExceptionTo>) -> ExceptionPath {
        ExceptionPath {
            id: ExceptionId::from_raw(id),
            kind: ExceptionKind::False,
            from: None,
            thrus,
            to,
            min_max: None,
        }
    }

    #[test]
    fn from_matches_pin_or_clock() {
        let from = ExceptionFrom {
            pins: vec![PinId::from_raw(1)],
            clocks: vec![ClockId::from_raw(0)],
            tr: None,
        };
        assert!(from.matches(Some(PinId::from_raw(1)), None, RiseFall::Rise));
        assert!(from.matches(None, Some(ClockId::from_raw(0)), RiseFall::Fall));
        assert!(!from.matches(Some(PinId::from_raw(2)), None, RiseFall::Rise));
    }

    #[test]
    fn from_transition_constraint() {
        let from = ExceptionFrom {
            pins: vec![PinId::from_raw(1)],
            clocks: vec![],
            tr: Some(RiseFall::Rise),
        };
        assert!(from.matches(Some(PinId::from_raw(1)), None, RiseFall::Rise));
        assert!(!from.matches(Some(PinId::from_raw(1)), None, RiseFall::Fall));
    }

    #[test]
    fn thru_matches_either_end_of_edge() {
        let thru = ExceptionThru {
            pins: vec![PinId::from_raw(5)],
            tr: None,
        };
        assert!(thru.matches(PinId::from_raw(5), PinId::from_raw(6), RiseFall::Rise));
        assert!(thru.matches(PinId::from_raw(4), PinId::from_raw(5), RiseFall::Rise));
        assert!(!thru.matches(PinId::from_raw(4), PinId::from_raw(6), RiseFall::Rise));
    }

    #[test]
    fn state_advances_through_thrus() {
        let exc = false_path(
            0,
            vec![
                ExceptionThru {
                    pins: vec![PinId::from_raw(5)],
                    tr: None,
                },
                ExceptionThru {
                    pins: vec![PinId::from_raw(9)],
                    tr: None,
                },
            ],
            None,
        );
        let s0 = ExceptionState::first(exc.id);
        assert!(!exc.state_complete(s0));
        assert!(exc.matches_next_thru(s0, PinId::from_raw(4), PinId::from_raw(5), RiseFall::Rise));
        let s1 = s0.advanced();
        assert!(!exc.state_complete(s1));
        assert!(!exc.matches_next_thru(s1, PinId::from_raw(4), PinId::from_raw(5), RiseFall::Rise));
        assert!(exc.matches_next_thru(s1, PinId::from_raw(9), PinId::from_raw(10), RiseFall::Fall));
        let s2 = s1.advanced();
        assert!(exc.state_complete(s2));
    }

    #[test]
    fn to_defers_completion() {
        let exc = false_path(
            0,
            vec![],
            Some(ExceptionTo {
                pins: vec![PinId::from_raw(7)],
                clocks: vec![],
                tr: None,
            }),
        );
        let s = ExceptionState::first(exc.id);
        // All thrus are satisfied, but a -to remains: not complete mid-path.
        assert!(exc.thrus_complete(s));
        assert!(!exc.state_complete(s));
    }

    #[test]
    fn priorities() {
        assert!(ExceptionKind::False.priority() > ExceptionKind::PathDelay {
            delay: 1.0,
            min_max: MinMax::Max,
            ignore_clk_latency: false
        }
        .priority());
        assert!(
            ExceptionKind::PathDelay {
                delay: 1.0,
                min_max: MinMax::Max,
                ignore_clk_latency: false
            }
            .priority()
                > ExceptionKind::Multicycle { cycles: 2 }.priority()
        );
    }

    #[test]
    fn min_max_applicability() {
        let mut exc = false_path(0, vec![], None);
        assert!(exc.matches_min_max(MinMax::Min));
        assert!(exc.matches_min_max(MinMax::Max));
        exc.min_max = Some(MinMax::Max);
        assert!(!exc.matches_min_max(MinMax::Min));
    }

    #[test]
    fn empty_to_matches_everything() {
        let to = ExceptionTo::default();
        assert!(to.matches(PinId::from_raw(3), None, RiseFall::Rise));
    }
}
