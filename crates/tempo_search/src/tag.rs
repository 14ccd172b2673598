//! Interned path tags.
//!
//! A [`Tag`] names one distinct path flavor at a vertex: the transition, the
//! analysis point, the clock state, whether the path is still a clock,
//! the input delay that seeded it, whether it begins a path segment, and the
//! set of exception-state cursors it carries. Interning makes tag equality a
//! pointer/ID compare, which is what keeps the per-vertex merge cheap.

use crate::pool::ClkInfoId;
use tempo_common::RiseFall;
use tempo_sdc::{ApIndex, ExceptionState, InputDelayId};

/// An interned tag: the identity of one path flavor.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Tag {
    /// The transition at the vertex.
    pub tr: RiseFall,
    /// The path analysis point.
    pub ap: ApIndex,
    /// The clock-path descriptor.
    pub clk_info: ClkInfoId,
    /// `true` while the path is still inside the clock network.
    pub is_clk: bool,
    /// The input delay that seeded this path, if any.
    pub input_delay: Option<InputDelayId>,
    /// `true` if the path begins a segment with zero arrival here.
    pub is_segment_start: bool,
    /// The exception-state cursors carried by the path (sorted).
    pub states: Vec<ExceptionState>,
    /// Cached: some carried state belongs to a loop exception.
    pub is_loop: bool,
    /// Cached: some carried state belongs to a filter exception.
    pub is_filter: bool,
}

impl Tag {
    /// Creates a tag; `states` must already be sorted and deduplicated, and
    /// the loop/filter bits must reflect the states' exceptions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tr: RiseFall,
        ap: ApIndex,
        clk_info: ClkInfoId,
        is_clk: bool,
        input_delay: Option<InputDelayId>,
        is_segment_start: bool,
        states: Vec<ExceptionState>,
        is_loop: bool,
        is_filter: bool,
    ) -> Self {
        debug_assert!(states.windows(2).all(|w| w[0] < w[1]));
        Self {
            tr,
            ap,
            clk_info,
            is_clk,
            input_delay,
            is_segment_start,
            states,
            is_loop,
            is_filter,
        }
    }

    /// Returns `true` if the tag carries any exception state.
    pub fn has_states(&self) -> bool {
        !self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_sdc::ExceptionId;

    fn make_tag(states: Vec<ExceptionState>) -> Tag {
        Tag::new(
            RiseFall::Rise,
            ApIndex::from_raw(1),
            ClkInfoId::from_raw(0),
            false,
            None,
            false,
            states,
            false,
            false,
        )
    }

    #[test]
    fn equality_over_all_fields() {
        let a = make_tag(vec![]);
        let b = make_tag(vec![]);
        assert_eq!(a, b);
        let mut c = make_tag(vec![]);
        c.is_clk = true;
        assert_ne!(a, c);
    }

    #[test]
    fn states_distinguish() {
        let a = make_tag(vec![]);
        let b = make_tag(vec![ExceptionState::first(ExceptionId::from_raw(0))]);
        assert_ne!(a, b);
        assert!(b.has_states());
    }

    #[test]
    fn cursor_position_distinguishes() {
        let s = ExceptionState::first(ExceptionId::from_raw(0));
        let a = make_tag(vec![s]);
        let b = make_tag(vec![s.advanced()]);
        assert_ne!(a, b);
    }
}
