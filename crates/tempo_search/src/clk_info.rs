//! Interned clock-path descriptors.
//!
//! A [`ClkInfo`] names everything about the clock a path was launched from:
//! which edge, from which source pin, whether the network is propagated,
//! generated-clock bookkeeping, pulse sense, insertion and latency folded in
//! so far, uncertainty, the analysis point, and the CRPR anchor (the clock
//! path at the launching register's clock pin). Tags reference clock infos
//! by interned ID; equality is structural over every field so that paths
//! which differ only in clock state stay distinct.

use crate::pool::TagId;
use std::hash::{Hash, Hasher};
use tempo_common::{Delay, RiseFall};
use tempo_graph::{PinId, VertexId};
use tempo_sdc::{ApIndex, ClockEdge, ClockId, ClockUncertainty};

/// A reference to a path stored at another vertex: the vertex plus the tag
/// identifying the slot. Used for previous-path links on clock paths and for
/// CRPR anchors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PathRep {
    /// The vertex holding the path.
    pub vertex: VertexId,
    /// The tag identifying the path's slot at that vertex.
    pub tag: TagId,
}

/// An interned descriptor of a clock path's state.
#[derive(Clone, Debug)]
pub struct ClkInfo {
    /// The launching clock edge; `None` for unclocked paths.
    pub clk_edge: Option<ClockEdge>,
    /// The clock source pin the path was seeded at.
    pub clk_src: Option<PinId>,
    /// `true` once any pin on the path declared the clock propagated.
    pub is_propagated: bool,
    /// The generated-clock source pin this path feeds, if any.
    pub gen_clk_src: Option<PinId>,
    /// `true` while tracing a generated clock's source path from its master.
    pub is_gen_clk_src_path: bool,
    /// Pulse-clock sense, flipped through negative-unate arcs.
    pub pulse_clk_sense: Option<RiseFall>,
    /// Source latency (insertion delay) folded into the seed arrival.
    pub insertion: Delay,
    /// Ideal network latency; applied at register clock pins when the
    /// network is not propagated.
    pub latency: Delay,
    /// Uncertainty margins governing checks launched by this clock path.
    pub uncertainty: Option<ClockUncertainty>,
    /// The path analysis point this clock path belongs to.
    pub ap: ApIndex,
    /// The CRPR anchor: the clock path at the launching register clock pin.
    pub crpr_clk_path: Option<PathRep>,
}

impl ClkInfo {
    /// A clock info for unclocked paths at the given analysis point.
    pub fn unclocked(ap: ApIndex) -> Self {
        Self {
            clk_edge: None,
            clk_src: None,
            is_propagated: false,
            gen_clk_src: None,
            is_gen_clk_src_path: false,
            pulse_clk_sense: None,
            insertion: 0.0,
            latency: 0.0,
            uncertainty: None,
            ap,
            crpr_clk_path: None,
        }
    }

    /// Returns the clock, if this path is clocked.
    pub fn clock(&self) -> Option<ClockId> {
        self.clk_edge.map(|e| e.clock)
    }

    /// Returns `true` if a CRPR anchor is recorded.
    pub fn has_crpr_clk_path(&self) -> bool {
        self.crpr_clk_path.is_some()
    }

    /// Returns a copy with the CRPR anchor stripped, used for
    /// match-ignoring-CRPR comparisons.
    pub fn without_crpr_clk_path(&self) -> Self {
        Self {
            crpr_clk_path: None,
            ..self.clone()
        }
    }
}

// Equality and hashing are structural over all fields; the f64 members
// compare bitwise so interning is exact.
impl PartialEq for ClkInfo {
    fn eq(&self, other: &Self) -> bool {
        self.clk_edge == other.clk_edge
            && self.clk_src == other.clk_src
            && self.is_propagated == other.is_propagated
            && self.gen_clk_src == other.gen_clk_src
            && self.is_gen_clk_src_path == other.is_gen_clk_src_path
            && self.pulse_clk_sense == other.pulse_clk_sense
            && self.insertion.to_bits() == other.insertion.to_bits()
            && self.latency.to_bits() == other.latency.to_bits()
            && uncertainty_bits(self.uncertainty) == uncertainty_bits(other.uncertainty)
            && self.ap == other.ap
            && self.crpr_clk_path == other.crpr_clk_path
    }
}

impl Eq for ClkInfo {}

impl Hash for ClkInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.clk_edge.hash(state);
        self.clk_src.hash(state);
        self.is_propagated.hash(state);
        self.gen_clk_src.hash(state);
        self.is_gen_clk_src_path.hash(state);
        self.pulse_clk_sense.hash(state);
        self.insertion.to_bits().hash(state);
        self.latency.to_bits().hash(state);
        uncertainty_bits(self.uncertainty).hash(state);
        self.ap.hash(state);
        self.crpr_clk_path.hash(state);
    }
}

fn uncertainty_bits(uncertainty: Option<ClockUncertainty>) -> Option<(u64, u64)> {
    uncertainty.map(|u| (u.setup.to_bits(), u.hold.to_bits()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(info: &ClkInfo) -> u64 {
        let mut h = DefaultHasher::new();
        info.hash(&mut h);
        h.finish()
    }

    #[test]
    fn unclocked_has_no_clock() {
        let info = ClkInfo::unclocked(ApIndex::from_raw(1));
        assert_eq!(info.clock(), None);
        assert!(!info.has_crpr_clk_path());
    }

    #[test]
    fn structural_equality() {
        let a = ClkInfo::unclocked(ApIndex::from_raw(0));
        let b = ClkInfo::unclocked(ApIndex::from_raw(0));
        let c = ClkInfo::unclocked(ApIndex::from_raw(1));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn insertion_distinguishes() {
        let a = ClkInfo::unclocked(ApIndex::from_raw(0));
        let mut b = a.clone();
        b.insertion = 0.5;
        assert_ne!(a, b);
    }

    #[test]
    fn crpr_anchor_distinguishes_and_strips() {
        let a = ClkInfo::unclocked(ApIndex::from_raw(0));
        let mut b = a.clone();
        b.crpr_clk_path = Some(PathRep {
            vertex: VertexId::from_raw(3),
            tag: TagId::from_raw(7),
        });
        assert_ne!(a, b);
        assert_eq!(b.without_crpr_clk_path(), a);
    }

    #[test]
    fn negative_zero_insertion_is_distinct() {
        // Bitwise comparison: -0.0 and 0.0 intern separately, which is
        // harmless (they produce fuzzy-equal arrivals).
        let a = ClkInfo::unclocked(ApIndex::from_raw(0));
        let mut b = a.clone();
        b.insertion = -0.0;
        assert_ne!(a, b);
    }
}
