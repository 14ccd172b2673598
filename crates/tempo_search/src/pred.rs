//! Edge and vertex admissibility predicates.
//!
//! Three predicate flavors steer traversal:
//! - the evaluation predicate, used when reading existing paths;
//! - the search-adjacency predicate, which additionally defers latch D→Q
//!   edges to the latch driver and admits broken loop edges only while a
//!   pending loop tag still needs them;
//! - the clock-arrival predicate, which restricts to wire and combinational
//!   edges for pure clock propagation passes.

use crate::latches::LatchState;
use crate::search::Search;
use crate::tag_group::TagGroupBldr;
use tempo_common::RiseFall;
use tempo_graph::{EdgeId, Role, VertexId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PredKind {
    Eval,
    SearchThru,
    ClkArrival,
}

/// An edge/vertex admissibility predicate.
#[derive(Clone, Copy, Debug)]
pub struct SearchPred {
    kind: PredKind,
    search_thru_latches: bool,
}

impl SearchPred {
    /// The evaluation predicate: traverses latches that are open.
    pub fn eval() -> Self {
        Self {
            kind: PredKind::Eval,
            search_thru_latches: true,
        }
    }

    /// The search-adjacency predicate: latch D→Q only when always open
    /// (normal latch traversal goes through the latch driver), broken loop
    /// edges only with pending loop work.
    pub fn search_thru_pred() -> Self {
        Self {
            kind: PredKind::SearchThru,
            search_thru_latches: true,
        }
    }

    /// The clock-arrival predicate: wire and combinational edges only.
    pub fn clk_arrival() -> Self {
        Self {
            kind: PredKind::ClkArrival,
            search_thru_latches: true,
        }
    }

    /// Returns a copy that refuses all latch D→Q edges.
    pub fn without_latches(mut self) -> Self {
        self.search_thru_latches = false;
        self
    }

    /// Returns `true` if the search may leave `vertex`.
    pub fn search_from(&self, _search: &Search, _vertex: VertexId) -> bool {
        true
    }

    /// Returns `true` if the search may traverse `edge`. The builder, when
    /// given, supplies the pending-loop-tag context for dynamic loop
    /// breaking.
    pub fn search_thru(&self, search: &Search, bldr: Option<&TagGroupBldr>, edge: EdgeId) -> bool {
        let e = search.graph.edge(edge);
        if e.is_disabled || e.role.is_timing_check() {
            return false;
        }
        if e.is_disabled_loop {
            // The evaluation predicates admit broken loop edges whenever
            // dynamic loop breaking is on; the search-adjacency predicate
            // additionally requires a pending loop tag that still needs
            // this edge.
            let admitted = match self.kind {
                PredKind::SearchThru => {
                    search.sdc.dynamic_loop_breaking()
                        && self.has_pending_loop_paths(search, bldr, edge)
                }
                PredKind::Eval | PredKind::ClkArrival => search.sdc.dynamic_loop_breaking(),
            };
            if !admitted {
                return false;
            }
        }
        match self.kind {
            PredKind::Eval => {
                e.role != Role::LatchDToQ
                    || (self.search_thru_latches
                        && search.latch_d_to_q_state(edge) != LatchState::Closed)
            }
            PredKind::SearchThru => {
                // Only search thru latch D->Q if it is always open; latch
                // enqueue is handled explicitly by the latch driver.
                e.role != Role::LatchDToQ
                    || (self.search_thru_latches
                        && search.latch_d_to_q_state(edge) == LatchState::AlwaysOpen)
            }
            PredKind::ClkArrival => e.role.propagates_clock(),
        }
    }

    /// Returns `true` if the search may enter `vertex`: clock-defined pins
    /// are excluded unless they are also internal path-delay endpoints.
    pub fn search_to(&self, search: &Search, vertex: VertexId) -> bool {
        let pin = search.graph.vertex(vertex).pin;
        !(search.sdc.is_vertex_pin_clock(pin) && !search.sdc.is_path_delay_to_pin(pin))
    }

    /// A broken loop edge stays traversable while a loop-marked tag in the
    /// builder still mutates across it to a tag the destination has not
    /// seen.
    fn has_pending_loop_paths(
        &self,
        search: &Search,
        bldr: Option<&TagGroupBldr>,
        edge: EdgeId,
    ) -> bool {
        let Some(bldr) = bldr else {
            return false;
        };
        let e = search.graph.edge(edge);
        let prev_group = search.tag_group(e.from);
        for (tag_id, _) in bldr.iter() {
            let tag = search.pools.tag(tag_id);
            if !tag.is_loop {
                continue;
            }
            // Loop exceptions apply to both transitions, so the probe
            // transition does not matter.
            let ap = tag.ap;
            let min_max = search.ap_min_max(ap);
            let to_tag = search.thru_tag(tag_id, edge, RiseFall::Rise, min_max, ap);
            if to_tag.is_some()
                && prev_group
                    .as_ref()
                    .map_or(true, |group| !group.has_tag(tag_id))
            {
                return true;
            }
        }
        false
    }
}
