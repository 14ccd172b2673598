//! Transparent-latch queries.
//!
//! Latch D→Q arcs are the one place arrivals depend on a fixed point: the
//! output follows the later of the data arrival and the enable opening
//! edge, and the resulting path launches from the enable clock (time
//! borrowing). The latch driver in the search loop re-enqueues latch
//! outputs between passes; the queries here identify latch arcs, their
//! transparency, and the enable clock path.

use crate::clk_info::PathRep;
use crate::pool::TagId;
use crate::search::Search;
use tempo_common::{Delay, RiseFall};
use tempo_graph::{EdgeId, Role, VertexId};
use tempo_sdc::ApIndex;

/// Transparency of a latch D→Q arc.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LatchState {
    /// No clocked enable: the latch is permanently transparent and the arc
    /// is traversed like a combinational edge.
    AlwaysOpen,
    /// A clocked enable exists; traversal is deferred to the latch driver.
    Open,
    /// The arc is disabled.
    Closed,
}

impl Search<'_> {
    /// Returns `true` for latch data-to-output edges.
    pub fn is_latch_d_to_q(&self, edge: EdgeId) -> bool {
        self.graph.edge(edge).role == Role::LatchDToQ
    }

    /// Returns the transparency of a latch D→Q edge.
    pub fn latch_d_to_q_state(&self, edge: EdgeId) -> LatchState {
        match self.latch_enable_edge(edge) {
            Some(_) => LatchState::Open,
            None => LatchState::AlwaysOpen,
        }
    }

    /// The enable-to-output edge feeding the same latch output as `edge`.
    fn latch_enable_edge(&self, edge: EdgeId) -> Option<EdgeId> {
        let q = self.graph.edge(edge).to;
        self.graph
            .in_edges(q)
            .iter()
            .copied()
            .find(|&e| self.graph.edge(e).role == Role::LatchEnToQ)
    }

    /// The clock path at the latch enable pin for the given analysis point,
    /// and the time the enable opens (with ideal insertion and latency
    /// folded in).
    pub fn latch_enable_path(&self, edge: EdgeId, ap: ApIndex) -> Option<(PathRep, Delay)> {
        let enable_edge = self.latch_enable_edge(edge)?;
        let en = self.graph.edge(enable_edge);
        let open_tr = self
            .graph
            .arc_set(en.arc_set)
            .arcs
            .first()
            .map_or(RiseFall::Rise, |arc| arc.from_tr);
        let group = self.tag_group(en.from)?;
        for (_slot, tag_id) in group.iter() {
            let tag = self.pools.tag(tag_id);
            if tag.is_clk && tag.tr == open_tr && tag.ap == ap {
                let path = PathRep {
                    vertex: en.from,
                    tag: tag_id,
                };
                let open_arrival = self.clk_path_arrival(path);
                return Some((path, open_arrival));
            }
        }
        None
    }

    /// The latch output tag and pre-arc arrival for a data path reaching a
    /// transparent latch: `max(data arrival, enable open)`, launched from
    /// the enable clock (time borrowing), carrying the data path's
    /// exception states.
    pub(crate) fn latch_out_arrival(
        &self,
        _from_vertex: VertexId,
        from_tag: TagId,
        from_arrival: Delay,
        edge: EdgeId,
        to_tr: RiseFall,
        ap: ApIndex,
    ) -> Option<(TagId, Delay)> {
        let (enable_path, open_arrival) = self.latch_enable_path(edge, ap)?;
        let en_tag = self.pools.tag(enable_path.tag);
        let mut info = (*self.pools.clk_info(en_tag.clk_info)).clone();
        if self.crpr_active() {
            info.crpr_clk_path = Some(enable_path);
        }
        let clk_info = self.pools.find_clk_info(info);
        let from = self.pools.tag(from_tag);
        let tag = self.intern_tag(
            to_tr,
            ap,
            clk_info,
            false,
            None,
            false,
            from.states.clone(),
        );
        Some((tag, from_arrival.max(open_arrival)))
    }
}
