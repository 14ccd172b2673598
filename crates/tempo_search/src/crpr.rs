//! Clock-reconvergence pessimism removal.
//!
//! Setup and hold checks pair a late launch clock path with an early
//! capture path (or vice versa). When the two paths share a prefix of the
//! clock tree, the shared segment cannot simultaneously be late and early;
//! the credit returned here is the min/max spread of the shared segment's
//! deepest common pin, and is added back into check slack.

use crate::clk_info::{ClkInfo, PathRep};
use crate::pool::TagId;
use crate::search::Search;
use crate::tag::Tag;
use tempo_common::{Delay, MinMax, RiseFall};
use tempo_sdc::ClockId;

/// One element of a clock path walked back to its source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct ClkPathStep {
    vertex: tempo_graph::VertexId,
    tr: RiseFall,
    clock: Option<ClockId>,
}

impl Search<'_> {
    /// The previous-path reference of the clock path in `slot` at `vertex`.
    pub fn clk_path_prev(&self, vertex: tempo_graph::VertexId, slot: usize) -> Option<PathRep> {
        self.prev_path(vertex, slot)
    }

    /// The maximum pessimism credit possible for a clock path: the spread
    /// between the max and min arrivals of the anchor pin's clock path.
    /// An upper bound used to prune arrivals that can never win.
    pub(crate) fn max_crpr(&self, clk_info: &ClkInfo) -> Delay {
        let Some(anchor) = clk_info.crpr_clk_path else {
            return 0.0;
        };
        self.arrival_spread_at(anchor).unwrap_or(0.0)
    }

    /// The pessimism shared between a data path's launch clock path and a
    /// capture clock path: the min/max spread at their deepest common
    /// clock-tree pin.
    pub(crate) fn check_crpr(&self, data_tag: &Tag, capture_path: PathRep) -> Delay {
        let info = self.pools.clk_info(data_tag.clk_info);
        let Some(launch_anchor) = info.crpr_clk_path else {
            return 0.0;
        };
        let launch_chain = self.clk_path_chain(launch_anchor);
        let capture_chain = self.clk_path_chain(capture_path);
        let mut credit_point = None;
        for (l, c) in launch_chain.iter().zip(capture_chain.iter()) {
            if l.vertex == c.vertex && l.tr == c.tr && l.clock == c.clock {
                credit_point = Some(*l);
            } else {
                break;
            }
        }
        let Some(point) = credit_point else {
            return 0.0;
        };
        self.spread_at_step(point).unwrap_or(0.0)
    }

    /// Walks a clock path's previous-path chain back to its seed, returning
    /// the steps source-first.
    fn clk_path_chain(&self, path: PathRep) -> Vec<ClkPathStep> {
        let mut chain = Vec::new();
        let mut current = Some(path);
        // Bounded by the vertex count; previous-path chains never revisit a
        // level.
        let mut budget = self.graph.vertex_count() + 1;
        while let Some(p) = current {
            if budget == 0 {
                break;
            }
            budget -= 1;
            let tag = self.pools.tag(p.tag);
            let info = self.pools.clk_info(tag.clk_info);
            chain.push(ClkPathStep {
                vertex: p.vertex,
                tr: tag.tr,
                clock: info.clock(),
            });
            current = self.tag_group(p.vertex).and_then(|group| {
                let slot = group.slot(p.tag)?;
                self.prev_path(p.vertex, slot)
            });
        }
        chain.reverse();
        chain
    }

    /// The |max − min| clock arrival spread at an anchor path's pin.
    fn arrival_spread_at(&self, anchor: PathRep) -> Option<Delay> {
        let tag = self.pools.tag(anchor.tag);
        let info = self.pools.clk_info(tag.clk_info);
        self.spread_at_step(ClkPathStep {
            vertex: anchor.vertex,
            tr: tag.tr,
            clock: info.clock(),
        })
    }

    fn spread_at_step(&self, step: ClkPathStep) -> Option<Delay> {
        let group = self.tag_group(step.vertex)?;
        let mut min_arrival = None;
        let mut max_arrival = None;
        for (slot, tag_id) in group.iter() {
            let tag = self.pools.tag(tag_id);
            if !tag.is_clk || tag.tr != step.tr {
                continue;
            }
            let info = self.pools.clk_info(tag.clk_info);
            if info.clock() != step.clock {
                continue;
            }
            let arrival = self.arrivals(step.vertex)[slot];
            match self.ap_min_max(tag.ap) {
                MinMax::Min => min_arrival = Some(arrival),
                MinMax::Max => max_arrival = Some(arrival),
            }
        }
        match (min_arrival, max_arrival) {
            (Some(min), Some(max)) => Some((max - min).max(0.0)),
            _ => None,
        }
    }

    /// The interned identity of `tag` with the CRPR anchor stripped, used
    /// for match-ignoring-anchor comparisons.
    pub(crate) fn tag_no_crpr(&self, tag_id: TagId) -> TagId {
        let tag = self.pools.tag(tag_id);
        let info = self.pools.clk_info(tag.clk_info);
        if !info.has_crpr_clk_path() {
            return tag_id;
        }
        let stripped_info = self.pools.find_clk_info(info.without_crpr_clk_path());
        self.pools.find_tag(Tag::new(
            tag.tr,
            tag.ap,
            stripped_info,
            tag.is_clk,
            tag.input_delay,
            tag.is_segment_start,
            tag.states.clone(),
            tag.is_loop,
            tag.is_filter,
        ))
    }
}
