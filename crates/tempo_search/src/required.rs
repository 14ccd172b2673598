//! The backward (required-time) visitor.
//!
//! Requireds are seeded at endpoints from their path ends and propagate
//! backward as `required(fanout) − arc_delay`, tightened per slot (min for
//! max paths, max for min paths). Latch D→Q edges never carry requireds.
//! When the fanout tag was CRPR-pruned, the fallback is a fanout tag that
//! matches on everything except the CRPR anchor.

use crate::bfs::BfsIterator;
use crate::pool::TagId;
use crate::pred::SearchPred;
use crate::search::Search;
use tempo_common::{fuzzy_equal, fuzzy_worse, Delay, MinMax};
use tempo_graph::{Role, VertexId};

/// The result of one parallel required visit, committed sequentially.
pub(crate) struct RequiredOutcome {
    /// Per-slot required times (aligned with the vertex's arrival slots).
    pub requireds: Vec<Delay>,
    /// `true` if any slot was tightened past its initial value.
    pub have: bool,
    /// `true` if the stored requireds changed beyond the fuzzy tolerance.
    pub changed: bool,
}

impl Search<'_> {
    /// Computes `vertex`'s required times from its fanout and local checks.
    pub(crate) fn required_visit(&self, vertex: VertexId) -> Option<RequiredOutcome> {
        let group = self.tag_group(vertex)?;
        log::trace!("find required {vertex:?}");
        let mut requireds: Vec<Delay> = group
            .iter()
            .map(|(_, tag)| self.required_init_value(self.pools.tag(tag).ap))
            .collect();
        let mut have = false;
        let pred = SearchPred::search_thru_pred();
        let pin = self.graph.vertex(vertex).pin;

        for &e in self.graph.out_edges(vertex) {
            let edge = self.graph.edge(e);
            // Requireds do not propagate through latch D->Q.
            if edge.role == Role::LatchDToQ {
                continue;
            }
            if !(pred.search_to(self, edge.to) && pred.search_thru(self, None, e)) {
                continue;
            }
            let arc_set = self.graph.arc_set(edge.arc_set);
            for (slot, from_tag_id) in group.iter() {
                let from_tag = self.pools.tag(from_tag_id);
                if self.is_segment_start(pin) && !from_tag.is_segment_start {
                    continue;
                }
                if self.path_propagated_to_clk_src(pin, &from_tag) {
                    continue;
                }
                let ap = from_tag.ap;
                let min_max = self.ap_min_max(ap);
                let req_min = min_max.opposite();
                let from_arrival = self.arrivals(vertex)[slot];
                for arc in arc_set.arcs_from(from_tag.tr) {
                    let Some((to_tag, arc_delay, _)) = self.visit_from_path(
                        vertex,
                        from_tag_id,
                        &from_tag,
                        from_arrival,
                        e,
                        arc,
                        min_max,
                        ap,
                    ) else {
                        continue;
                    };
                    let to_required = match self.required_of(edge.to, to_tag) {
                        Some(required) => Some(required),
                        // The fanout tag may have been CRPR-pruned; fall
                        // back to a match ignoring the anchor.
                        None => self.required_of_no_crpr(edge.to, to_tag),
                    };
                    let Some(to_required) = to_required else {
                        continue;
                    };
                    let candidate = to_required - arc_delay;
                    if fuzzy_worse(candidate, requireds[slot], req_min) {
                        requireds[slot] = candidate;
                        have = true;
                    }
                }
            }
        }

        // Constraints at the endpoint itself also set required times.
        if self.is_endpoint(vertex) {
            self.seed_required_into(vertex, &mut requireds, &mut have);
        }

        let changed = self.requireds_changed(vertex, &requireds, have);
        Some(RequiredOutcome {
            requireds,
            have,
            changed,
        })
    }

    /// Required fallback for CRPR-pruned fanout tags.
    fn required_of_no_crpr(&self, vertex: VertexId, to_tag: TagId) -> Option<Delay> {
        let group = self.tag_group(vertex)?;
        let stripped = self.tag_no_crpr(to_tag);
        for (_, candidate) in group.iter() {
            if candidate != to_tag && self.tag_no_crpr(candidate) == stripped {
                if let Some(required) = self.required_of(vertex, candidate) {
                    return Some(required);
                }
            }
        }
        None
    }

    /// Folds the endpoint's path-end required times into the slots.
    pub(crate) fn seed_required_into(
        &self,
        vertex: VertexId,
        requireds: &mut [Delay],
        have: &mut bool,
    ) {
        let mut updates: Vec<(usize, Delay, MinMax)> = Vec::new();
        self.visit_path_ends(vertex, &mut |end| {
            if !end.is_unconstrained() {
                updates.push((end.slot, end.required, end.min_max.opposite()));
            }
        });
        for (slot, required, req_min) in updates {
            if slot < requireds.len() && fuzzy_worse(required, requireds[slot], req_min) {
                requireds[slot] = required;
                *have = true;
            }
        }
    }

    fn requireds_changed(&self, vertex: VertexId, requireds: &[Delay], have: bool) -> bool {
        match self.requireds(vertex) {
            None => have,
            Some(prev) => {
                if !have {
                    return true;
                }
                prev.len() != requireds.len()
                    || prev
                        .iter()
                        .zip(requireds.iter())
                        .any(|(&a, &b)| !fuzzy_equal(a, b))
            }
        }
    }

    /// Commits one required visit outcome and extends the worklist.
    pub(crate) fn commit_required(
        &mut self,
        iter: &mut BfsIterator,
        vertex: VertexId,
        outcome: RequiredOutcome,
    ) {
        self.store_requireds(vertex, &outcome);
        self.tns_invalid(vertex);
        if outcome.changed {
            self.enqueue_required_fanins(iter, vertex);
        }
    }

    pub(crate) fn store_requireds(&mut self, vertex: VertexId, outcome: &RequiredOutcome) {
        let slots = if outcome.have {
            Some(outcome.requireds.clone().into_boxed_slice())
        } else {
            None
        };
        self.set_vertex_requireds(vertex, slots);
    }

    /// Seeds an endpoint's requireds from its path ends; enqueues its
    /// fanins when they changed.
    pub(crate) fn seed_required(&mut self, vertex: VertexId) {
        log::trace!("required seed {vertex:?}");
        let Some(group) = self.tag_group(vertex) else {
            return;
        };
        let mut requireds: Vec<Delay> = group
            .iter()
            .map(|(_, tag)| self.required_init_value(self.pools.tag(tag).ap))
            .collect();
        let mut have = false;
        self.seed_required_into(vertex, &mut requireds, &mut have);
        let changed = self.requireds_changed(vertex, &requireds, have);
        let outcome = RequiredOutcome {
            requireds,
            have,
            changed,
        };
        self.store_requireds(vertex, &outcome);
        if changed {
            let mut iter = std::mem::take(&mut self.required_iter);
            self.enqueue_required_fanins(&mut iter, vertex);
            self.required_iter = iter;
        }
    }
}
