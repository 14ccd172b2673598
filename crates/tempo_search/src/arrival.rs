//! The forward (arrival) visitor.
//!
//! For each vertex in level order: merge every fanin path through every
//! matching timing arc into a tag-group builder, prune CRPR-dominated
//! arrivals, apply vertex-local seeds (internal input delays, internal
//! path-delay starts, unclocked register clocks), detect change against the
//! stored arrivals, and report the fanouts to enqueue.
//!
//! The visit itself is read-only over shared state (the interning pools are
//! internally synchronized), so a level's vertices run on parallel workers;
//! the commit back into the vertex slots happens sequentially in
//! `Search::commit_arrival`.

use crate::clk_info::PathRep;
use crate::pool::TagId;
use crate::pred::SearchPred;
use crate::search::Search;
use crate::tag::Tag;
use crate::tag_group::TagGroupBldr;
use rustc_hash::FxHashMap;
use tempo_common::{fuzzy_worse, Delay, MinMax};
use tempo_graph::{EdgeId, Role, TimingArc, VertexId};
use tempo_sdc::ApIndex;

/// The result of one parallel arrival visit, committed sequentially.
pub(crate) struct ArrivalOutcome {
    /// The merged arrivals for the vertex.
    pub bldr: TagGroupBldr,
    /// `true` if the arrivals differ from the stored ones beyond the fuzzy
    /// tolerance.
    pub changed: bool,
    /// `true` if the builder holds a clock tag.
    pub has_clk_tag: bool,
    /// Fanout vertices admitted by the search-adjacency predicate.
    pub fanouts: Vec<VertexId>,
    /// `true` if the vertex feeds a latch D→Q arc.
    pub is_latch_data: bool,
}

/// Shadow builder for CRPR pruning: best arrival per tag identity with the
/// CRPR anchor ignored.
type CrprShadow = FxHashMap<TagId, (TagId, Delay)>;

impl Search<'_> {
    /// Computes the merged arrivals of `vertex` from its fanin. Returns
    /// `None` for vertices the visitor must not touch (clock sources).
    pub(crate) fn arrival_visit(
        &self,
        vertex: VertexId,
        pred: SearchPred,
    ) -> Option<ArrivalOutcome> {
        let pin = self.graph.vertex(vertex).pin;
        // Don't clobber clock sources, unless the pin is an internal
        // path-delay endpoint whose propagated paths are re-seeded below.
        if self.sdc.is_vertex_pin_clock(pin) && !self.sdc.is_path_delay_to_pin(pin) {
            return None;
        }
        log::trace!("find arrivals {vertex:?}");

        let mut bldr = TagGroupBldr::new();
        let has_fanin_one = self.graph.has_fanin_one(vertex);
        let crpr_shadow_active = self.crpr_active() && !has_fanin_one;
        let mut shadow: CrprShadow = CrprShadow::default();

        for &e in self.graph.in_edges(vertex) {
            let edge = self.graph.edge(e);
            if pred.search_from(self, edge.from) && pred.search_thru(self, None, e) {
                self.visit_edge_arrivals(
                    e,
                    &mut bldr,
                    crpr_shadow_active.then_some(&mut shadow),
                );
            }
        }

        if crpr_shadow_active {
            self.prune_crpr_arrivals(&mut bldr, &shadow);
        }

        // Vertex-local seeds layered on top of the propagated arrivals.
        if !self.network.pin(pin).is_top_level_port && self.sdc.has_input_delay(pin) {
            // set_input_delay on an internal pin.
            self.seed_input_segment_arrival(pin, vertex, &mut bldr);
        }
        if self.sdc.is_path_delay_from_pin(pin) && !self.sdc.is_vertex_pin_clock(pin) {
            // set_min/max_delay -from an internal pin.
            self.make_unclked_paths(vertex, true, &mut bldr);
        }
        if self.sdc.is_path_delay_to_pin(pin) && self.sdc.is_vertex_pin_clock(pin) {
            // Internal path-delay endpoint that is also a clock source:
            // re-seed the clock arrivals on top of the propagated paths.
            self.seed_clk_arrivals(pin, vertex, &mut bldr);
        }
        let mut has_clk_tag = bldr
            .iter()
            .any(|(tag, _)| self.pools.tag(tag).is_clk);
        // Register clock pin not reached by any declared clock: seed with an
        // unclocked tag so paths from unclocked registers can be reported.
        if self.graph.vertex(vertex).is_reg_clk && !has_clk_tag {
            log::trace!("seed unclocked reg clk {vertex:?}");
            self.make_unclked_paths(vertex, true, &mut bldr);
        }
        has_clk_tag = has_clk_tag
            || bldr
                .iter()
                .any(|(tag, _)| self.pools.tag(tag).is_clk);

        let changed = self.arrivals_changed(vertex, &bldr);
        let fanouts = self.admitted_fanouts(vertex, SearchPred::search_thru_pred(), Some(&bldr));
        let is_latch_data = self
            .graph
            .out_edges(vertex)
            .iter()
            .any(|&e| self.graph.edge(e).role == Role::LatchDToQ);

        Some(ArrivalOutcome {
            bldr,
            changed,
            has_clk_tag,
            fanouts,
            is_latch_data,
        })
    }

    /// Merges every path at the edge's from-vertex across the edge's arcs
    /// into the builder.
    fn visit_edge_arrivals(
        &self,
        edge: EdgeId,
        bldr: &mut TagGroupBldr,
        mut shadow: Option<&mut CrprShadow>,
    ) {
        let e = self.graph.edge(edge);
        let from_vertex = e.from;
        let Some(from_group) = self.tag_group(from_vertex) else {
            return;
        };
        let from_pin = self.graph.vertex(from_vertex).pin;
        let arc_set = self.graph.arc_set(e.arc_set);
        for (slot, from_tag_id) in from_group.iter() {
            let from_tag = self.pools.tag(from_tag_id);
            // Only propagate seeded paths from a segment startpoint.
            if self.is_segment_start(from_pin) && !from_tag.is_segment_start {
                continue;
            }
            if self.path_propagated_to_clk_src(from_pin, &from_tag) {
                continue;
            }
            let ap = from_tag.ap;
            let min_max = self.ap_min_max(ap);
            let from_arrival = self.arrivals(from_vertex)[slot];
            for arc in arc_set.arcs_from(from_tag.tr) {
                let Some((to_tag, _arc_delay, to_arrival)) = self.visit_from_path(
                    from_vertex,
                    from_tag_id,
                    &from_tag,
                    from_arrival,
                    edge,
                    arc,
                    min_max,
                    ap,
                ) else {
                    continue;
                };
                let existing = bldr.arrival(to_tag);
                if existing.is_some_and(|cur| !fuzzy_worse(to_arrival, cur, min_max)) {
                    continue;
                }
                let to_tag_ref = self.pools.tag(to_tag);
                let to_info = self.pools.clk_info(to_tag_ref.clk_info);
                let prev = (to_tag_ref.is_clk || to_info.is_gen_clk_src_path).then_some(
                    PathRep {
                        vertex: from_vertex,
                        tag: from_tag_id,
                    },
                );
                bldr.set_arrival(to_tag, to_arrival, prev);
                if let Some(shadow) = shadow.as_deref_mut() {
                    if to_info.has_crpr_clk_path() && !to_tag_ref.is_clk {
                        let stripped = self.tag_no_crpr(to_tag);
                        match shadow.get(&stripped) {
                            Some(&(_, best)) if !fuzzy_worse(to_arrival, best, min_max) => {}
                            _ => {
                                shadow.insert(stripped, (to_tag, to_arrival));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Drops arrivals that a same-identity-sans-anchor arrival dominates by
    /// more than the maximum possible CRPR credit for the clock pair.
    fn prune_crpr_arrivals(&self, bldr: &mut TagGroupBldr, shadow: &CrprShadow) {
        let doomed: Vec<TagId> = bldr
            .iter()
            .filter_map(|(tag_id, entry)| {
                let tag = self.pools.tag(tag_id);
                if tag.is_clk {
                    return None;
                }
                let info = self.pools.clk_info(tag.clk_info);
                if !info.has_crpr_clk_path() {
                    return None;
                }
                let min_max = self.ap_min_max(tag.ap);
                let stripped = self.tag_no_crpr(tag_id);
                let &(best_tag, best_arrival) = shadow.get(&stripped)?;
                let best_info = self.pools.clk_info(self.pools.tag(best_tag).clk_info);
                let max_crpr = self.max_crpr(&best_info);
                let dominator = match min_max {
                    MinMax::Max => best_arrival - max_crpr,
                    MinMax::Min => best_arrival + max_crpr,
                };
                if fuzzy_worse(dominator, entry.arrival, min_max) {
                    log::trace!("crpr pruned tag {tag_id:?}");
                    Some(tag_id)
                } else {
                    None
                }
            })
            .collect();
        for tag in doomed {
            bldr.remove(tag);
        }
    }

    /// Derives the outgoing tag, arc delay, and arrival for one fanin path
    /// crossing one timing arc. This is the role dispatch shared by the
    /// arrival and required visitors.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn visit_from_path(
        &self,
        from_vertex: VertexId,
        from_tag_id: TagId,
        from_tag: &Tag,
        from_arrival: Delay,
        edge: EdgeId,
        arc: &TimingArc,
        min_max: MinMax,
        ap: ApIndex,
    ) -> Option<(TagId, Delay, Delay)> {
        let e = self.graph.edge(edge);
        let role = e.role;
        let from_pin = self.graph.vertex(e.from).pin;
        let to_tr = arc.to_tr;
        let from_info = self.pools.clk_info(from_tag.clk_info);
        let clk = from_info.clock();
        let from_path = PathRep {
            vertex: from_vertex,
            tag: from_tag_id,
        };

        if from_info.is_gen_clk_src_path {
            // Source paths stay inside the generated clock's fanin cone,
            // minus its latch feedback edges; leaving the tree (the PLL
            // feedback case) falls back to plain tag mutation.
            if self.sdc.clk_stop_propagation(from_pin)
                || matches!(role, Role::TristateEnable | Role::TristateDisable)
            {
                return None;
            }
            let gclk = from_info.gen_clk_src.and_then(|src| {
                self.sdc
                    .clocks()
                    .find(|c| c.gen_src_pin == Some(src) && c.is_generated)
                    .map(|c| c.id)
            });
            if let Some(gclk) = gclk {
                let in_cone = self
                    .genclks
                    .fanins(gclk)
                    .is_some_and(|cone| cone.contains(&e.to));
                let is_fdbk = self
                    .genclks
                    .latch_fdbk_edges(gclk)
                    .is_some_and(|edges| edges.contains(&edge));
                if in_cone && !is_fdbk {
                    let to_tag =
                        self.thru_clk_tag(from_path, from_tag_id, true, edge, to_tr, min_max, ap)?;
                    let arc_delay = self.derated_delay(arc, role, true, ap);
                    return Some((to_tag, arc_delay, from_arrival + arc_delay));
                }
                return None;
            }
            let to_tag = self.thru_tag(from_tag_id, edge, to_tr, min_max, ap)?;
            let arc_delay = self.derated_delay(arc, role, true, ap);
            return Some((to_tag, arc_delay, from_arrival + arc_delay));
        }

        if matches!(role, Role::RegClkToQ | Role::LatchEnToQ) {
            if clk.is_some() && self.sdc.clk_stop_propagation(from_pin) {
                return None;
            }
            // Launch from unclocked reg/latch clock pins (segment starts)
            // and from clocks that have not already passed through a
            // clock-to-output edge; never from the default arrival clock.
            let admit = (from_info.clk_edge.is_none() && from_tag.is_segment_start)
                || (from_tag.is_clk && clk != self.sdc.default_arrival_clock());
            if !admit {
                return None;
            }
            let arc_delay = self.derated_delay(arc, role, false, ap);
            let to_clk_info = if self.crpr_active() {
                self.clk_info_with_crpr_clk_path(from_tag.clk_info, from_path)
            } else {
                from_tag.clk_info
            };
            let launch_tag =
                self.from_reg_clk_tag(from_pin, from_tag.tr, clk, to_clk_info, to_tr, min_max, ap)?;
            let to_tag = self.thru_tag(launch_tag, edge, to_tr, min_max, ap)?;
            // Fold ideal insertion and latency the propagated arrival never
            // saw into the launch time.
            let launch_arrival = self.clk_path_arrival(from_path);
            return Some((to_tag, arc_delay, launch_arrival + arc_delay));
        }

        if role == Role::LatchDToQ {
            // Handled only in the max corner; requireds never cross D->Q.
            if min_max != MinMax::Max {
                return None;
            }
            let arc_delay = self.derated_delay(arc, role, false, ap);
            if let Some((borrow_tag, base)) =
                self.latch_out_arrival(from_vertex, from_tag_id, from_arrival, edge, to_tr, ap)
            {
                let to_tag = self.thru_tag(borrow_tag, edge, to_tr, min_max, ap)?;
                return Some((to_tag, arc_delay, base + arc_delay));
            }
            // Always-open latch: plain combinational propagation.
            let to_tag = self.thru_tag(from_tag_id, edge, to_tr, min_max, ap)?;
            return Some((to_tag, arc_delay, from_arrival + arc_delay));
        }

        if from_tag.is_clk {
            let to_pin = self.graph.vertex(e.to).pin;
            let to_propagates_clk = !self.sdc.clk_stop_propagation(to_pin)
                && !matches!(role, Role::TristateEnable | Role::TristateDisable);
            let arc_delay = self.derated_delay(arc, role, to_propagates_clk, ap);
            let to_tag = self.thru_clk_tag(
                from_path,
                from_tag_id,
                to_propagates_clk,
                edge,
                to_tr,
                min_max,
                ap,
            )?;
            return Some((to_tag, arc_delay, from_arrival + arc_delay));
        }

        let arc_delay = self.derated_delay(arc, role, false, ap);
        let to_tag = self.thru_tag(from_tag_id, edge, to_tr, min_max, ap)?;
        Some((to_tag, arc_delay, from_arrival + arc_delay))
    }
}
