//! Generated-clock source analysis.
//!
//! For every generated clock the engine records the fanin cone from its
//! master clock sources to the generated source pin, the latch feedback
//! edges inside that cone (excluded when tracing source paths), and the
//! insertion delay of the generated clock: the master's source latency plus
//! the tree delay from the master source to the generated source pin, per
//! analysis point.

use crate::clk_info::ClkInfo;
use rustc_hash::{FxHashMap, FxHashSet};
use tempo_common::{fuzzy_worse, Delay, RiseFall};
use tempo_graph::{EdgeId, Graph, PinId, Role, VertexId};
use tempo_sdc::{ApIndex, ClockEdge, ClockId, Sdc};

/// A gen-clk source-path seed produced for a master clock source vertex.
pub(crate) struct GenClkSrcSeed {
    pub tr: RiseFall,
    pub ap: ApIndex,
    pub clk_info: ClkInfo,
    pub arrival: Delay,
}

/// Generated-clock bookkeeping: cones, feedback edges, insertion delays.
#[derive(Default)]
pub struct Genclks {
    insertions: FxHashMap<(ClockId, ApIndex), Delay>,
    fanins: FxHashMap<ClockId, FxHashSet<VertexId>>,
    fdbk_edges: FxHashMap<ClockId, FxHashSet<EdgeId>>,
    valid: bool,
}

impl Genclks {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all computed state.
    pub fn clear(&mut self) {
        self.insertions.clear();
        self.fanins.clear();
        self.fdbk_edges.clear();
        self.valid = false;
    }

    /// Returns the fanin cone of a generated clock, if computed.
    pub fn fanins(&self, clk: ClockId) -> Option<&FxHashSet<VertexId>> {
        self.fanins.get(&clk)
    }

    /// Returns the latch feedback edges inside a generated clock's cone.
    pub fn latch_fdbk_edges(&self, clk: ClockId) -> Option<&FxHashSet<EdgeId>> {
        self.fdbk_edges.get(&clk)
    }

    /// Returns `true` if an insertion delay was computed for `clk`.
    pub fn has_insertion(&self, clk: ClockId) -> bool {
        self.insertions.keys().any(|(c, _)| *c == clk)
    }

    /// Returns the insertion delay of a generated clock at an analysis
    /// point.
    pub fn insertion_delay(&self, clk: ClockId, ap: ApIndex) -> Delay {
        self.insertions.get(&(clk, ap)).copied().unwrap_or(0.0)
    }

    /// Computes cones, feedback edges, and insertion delays for every
    /// generated clock with a master.
    pub fn ensure_insertion_delays(&mut self, graph: &Graph, sdc: &Sdc) {
        if self.valid {
            return;
        }
        let gen_clks: Vec<(ClockId, ClockId, PinId)> = sdc
            .clocks()
            .filter_map(|c| Some((c.id, c.master?, c.gen_src_pin?)))
            .collect();
        for (clk, master, src_pin) in gen_clks {
            let Some(src_vertex) = graph.pin_vertex(src_pin) else {
                continue;
            };
            let cone = self.find_cone(graph, src_vertex);
            let fdbk: FxHashSet<EdgeId> = graph
                .vertex_ids()
                .flat_map(|v| graph.out_edges(v).iter().copied())
                .filter(|&e| {
                    let edge = graph.edge(e);
                    edge.role == Role::LatchDToQ
                        && cone.contains(&edge.from)
                        && cone.contains(&edge.to)
                })
                .collect();
            self.relax_insertions(graph, sdc, clk, master, src_vertex, &cone, &fdbk);
            self.fanins.insert(clk, cone);
            self.fdbk_edges.insert(clk, fdbk);
        }
        self.valid = true;
    }

    fn find_cone(&self, graph: &Graph, src_vertex: VertexId) -> FxHashSet<VertexId> {
        let mut cone = FxHashSet::default();
        let mut stack = vec![src_vertex];
        cone.insert(src_vertex);
        while let Some(v) = stack.pop() {
            for &e in graph.in_edges(v) {
                let edge = graph.edge(e);
                if edge.is_disabled || edge.role.is_timing_check() {
                    continue;
                }
                if cone.insert(edge.from) {
                    stack.push(edge.from);
                }
            }
        }
        cone
    }

    #[allow(clippy::too_many_arguments)]
    fn relax_insertions(
        &mut self,
        graph: &Graph,
        sdc: &Sdc,
        clk: ClockId,
        master: ClockId,
        src_vertex: VertexId,
        cone: &FxHashSet<VertexId>,
        fdbk: &FxHashSet<EdgeId>,
    ) {
        let master_clock = sdc.clock(master);
        let master_srcs: Vec<VertexId> = master_clock
            .src_pins
            .iter()
            .filter_map(|&p| graph.pin_vertex(p))
            .filter(|v| cone.contains(v))
            .collect();
        if master_srcs.is_empty() {
            return;
        }
        let mut by_level: Vec<VertexId> = cone.iter().copied().collect();
        by_level.sort_by_key(|&v| graph.vertex(v).level);

        for ap in sdc.corners().ap_indices() {
            let min_max = sdc.corners().ap(ap).min_max;
            let corner = sdc.corners().ap(ap).corner.as_raw() as usize;
            let mut dist: FxHashMap<VertexId, Delay> = FxHashMap::default();
            for &mv in &master_srcs {
                dist.insert(mv, 0.0);
            }
            for &v in &by_level {
                let Some(&d) = dist.get(&v) else { continue };
                for &e in graph.out_edges(v) {
                    let edge = graph.edge(e);
                    if edge.is_disabled
                        || edge.role.is_timing_check()
                        || edge.is_disabled_loop
                        || fdbk.contains(&e)
                        || !cone.contains(&edge.to)
                    {
                        continue;
                    }
                    for arc in &graph.arc_set(edge.arc_set).arcs {
                        let cand = d + graph.arc_delay(arc, corner, min_max);
                        match dist.get(&edge.to) {
                            Some(&cur) if !fuzzy_worse(cand, cur, min_max) => {}
                            _ => {
                                dist.insert(edge.to, cand);
                            }
                        }
                    }
                }
            }
            if let Some(&tree_delay) = dist.get(&src_vertex) {
                let insertion = master_clock.insertion(min_max) + tree_delay;
                self.insertions.insert((clk, ap), insertion);
            }
        }
    }

    /// Source-path seeds for a master clock source vertex inside some
    /// generated clock's cone: one gen-clk-src tag per master edge and
    /// analysis point, used to trace the source path through the cone.
    pub(crate) fn gen_clk_src_seeds(
        &self,
        sdc: &Sdc,
        vertex: VertexId,
        pin: PinId,
    ) -> Vec<GenClkSrcSeed> {
        let mut seeds = Vec::new();
        for clock in sdc.clocks() {
            let (Some(master), Some(gen_src)) = (clock.master, clock.gen_src_pin) else {
                continue;
            };
            let in_cone = self
                .fanins
                .get(&clock.id)
                .is_some_and(|cone| cone.contains(&vertex));
            let master_clock = sdc.clock(master);
            if !in_cone || !master_clock.src_pins.contains(&pin) {
                continue;
            }
            for ap in sdc.corners().ap_indices() {
                let min_max = sdc.corners().ap(ap).min_max;
                for tr in RiseFall::BOTH {
                    let insertion = master_clock.insertion(min_max);
                    seeds.push(GenClkSrcSeed {
                        tr,
                        ap,
                        clk_info: ClkInfo {
                            clk_edge: Some(ClockEdge::new(master, tr)),
                            clk_src: Some(pin),
                            is_propagated: master_clock.is_propagated,
                            gen_clk_src: Some(gen_src),
                            is_gen_clk_src_path: true,
                            pulse_clk_sense: None,
                            insertion,
                            latency: 0.0,
                            uncertainty: None,
                            ap,
                            crpr_clk_path: None,
                        },
                        arrival: master_clock.edge_time(tr) + insertion,
                    });
                }
            }
        }
        seeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_common::{Interner, PerMinMax, TimingSense};
    use tempo_graph::{Network, PortDirection, TimingArcSet};
    use tempo_sdc::Corners;

    /// clk port -> buf -> div/CK (reg clk); div/Q is the gclk source,
    /// driven by a clk-to-Q arc.
    fn divider_fixture() -> (Graph, Network, Sdc, VertexId) {
        let interner = Interner::new();
        let mut net = Network::new();
        let mut g = Graph::new();
        let clk_pin = net.add_port(interner.get_or_intern("clk"), PortDirection::Input);
        let buf_pin = net.add_pin(interner.get_or_intern("buf/Y"), PortDirection::Output);
        let ck_pin = net.add_pin(interner.get_or_intern("div/CK"), PortDirection::Input);
        let q_pin = net.add_pin(interner.get_or_intern("div/Q"), PortDirection::Output);
        let v_clk = g.add_vertex(clk_pin);
        let v_buf = g.add_vertex(buf_pin);
        let v_ck = g.add_reg_clk_vertex(ck_pin);
        let v_q = g.add_vertex(q_pin);
        let wire = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::new(0.8, 1.0),
            1,
        ));
        let clk_q = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::new(0.4, 0.5),
            1,
        ));
        g.add_edge(v_clk, v_buf, Role::Comb, wire);
        g.add_edge(v_buf, v_ck, Role::Wire, wire);
        g.add_edge(v_ck, v_q, Role::RegClkToQ, clk_q);
        tempo_graph::Levelize::new(&mut g);

        let mut sdc = Sdc::new(Corners::single());
        let master = sdc.create_clock(interner.get_or_intern("clk"), 10.0, None, &[clk_pin]);
        sdc.set_propagated_clock(master);
        sdc.create_generated_clock(interner.get_or_intern("gclk"), master, 2, q_pin);
        (g, net, sdc, v_clk)
    }

    #[test]
    fn insertion_covers_master_tree_and_clk_to_q() {
        let (g, _net, sdc, _v_clk) = divider_fixture();
        let mut genclks = Genclks::new();
        genclks.ensure_insertion_delays(&g, &sdc);
        let gclk = sdc.clocks().find(|c| c.is_generated).unwrap().id;
        assert!(genclks.has_insertion(gclk));
        let max_ap = sdc
            .corners()
            .ap_index(tempo_sdc::CornerId::from_raw(0), tempo_common::MinMax::Max);
        let min_ap = sdc
            .corners()
            .ap_index(tempo_sdc::CornerId::from_raw(0), tempo_common::MinMax::Min);
        // clk -> buf (1.0) -> div/CK (1.0) -> div/Q (0.5) at max.
        assert!((genclks.insertion_delay(gclk, max_ap) - 2.5).abs() < 1e-9);
        assert!((genclks.insertion_delay(gclk, min_ap) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn cone_contains_master_source() {
        let (g, _net, sdc, v_clk) = divider_fixture();
        let mut genclks = Genclks::new();
        genclks.ensure_insertion_delays(&g, &sdc);
        let gclk = sdc.clocks().find(|c| c.is_generated).unwrap().id;
        assert!(genclks.fanins(gclk).unwrap().contains(&v_clk));
    }

    #[test]
    fn src_seeds_only_inside_cone() {
        let (g, _net, sdc, v_clk) = divider_fixture();
        let mut genclks = Genclks::new();
        genclks.ensure_insertion_delays(&g, &sdc);
        let pin = g.vertex(v_clk).pin;
        let seeds = genclks.gen_clk_src_seeds(&sdc, v_clk, pin);
        // Two transitions x two analysis points.
        assert_eq!(seeds.len(), 4);
        assert!(seeds.iter().all(|s| s.clk_info.is_gen_clk_src_path));
    }

    #[test]
    fn clear_resets() {
        let (g, _net, sdc, _) = divider_fixture();
        let mut genclks = Genclks::new();
        genclks.ensure_insertion_delays(&g, &sdc);
        genclks.clear();
        let gclk = sdc.clocks().find(|c| c.is_generated).unwrap().id;
        assert!(!genclks.has_insertion(gclk));
    }
}
