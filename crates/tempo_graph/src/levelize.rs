//! Topological levelization of the timing graph.
//!
//! Assigns each vertex a level such that every non-check, enabled edge goes
//! from a lower level to a higher one. Combinational cycles that survive
//! (latch feedback, gated clock loops) are broken by marking one in-cycle
//! edge `is_disabled_loop`; the search decides dynamically whether to
//! traverse broken edges.

use crate::graph::Graph;
use crate::ids::{EdgeId, VertexId};
use rustc_hash::FxHashSet;

/// A topological level in the timing graph.
pub type Level = u32;

/// Levelization result: levels are written onto the graph's vertices, the
/// levelizer keeps the roots and the maximum level.
#[derive(Debug)]
pub struct Levelize {
    max_level: Level,
    roots: Vec<VertexId>,
    root_set: FxHashSet<VertexId>,
    broken_loop_edges: Vec<EdgeId>,
}

impl Levelize {
    /// Levelizes `graph`, writing vertex levels and marking loop-breaking
    /// edges.
    pub fn new(graph: &mut Graph) -> Self {
        let n = graph.vertex_count();
        let mut broken_loop_edges = Vec::new();

        // Kahn's algorithm; re-run after each loop break until acyclic.
        loop {
            let mut indegree = vec![0u32; n];
            for v in graph.vertex_ids() {
                for &e in graph.in_edges(v) {
                    if Self::level_edge(graph, e) {
                        indegree[v.as_raw() as usize] += 1;
                    }
                }
            }

            let mut ready: Vec<VertexId> = graph
                .vertex_ids()
                .filter(|v| indegree[v.as_raw() as usize] == 0)
                .collect();
            let mut levels = vec![0 as Level; n];
            let mut placed = 0usize;
            while let Some(v) = ready.pop() {
                placed += 1;
                let v_level = levels[v.as_raw() as usize];
                for &e in graph.out_edges(v) {
                    if !Self::level_edge(graph, e) {
                        continue;
                    }
                    let to = graph.edge(e).to;
                    let to_idx = to.as_raw() as usize;
                    levels[to_idx] = levels[to_idx].max(v_level + 1);
                    indegree[to_idx] -= 1;
                    if indegree[to_idx] == 0 {
                        ready.push(to);
                    }
                }
            }

            if placed == n {
                let mut max_level = 0;
                for v in graph.vertex_ids() {
                    let level = levels[v.as_raw() as usize];
                    graph.vertex_mut(v).level = level;
                    max_level = max_level.max(level);
                }
                let roots: Vec<VertexId> = graph
                    .vertex_ids()
                    .filter(|&v| {
                        graph
                            .in_edges(v)
                            .iter()
                            .all(|&e| !Self::level_edge(graph, e))
                    })
                    .collect();
                let root_set = roots.iter().copied().collect();
                return Self {
                    max_level,
                    roots,
                    root_set,
                    broken_loop_edges,
                };
            }

            // A cycle remains: every unplaced vertex still has indegree > 0.
            // Break it at the first in-cycle edge found and retry.
            let in_cycle: FxHashSet<VertexId> = graph
                .vertex_ids()
                .filter(|v| indegree[v.as_raw() as usize] > 0)
                .collect();
            let break_edge = graph
                .vertex_ids()
                .filter(|v| in_cycle.contains(v))
                .flat_map(|v| graph.in_edges(v).iter().copied())
                .find(|&e| {
                    Self::level_edge(graph, e) && in_cycle.contains(&graph.edge(e).from)
                });
            match break_edge {
                Some(e) => {
                    graph.edge_mut(e).is_disabled_loop = true;
                    broken_loop_edges.push(e);
                }
                // Unreachable for a well-formed graph; bail rather than spin.
                None => {
                    let roots: Vec<VertexId> = graph.vertex_ids().collect();
                    let root_set = roots.iter().copied().collect();
                    return Self {
                        max_level: 0,
                        roots,
                        root_set,
                        broken_loop_edges,
                    };
                }
            }
        }
    }

    fn level_edge(graph: &Graph, edge: EdgeId) -> bool {
        let e = graph.edge(edge);
        !e.is_disabled && !e.is_disabled_loop && !e.role.is_timing_check()
    }

    /// Returns the maximum level in the graph.
    pub fn max_level(&self) -> Level {
        self.max_level
    }

    /// Returns the root vertices (no enabled non-check fanin).
    pub fn roots(&self) -> &[VertexId] {
        &self.roots
    }

    /// Returns `true` if `vertex` is a root.
    pub fn is_root(&self, vertex: VertexId) -> bool {
        self.root_set.contains(&vertex)
    }

    /// Returns the edges marked `is_disabled_loop` during levelization.
    pub fn broken_loop_edges(&self) -> &[EdgeId] {
        &self.broken_loop_edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Role, TimingArcSet};
    use crate::network::{Network, PortDirection};
    use tempo_common::{Interner, PerMinMax, TimingSense};

    fn chain(n: usize) -> (Graph, Vec<VertexId>) {
        let interner = Interner::new();
        let mut net = Network::new();
        let mut g = Graph::new();
        let arcs = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(1.0),
            1,
        ));
        let vs: Vec<VertexId> = (0..n)
            .map(|i| {
                let p = net.add_pin(
                    interner.get_or_intern(&format!("p{i}")),
                    PortDirection::Input,
                );
                g.add_vertex(p)
            })
            .collect();
        for w in vs.windows(2) {
            g.add_edge(w[0], w[1], Role::Comb, arcs);
        }
        (g, vs)
    }

    #[test]
    fn chain_levels() {
        let (mut g, vs) = chain(4);
        let lev = Levelize::new(&mut g);
        assert_eq!(lev.max_level(), 3);
        for (i, &v) in vs.iter().enumerate() {
            assert_eq!(g.vertex(v).level, i as Level);
        }
        assert_eq!(lev.roots(), &[vs[0]]);
        assert!(lev.is_root(vs[0]));
        assert!(!lev.is_root(vs[1]));
    }

    #[test]
    fn diamond_takes_longest_level() {
        let (mut g, vs) = chain(2);
        let arcs = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(1.0),
            1,
        ));
        // vs[0] -> vs[1] exists; add vs[0] -> mid -> vs[1].
        let interner = Interner::new();
        let mut net = Network::new();
        let p = net.add_pin(interner.get_or_intern("mid"), PortDirection::Input);
        let mid = g.add_vertex(p);
        g.add_edge(vs[0], mid, Role::Comb, arcs);
        g.add_edge(mid, vs[1], Role::Comb, arcs);
        let lev = Levelize::new(&mut g);
        assert_eq!(g.vertex(vs[1]).level, 2);
        assert_eq!(lev.max_level(), 2);
    }

    #[test]
    fn cycle_is_broken() {
        let (mut g, vs) = chain(3);
        let arcs = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(1.0),
            1,
        ));
        // Close a cycle back to the head.
        g.add_edge(vs[2], vs[0], Role::Comb, arcs);
        let lev = Levelize::new(&mut g);
        assert_eq!(lev.broken_loop_edges().len(), 1);
        let broken = lev.broken_loop_edges()[0];
        assert!(g.edge(broken).is_disabled_loop);
        // Levels are still consistent along remaining edges.
        assert_eq!(lev.max_level(), 2);
    }

    #[test]
    fn check_edges_do_not_level() {
        let (mut g, vs) = chain(2);
        let margins = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(0.1),
            1,
        ));
        // A check edge back from vs[1] to vs[0] must not create a cycle.
        g.add_edge(vs[1], vs[0], Role::Setup, margins);
        let lev = Levelize::new(&mut g);
        assert!(lev.broken_loop_edges().is_empty());
        assert_eq!(g.vertex(vs[1]).level, 1);
    }
}
