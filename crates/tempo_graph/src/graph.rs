//! The levelized timing graph.
//!
//! Vertices are pins; edges carry a [`Role`] and a [`TimingArcSet`] with
//! pre-computed per-analysis-corner delays. The graph is built by an external
//! bridge from the placed netlist and delay calculator; the search core
//! traverses it read-only and keeps its own per-vertex path state.

use crate::ids::{ArcSetId, EdgeId, PinId, VertexId};
use crate::levelize::Level;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tempo_common::{Delay, MinMax, PerMinMax, RiseFall, TimingSense};

/// The semantic role of a timing graph edge.
///
/// Determines how the search treats the edge: wires and combinational arcs
/// propagate both clocks and data, register and latch arcs launch paths,
/// check arcs constrain endpoints and are never traversed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Role {
    /// Interconnect delay along a routed net.
    Wire,
    /// Combinational delay through a cell (input pin to output pin).
    Comb,
    /// Register clock-to-output launch arc.
    RegClkToQ,
    /// Latch enable-to-output launch arc.
    LatchEnToQ,
    /// Transparent-latch data-to-output arc; requires fixed-point evaluation.
    LatchDToQ,
    /// Tristate enable-to-output arc.
    TristateEnable,
    /// Tristate disable-to-output arc.
    TristateDisable,
    /// Setup check at a register data pin relative to its clock.
    Setup,
    /// Hold check at a register data pin relative to its clock.
    Hold,
    /// Recovery check at an asynchronous control pin.
    Recovery,
    /// Removal check at an asynchronous control pin.
    Removal,
}

impl Role {
    /// Returns `true` for check arcs (never traversed by the search).
    pub fn is_timing_check(self) -> bool {
        matches!(
            self,
            Role::Setup | Role::Hold | Role::Recovery | Role::Removal
        )
    }

    /// Returns `true` for wire edges.
    pub fn is_wire(self) -> bool {
        self == Role::Wire
    }

    /// Returns `true` for the max-corner checks (setup, recovery).
    pub fn is_max_check(self) -> bool {
        matches!(self, Role::Setup | Role::Recovery)
    }

    /// Returns `true` for arcs a clock propagates through without becoming
    /// data (wires and combinational arcs).
    pub fn propagates_clock(self) -> bool {
        matches!(self, Role::Wire | Role::Comb)
    }
}

/// A single timing arc: a (from-transition, to-transition) pair with
/// pre-computed delays per analysis corner.
///
/// For check arcs the "delay" is the check margin and `from_tr` is the
/// check's clock transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingArc {
    /// Transition at the edge's from-pin.
    pub from_tr: RiseFall,
    /// Transition at the edge's to-pin.
    pub to_tr: RiseFall,
    /// Delay (or check margin) per analysis corner.
    pub delays: Vec<PerMinMax<Delay>>,
}

/// The set of timing arcs carried by one edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingArcSet {
    /// The arcs in this set.
    pub arcs: Vec<TimingArc>,
    /// The unateness of this arc set.
    pub sense: TimingSense,
}

impl TimingArcSet {
    /// Builds a unate arc set with the same delay on both transitions.
    pub fn unate(sense: TimingSense, delay: PerMinMax<Delay>, corner_count: usize) -> Self {
        let arcs = RiseFall::BOTH
            .iter()
            .filter_map(|&from_tr| {
                sense.to_transition(from_tr).map(|to_tr| TimingArc {
                    from_tr,
                    to_tr,
                    delays: vec![delay; corner_count],
                })
            })
            .collect();
        Self { arcs, sense }
    }

    /// Builds an arc set with a single arc.
    pub fn single(
        from_tr: RiseFall,
        to_tr: RiseFall,
        delay: PerMinMax<Delay>,
        corner_count: usize,
    ) -> Self {
        let sense = if from_tr == to_tr {
            TimingSense::PositiveUnate
        } else {
            TimingSense::NegativeUnate
        };
        Self {
            arcs: vec![TimingArc {
                from_tr,
                to_tr,
                delays: vec![delay; corner_count],
            }],
            sense,
        }
    }

    /// Iterates over the arcs launched by `from_tr`.
    pub fn arcs_from(&self, from_tr: RiseFall) -> impl Iterator<Item = &TimingArc> {
        self.arcs.iter().filter(move |arc| arc.from_tr == from_tr)
    }
}

/// A vertex in the timing graph.
///
/// The search core's mutable per-vertex slots (tag group index, arrival
/// array, previous-path refs) live in the search state, not here; the graph
/// stays read-only during a search pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vertex {
    /// The unique ID of this vertex.
    pub id: VertexId,
    /// The pin this vertex times.
    pub pin: PinId,
    /// Topological level assigned by the levelizer.
    pub level: Level,
    /// `true` if this is a register or latch clock pin.
    pub is_reg_clk: bool,
    /// `true` if this is the driver vertex of a bidirectional port.
    pub is_bidirect_driver: bool,
    pub(crate) in_edges: Vec<EdgeId>,
    pub(crate) out_edges: Vec<EdgeId>,
}

/// A directed edge in the timing graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    /// The unique ID of this edge.
    pub id: EdgeId,
    /// The source vertex.
    pub from: VertexId,
    /// The destination vertex.
    pub to: VertexId,
    /// The semantic role of this edge.
    pub role: Role,
    /// The timing arcs carried by this edge.
    pub arc_set: ArcSetId,
    /// `true` if the user disabled this edge (`set_disable_timing`).
    pub is_disabled: bool,
    /// `true` if the levelizer broke a combinational loop at this edge.
    pub is_disabled_loop: bool,
}

/// The timing graph: vertices, edges, and arc sets.
///
/// Entities are appended during construction and never removed, so the ID
/// newtypes index the vectors directly; adjacency lives on the vertices as
/// edge-ID lists filled in by [`add_edge`](Self::add_edge).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    arc_sets: Vec<TimingArcSet>,
    pin_vertex: FxHashMap<PinId, VertexId>,
    pin_bidirect_drvr: FxHashMap<PinId, VertexId>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex for `pin` and returns its ID.
    pub fn add_vertex(&mut self, pin: PinId) -> VertexId {
        self.add_vertex_full(pin, false, false)
    }

    /// Adds a register/latch clock pin vertex.
    pub fn add_reg_clk_vertex(&mut self, pin: PinId) -> VertexId {
        self.add_vertex_full(pin, true, false)
    }

    /// Adds a vertex with explicit flags.
    pub fn add_vertex_full(
        &mut self,
        pin: PinId,
        is_reg_clk: bool,
        is_bidirect_driver: bool,
    ) -> VertexId {
        let id = VertexId::from_raw(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            id,
            pin,
            level: 0,
            is_reg_clk,
            is_bidirect_driver,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        });
        if is_bidirect_driver {
            self.pin_bidirect_drvr.insert(pin, id);
        } else {
            self.pin_vertex.insert(pin, id);
        }
        id
    }

    /// Registers an arc set and returns its ID.
    pub fn add_arc_set(&mut self, arc_set: TimingArcSet) -> ArcSetId {
        let id = ArcSetId::from_raw(self.arc_sets.len() as u32);
        self.arc_sets.push(arc_set);
        id
    }

    /// Adds a directed edge, wiring it into both endpoints' adjacency
    /// lists, and returns its ID.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        role: Role,
        arc_set: ArcSetId,
    ) -> EdgeId {
        let id = EdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            from,
            to,
            role,
            arc_set,
            is_disabled: false,
            is_disabled_loop: false,
        });
        self.vertices[from.index()].out_edges.push(id);
        self.vertices[to.index()].in_edges.push(id);
        id
    }

    /// Returns the vertex with the given ID.
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Returns a mutable reference to the vertex with the given ID.
    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.index()]
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Returns a mutable reference to the edge with the given ID.
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.index()]
    }

    /// Returns the arc set with the given ID.
    pub fn arc_set(&self, id: ArcSetId) -> &TimingArcSet {
        &self.arc_sets[id.index()]
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.vertices.len() as u32).map(VertexId::from_raw)
    }

    /// Returns the fanin edges of `vertex`.
    pub fn in_edges(&self, vertex: VertexId) -> &[EdgeId] {
        &self.vertices[vertex.index()].in_edges
    }

    /// Returns the fanout edges of `vertex`.
    pub fn out_edges(&self, vertex: VertexId) -> &[EdgeId] {
        &self.vertices[vertex.index()].out_edges
    }

    /// Returns the load vertex for `pin`, if one exists.
    pub fn pin_vertex(&self, pin: PinId) -> Option<VertexId> {
        self.pin_vertex.get(&pin).copied()
    }

    /// Returns the bidirect driver vertex for `pin`, if one exists.
    pub fn pin_bidirect_drvr_vertex(&self, pin: PinId) -> Option<VertexId> {
        self.pin_bidirect_drvr.get(&pin).copied()
    }

    /// Returns `true` if `vertex` has exactly one non-check fanin edge.
    /// Single-fanin vertices skip the CRPR shadow builder.
    pub fn has_fanin_one(&self, vertex: VertexId) -> bool {
        self.vertices[vertex.index()]
            .in_edges
            .iter()
            .filter(|&&e| !self.edge(e).role.is_timing_check())
            .count()
            == 1
    }

    /// Returns the pre-computed delay of `arc` at the given corner and
    /// analysis direction.
    pub fn arc_delay(&self, arc: &TimingArc, corner: usize, min_max: MinMax) -> Delay {
        arc.delays[corner].get(min_max)
    }

    /// Returns the register/latch clock pin vertices.
    pub fn reg_clk_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .filter(|v| v.is_reg_clk)
            .map(|v| v.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_common::Interner;

    fn two_vertex_graph() -> (Graph, VertexId, VertexId) {
        let interner = Interner::new();
        let mut net = crate::network::Network::new();
        let a = net.add_pin(interner.get_or_intern("a"), crate::network::PortDirection::Input);
        let b = net.add_pin(
            interner.get_or_intern("b"),
            crate::network::PortDirection::Output,
        );
        let mut g = Graph::new();
        let va = g.add_vertex(a);
        let vb = g.add_vertex(b);
        (g, va, vb)
    }

    #[test]
    fn add_vertices_and_edges() {
        let (mut g, va, vb) = two_vertex_graph();
        let arcs = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(1.5),
            1,
        ));
        let e = g.add_edge(va, vb, Role::Comb, arcs);
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge(e).from, va);
        assert_eq!(g.out_edges(va), &[e]);
        assert_eq!(g.in_edges(vb), &[e]);
    }

    #[test]
    fn unate_arc_sets() {
        let pos = TimingArcSet::unate(TimingSense::PositiveUnate, PerMinMax::both(1.0), 1);
        assert_eq!(pos.arcs.len(), 2);
        assert!(pos.arcs.iter().all(|a| a.from_tr == a.to_tr));

        let neg = TimingArcSet::unate(TimingSense::NegativeUnate, PerMinMax::both(1.0), 1);
        assert!(neg.arcs.iter().all(|a| a.from_tr == a.to_tr.opposite()));

        let non = TimingArcSet::unate(TimingSense::NonUnate, PerMinMax::both(1.0), 1);
        assert!(non.arcs.is_empty());
    }

    #[test]
    fn arcs_from_filters_by_transition() {
        let set = TimingArcSet::unate(TimingSense::PositiveUnate, PerMinMax::both(1.0), 1);
        let rises: Vec<_> = set.arcs_from(RiseFall::Rise).collect();
        assert_eq!(rises.len(), 1);
        assert_eq!(rises[0].to_tr, RiseFall::Rise);
    }

    #[test]
    fn arc_delay_by_corner_and_min_max() {
        let mut g = Graph::new();
        let _id = g.add_arc_set(TimingArcSet::single(
            RiseFall::Rise,
            RiseFall::Rise,
            PerMinMax::new(0.5, 1.0),
            2,
        ));
        let set = g.arc_set(ArcSetId::from_raw(0));
        let arc = &set.arcs[0];
        assert_eq!(g.arc_delay(arc, 0, MinMax::Min), 0.5);
        assert_eq!(g.arc_delay(arc, 1, MinMax::Max), 1.0);
    }

    #[test]
    fn fanin_one() {
        let (mut g, va, vb) = two_vertex_graph();
        let arcs = g.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(1.0),
            1,
        ));
        g.add_edge(va, vb, Role::Wire, arcs);
        assert!(g.has_fanin_one(vb));
        assert!(!g.has_fanin_one(va));
    }

    #[test]
    fn check_roles() {
        assert!(Role::Setup.is_timing_check());
        assert!(Role::Hold.is_timing_check());
        assert!(Role::Recovery.is_max_check());
        assert!(!Role::Comb.is_timing_check());
        assert!(Role::Wire.propagates_clock());
        assert!(!Role::RegClkToQ.propagates_clock());
    }

    #[test]
    fn reg_clk_vertices_iteration() {
        let interner = Interner::new();
        let mut net = crate::network::Network::new();
        let p = net.add_pin(
            interner.get_or_intern("ff/CK"),
            crate::network::PortDirection::Input,
        );
        let mut g = Graph::new();
        let v = g.add_reg_clk_vertex(p);
        assert_eq!(g.reg_clk_vertices().collect::<Vec<_>>(), vec![v]);
    }
}
