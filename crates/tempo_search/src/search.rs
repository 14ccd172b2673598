//! The search owner: pools, per-vertex path state, worklists, seeding, and
//! the arrival/required pass drivers.
//!
//! All mutable search state lives here, grouped into one object with
//! explicit [`clear`](Search::clear) semantics. The graph, network, and
//! constraints are borrowed read-only; the search keeps its own per-vertex
//! slots (tag group index, arrival array, previous-path refs, requireds).

use crate::arrival::ArrivalOutcome;
use crate::bfs::{BfsDir, BfsIterator};
use crate::clk_info::{ClkInfo, PathRep};
use crate::genclks::Genclks;
use crate::pool::{Pools, TagGroupId, TagId};
use crate::pred::SearchPred;
use crate::slack::{Tns, WorstSlacks};
use crate::tag::Tag;
use crate::tag_group::{TagGroup, TagGroupBldr};
use rustc_hash::FxHashSet;
use std::sync::{Arc, Mutex};
use tempo_common::{delay_init_value, fuzzy_equal, Delay, EarlyLate, MinMax, RiseFall};
use tempo_graph::{Graph, Level, Levelize, Network, PinId, Role, VertexId};
use tempo_sdc::{
    ApIndex, ClockEdge, ClockId, ExceptionFrom, ExceptionId, ExceptionPath, ExceptionState,
    ExceptionTo, InputDelay, InputDelayId, Sdc,
};

/// The exception ID reserved for the path-end filter; it lives on the search
/// rather than in the SDC and is deleted when the filter pass completes.
pub(crate) const FILTER_EXCEPTION_ID: ExceptionId = ExceptionId::from_raw(u32::MAX);

/// Per-vertex path slots owned by the search.
#[derive(Default)]
pub(crate) struct VertexPaths {
    pub tag_group: Option<TagGroupId>,
    pub arrivals: Box<[Delay]>,
    pub prev_paths: Option<Box<[Option<PathRep>]>>,
    pub requireds: Option<Box<[Delay]>>,
}

/// Latch fixed-point pass bound; overruns are logged and stopped.
pub(crate) const LATCH_PASS_BOUND: usize = 16;

/// Level population below which a level is visited serially.
pub(crate) const PARALLEL_THRESHOLD: usize = 32;

/// The timing search core.
pub struct Search<'a> {
    pub(crate) graph: &'a Graph,
    pub(crate) network: &'a Network,
    pub(crate) sdc: &'a Sdc,
    pub(crate) levelize: &'a Levelize,
    pub(crate) pools: Pools,
    pub(crate) genclks: Genclks,
    vertex_paths: Vec<VertexPaths>,
    pub(crate) arrival_iter: BfsIterator,
    pub(crate) required_iter: BfsIterator,
    pub(crate) invalid_arrivals: Mutex<FxHashSet<VertexId>>,
    pub(crate) invalid_requireds: Mutex<FxHashSet<VertexId>>,
    pub(crate) invalid_tns: Mutex<FxHashSet<VertexId>>,
    pub(crate) pending_latch_outputs: Mutex<FxHashSet<VertexId>>,
    pub(crate) endpoints: Option<FxHashSet<VertexId>>,
    pub(crate) invalid_endpoints: FxHashSet<VertexId>,
    pub(crate) tns: Option<Tns>,
    pub(crate) worst_slacks: Option<WorstSlacks>,
    pub(crate) filter: Option<ExceptionPath>,
    pub(crate) filter_from: Option<ExceptionFrom>,
    pub(crate) filter_to: Option<ExceptionTo>,
    pub(crate) report_unconstrained_paths: bool,
    pub(crate) always_to_endpoints: bool,
    arrivals_exist: bool,
    arrivals_seeded: bool,
    arrivals_at_endpoints_exist: bool,
    clk_arrivals_valid: bool,
    requireds_exist: bool,
    requireds_seeded: bool,
}

impl<'a> Search<'a> {
    /// Creates a search over a levelized graph and its constraints.
    pub fn new(
        graph: &'a Graph,
        network: &'a Network,
        sdc: &'a Sdc,
        levelize: &'a Levelize,
    ) -> Self {
        let mut vertex_paths = Vec::with_capacity(graph.vertex_count());
        vertex_paths.resize_with(graph.vertex_count(), VertexPaths::default);
        Self {
            graph,
            network,
            sdc,
            levelize,
            pools: Pools::new(),
            genclks: Genclks::new(),
            vertex_paths,
            arrival_iter: BfsIterator::new(BfsDir::Fwd),
            required_iter: BfsIterator::new(BfsDir::Bkwd),
            invalid_arrivals: Mutex::new(FxHashSet::default()),
            invalid_requireds: Mutex::new(FxHashSet::default()),
            invalid_tns: Mutex::new(FxHashSet::default()),
            pending_latch_outputs: Mutex::new(FxHashSet::default()),
            endpoints: None,
            invalid_endpoints: FxHashSet::default(),
            tns: None,
            worst_slacks: None,
            filter: None,
            filter_from: None,
            filter_to: None,
            report_unconstrained_paths: false,
            always_to_endpoints: false,
            arrivals_exist: false,
            arrivals_seeded: false,
            arrivals_at_endpoints_exist: false,
            clk_arrivals_valid: false,
            requireds_exist: false,
            requireds_seeded: false,
        }
    }

    /// Discards all search state: paths, pools, worklists, slack caches.
    pub fn clear(&mut self) {
        for paths in &mut self.vertex_paths {
            *paths = VertexPaths::default();
        }
        self.pools.clear();
        self.genclks.clear();
        self.arrival_iter.clear();
        self.required_iter.clear();
        self.invalid_arrivals.lock().unwrap().clear();
        self.invalid_requireds.lock().unwrap().clear();
        self.invalid_tns.lock().unwrap().clear();
        self.pending_latch_outputs.lock().unwrap().clear();
        self.endpoints = None;
        self.invalid_endpoints.clear();
        self.tns = None;
        self.worst_slacks = None;
        self.filter = None;
        self.filter_from = None;
        self.filter_to = None;
        self.always_to_endpoints = false;
        self.arrivals_exist = false;
        self.arrivals_seeded = false;
        self.arrivals_at_endpoints_exist = false;
        self.clk_arrivals_valid = false;
        self.requireds_exist = false;
        self.requireds_seeded = false;
    }

    /// Enables reporting of unconstrained path endpoints; changing the
    /// setting invalidates existing arrivals.
    pub fn set_report_unconstrained_paths(&mut self, report: bool) {
        if self.report_unconstrained_paths != report {
            self.arrivals_invalid();
        }
        self.report_unconstrained_paths = report;
    }

    // Read-only collaborator access.

    /// The timing graph under analysis.
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// The constraint set under analysis.
    pub fn sdc(&self) -> &Sdc {
        self.sdc
    }

    /// Returns `true` if CRPR is active.
    pub fn crpr_active(&self) -> bool {
        self.sdc.crpr_enabled()
    }

    // Per-vertex path slots.

    pub(crate) fn paths(&self, vertex: VertexId) -> &VertexPaths {
        &self.vertex_paths[vertex.as_raw() as usize]
    }

    fn paths_mut(&mut self, vertex: VertexId) -> &mut VertexPaths {
        &mut self.vertex_paths[vertex.as_raw() as usize]
    }

    /// Returns the vertex's interned tag group, if it has arrivals.
    pub fn tag_group(&self, vertex: VertexId) -> Option<Arc<TagGroup>> {
        self.paths(vertex)
            .tag_group
            .map(|id| self.pools.tag_group(id))
    }

    /// Returns the vertex's tag group ID, if it has arrivals.
    pub fn tag_group_id(&self, vertex: VertexId) -> Option<TagGroupId> {
        self.paths(vertex).tag_group
    }

    /// Returns the vertex's arrival array (one slot per tag).
    pub fn arrivals(&self, vertex: VertexId) -> &[Delay] {
        &self.paths(vertex).arrivals
    }

    /// Returns the arrival of `tag` at `vertex`, if present.
    pub fn arrival_of(&self, vertex: VertexId, tag: TagId) -> Option<Delay> {
        let paths = self.paths(vertex);
        let group = self.pools.tag_group(paths.tag_group?);
        group.slot(tag).map(|slot| paths.arrivals[slot])
    }

    /// Returns the previous-path reference of the path in `slot`, stored
    /// for clock and generated-clock source paths.
    pub fn prev_path(&self, vertex: VertexId, slot: usize) -> Option<PathRep> {
        self.paths(vertex)
            .prev_paths
            .as_ref()
            .and_then(|prevs| prevs.get(slot).copied().flatten())
    }

    /// Returns the required-time array of `vertex`, if computed.
    pub fn requireds(&self, vertex: VertexId) -> Option<&[Delay]> {
        self.paths(vertex).requireds.as_deref()
    }

    /// Returns the required time of `tag` at `vertex`, if computed.
    pub fn required_of(&self, vertex: VertexId, tag: TagId) -> Option<Delay> {
        let paths = self.paths(vertex);
        let group = self.pools.tag_group(paths.tag_group?);
        let slot = group.slot(tag)?;
        paths.requireds.as_ref().map(|reqs| reqs[slot])
    }

    /// Returns `true` if `vertex` has required times.
    pub fn has_requireds(&self, vertex: VertexId) -> bool {
        self.paths(vertex).requireds.is_some()
    }

    // Pool access.

    /// Returns the interned tag with the given ID.
    pub fn tag(&self, id: TagId) -> Arc<Tag> {
        self.pools.tag(id)
    }

    /// Returns the interned clock info with the given ID.
    pub fn clk_info(&self, id: crate::pool::ClkInfoId) -> Arc<ClkInfo> {
        self.pools.clk_info(id)
    }

    /// Number of live interned tags.
    pub fn tag_count(&self) -> usize {
        self.pools.tag_count()
    }

    /// Number of live interned tag groups.
    pub fn tag_group_count(&self) -> usize {
        self.pools.tag_group_count()
    }

    /// Number of live interned clock infos.
    pub fn clk_info_count(&self) -> usize {
        self.pools.clk_info_count()
    }

    // Analysis point helpers.

    pub(crate) fn ap_min_max(&self, ap: ApIndex) -> MinMax {
        self.sdc.corners().ap(ap).min_max
    }

    pub(crate) fn ap_corner(&self, ap: ApIndex) -> usize {
        self.sdc.corners().ap(ap).corner.as_raw() as usize
    }

    // Exceptions, filter-aware.

    pub(crate) fn exception(&self, id: ExceptionId) -> &ExceptionPath {
        if id == FILTER_EXCEPTION_ID {
            self.filter
                .as_ref()
                .unwrap_or_else(|| panic!("filter exception referenced after deletion"))
        } else {
            self.sdc.exception(id)
        }
    }

    /// Interns a tag, computing the cached loop/filter bits from the
    /// carried states.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn intern_tag(
        &self,
        tr: RiseFall,
        ap: ApIndex,
        clk_info: crate::pool::ClkInfoId,
        is_clk: bool,
        input_delay: Option<InputDelayId>,
        is_segment_start: bool,
        mut states: Vec<ExceptionState>,
    ) -> TagId {
        states.sort();
        states.dedup();
        let mut is_loop = false;
        let mut is_filter = false;
        for state in &states {
            let kind = &self.exception(state.exception).kind;
            is_loop |= kind.is_loop();
            is_filter |= kind.is_filter();
        }
        self.pools.find_tag(Tag::new(
            tr,
            ap,
            clk_info,
            is_clk,
            input_delay,
            is_segment_start,
            states,
            is_loop,
            is_filter,
        ))
    }

    /// Initial exception states for a path seeded at `pin` with launch
    /// clock `clk`; `None` means a completed false path kills the seed.
    pub(crate) fn exception_from_states(
        &self,
        pin: Option<PinId>,
        clk: Option<ClockId>,
        tr: RiseFall,
        min_max: MinMax,
    ) -> Option<Vec<ExceptionState>> {
        let mut states = self.sdc.exception_from_states(pin, clk, tr, min_max)?;
        if let Some(filter) = &self.filter {
            if let Some(from) = &filter.from {
                if from.matches(pin, clk, tr) {
                    states.push(ExceptionState::first(FILTER_EXCEPTION_ID));
                }
            }
        }
        Some(states)
    }

    /// Exception states newly started by traversing `from_pin → to_pin`.
    pub(crate) fn exception_thru_states(
        &self,
        from_pin: PinId,
        to_pin: PinId,
        to_tr: RiseFall,
        min_max: MinMax,
    ) -> Vec<ExceptionState> {
        let mut states = self
            .sdc
            .exception_thru_states(from_pin, to_pin, to_tr, min_max);
        if let Some(filter) = &self.filter {
            if filter.from.is_none() {
                let first = ExceptionState::first(FILTER_EXCEPTION_ID);
                if filter.matches_next_thru(first, from_pin, to_pin, to_tr) {
                    states.push(first.advanced());
                }
            }
        }
        states
    }

    // Delay and clock helpers.

    /// Applies the derate factor for an arc to its pre-computed delay.
    pub(crate) fn derated_delay(
        &self,
        arc: &tempo_graph::TimingArc,
        role: Role,
        is_clk: bool,
        ap: ApIndex,
    ) -> Delay {
        let min_max = self.ap_min_max(ap);
        let corner = self.ap_corner(ap);
        let delay = self.graph.arc_delay(arc, corner, min_max);
        let clk_or_data = if is_clk {
            tempo_sdc::PathClkOrData::Clk
        } else {
            tempo_sdc::PathClkOrData::Data
        };
        let derate = self.sdc.timing_derate(clk_or_data, !role.is_wire(), min_max);
        delay * derate
    }

    /// Returns the clock insertion delay at `pin`: the generated-clock
    /// engine's value for generated clocks with a propagated master, the
    /// SDC value otherwise.
    pub(crate) fn clock_insertion(
        &self,
        clk: ClockId,
        pin: PinId,
        early_late: EarlyLate,
        ap: ApIndex,
    ) -> Delay {
        let clock = self.sdc.clock(clk);
        if clock.is_generated_with_propagated_master() && self.genclks.has_insertion(clk) {
            self.genclks.insertion_delay(clk, ap)
        } else {
            self.sdc.clock_insertion(clk, pin, early_late)
        }
    }

    /// The arrival of a clock path with ideal insertion and latency folded
    /// in at register clock pins that the propagated search never reached.
    pub(crate) fn clk_path_arrival(&self, path: PathRep) -> Delay {
        let tag = self.pools.tag(path.tag);
        let arrival = self.arrival_of(path.vertex, path.tag).unwrap_or(0.0);
        let info = self.pools.clk_info(tag.clk_info);
        if let Some(clk_edge) = info.clk_edge {
            if self.graph.vertex(path.vertex).is_reg_clk && tag.is_clk && !info.is_propagated {
                let ap = tag.ap;
                let early_late = self.ap_min_max(ap);
                let src = info
                    .clk_src
                    .unwrap_or(self.graph.vertex(path.vertex).pin);
                return self.sdc.clock_edge_time(clk_edge)
                    + self.clock_insertion(clk_edge.clock, src, early_late, ap)
                    + info.latency;
            }
        }
        arrival
    }

    // Commit-side vertex updates.

    /// Returns `true` if the builder's arrivals differ from the vertex's
    /// stored arrivals beyond the fuzzy tolerance.
    pub(crate) fn arrivals_changed(&self, vertex: VertexId, bldr: &TagGroupBldr) -> bool {
        let paths = self.paths(vertex);
        let Some(group_id) = paths.tag_group else {
            return !bldr.is_empty();
        };
        let group = self.pools.tag_group(group_id);
        if group.tag_count() != bldr.len() {
            return true;
        }
        for (slot, tag) in group.iter() {
            match bldr.arrival(tag) {
                Some(arrival) if fuzzy_equal(arrival, paths.arrivals[slot]) => {}
                _ => return true,
            }
        }
        false
    }

    /// Replaces a vertex's tag group and arrivals from builder entries.
    /// An empty builder deletes the vertex's paths.
    pub(crate) fn set_vertex_arrivals(&mut self, vertex: VertexId, bldr: &TagGroupBldr) {
        if bldr.is_empty() {
            self.delete_paths(vertex);
            return;
        }
        let tags = bldr.sorted_tags();
        let mut has_clk_tag = false;
        let mut has_genclk_src_tag = false;
        let mut has_filter_tag = false;
        let mut has_loop_tag = false;
        for &tag_id in &tags {
            let tag = self.pools.tag(tag_id);
            has_clk_tag |= tag.is_clk;
            has_filter_tag |= tag.is_filter;
            has_loop_tag |= tag.is_loop;
            has_genclk_src_tag |= self.pools.clk_info(tag.clk_info).is_gen_clk_src_path;
        }
        let group_id = self.pools.find_tag_group(TagGroup {
            tags: tags.clone(),
            has_clk_tag,
            has_genclk_src_tag,
            has_filter_tag,
            has_loop_tag,
        });
        let group = self.pools.tag_group(group_id);

        let mut arrivals = vec![0.0; tags.len()].into_boxed_slice();
        let mut prev_paths = if has_clk_tag || has_genclk_src_tag {
            Some(vec![None; tags.len()].into_boxed_slice())
        } else {
            None
        };
        for (tag, entry) in bldr.iter() {
            let slot = group
                .slot(tag)
                .unwrap_or_else(|| panic!("builder tag missing from interned group"));
            arrivals[slot] = entry.arrival;
            if let Some(prevs) = prev_paths.as_mut() {
                prevs[slot] = entry.prev;
            }
        }

        let prev_group = self.paths(vertex).tag_group;
        let had_requireds = self.paths(vertex).requireds.is_some();
        {
            let paths = self.paths_mut(vertex);
            paths.tag_group = Some(group_id);
            paths.arrivals = arrivals;
            paths.prev_paths = prev_paths;
            // Requireds survive only if the tag group is unchanged.
            if prev_group != Some(group_id) {
                paths.requireds = None;
            }
        }
        if had_requireds && prev_group != Some(group_id) {
            self.required_invalid(vertex);
        }
        self.arrivals_exist = true;
    }

    /// Replaces a vertex's required-time array.
    pub(crate) fn set_vertex_requireds(
        &mut self,
        vertex: VertexId,
        requireds: Option<Box<[Delay]>>,
    ) {
        self.paths_mut(vertex).requireds = requireds;
    }

    /// Deletes a vertex's path state.
    pub(crate) fn delete_paths(&mut self, vertex: VertexId) {
        self.tns_notify_before(vertex);
        *self.paths_mut(vertex) = VertexPaths::default();
    }

    // Invalidation.

    /// Marks every arrival invalid, discarding paths, tags, and slack
    /// caches.
    pub fn arrivals_invalid(&mut self) {
        if self.arrivals_exist {
            log::debug!("arrivals invalid");
            for paths in &mut self.vertex_paths {
                *paths = VertexPaths::default();
            }
            self.pools.clear();
            self.genclks.clear();
            self.filter = None;
            self.filter_from = None;
            self.filter_to = None;
            self.arrivals_exist = false;
            self.arrivals_at_endpoints_exist = false;
            self.arrivals_seeded = false;
            self.requireds_exist = false;
            self.requireds_seeded = false;
            self.clk_arrivals_valid = false;
            self.arrival_iter.clear();
            self.required_iter.clear();
            self.invalid_arrivals.lock().unwrap().clear();
            self.invalid_requireds.lock().unwrap().clear();
            self.tns = None;
            self.worst_slacks = None;
            self.invalid_tns.lock().unwrap().clear();
        }
    }

    /// Marks every required time invalid.
    pub fn requireds_invalid(&mut self) {
        log::debug!("requireds invalid");
        self.requireds_exist = false;
        self.requireds_seeded = false;
        for paths in &mut self.vertex_paths {
            paths.requireds = None;
        }
        self.invalid_requireds.lock().unwrap().clear();
        self.tns = None;
        self.worst_slacks = None;
        self.invalid_tns.lock().unwrap().clear();
    }

    /// Marks one vertex's arrival invalid; it is re-seeded on the next
    /// arrival pass.
    pub fn arrival_invalid(&self, vertex: VertexId) {
        if self.arrivals_exist && !self.arrival_iter.in_queue(vertex) {
            self.invalid_arrivals.lock().unwrap().insert(vertex);
        }
        self.tns_invalid(vertex);
    }

    /// Marks one vertex's required time invalid.
    pub fn required_invalid(&self, vertex: VertexId) {
        if self.requireds_exist && !self.required_iter.in_queue(vertex) {
            self.invalid_requireds.lock().unwrap().insert(vertex);
        }
        self.tns_invalid(vertex);
    }

    /// Notification that a vertex's level is about to change: dequeues it
    /// and invalidates its arrival and required.
    pub fn level_changed_before(&mut self, vertex: VertexId) {
        if self.arrivals_exist {
            self.arrival_iter.remove(vertex);
            self.required_iter.remove(vertex);
            self.arrival_invalid(vertex);
            self.required_invalid(vertex);
        }
    }

    /// Notification that a vertex is about to be deleted from the graph.
    pub fn delete_vertex_before(&mut self, vertex: VertexId) {
        if self.arrivals_exist {
            self.delete_paths(vertex);
            self.arrival_iter.remove(vertex);
            self.invalid_arrivals.lock().unwrap().remove(&vertex);
        }
        if self.requireds_exist {
            self.required_iter.remove(vertex);
            self.invalid_requireds.lock().unwrap().remove(&vertex);
            self.invalid_tns.lock().unwrap().remove(&vertex);
        }
        if let Some(endpoints) = &mut self.endpoints {
            endpoints.remove(&vertex);
        }
        self.invalid_endpoints.remove(&vertex);
    }

    // Arrival pass drivers.

    /// Finds arrivals up to the graph's maximum level, iterating the latch
    /// fixed point to convergence.
    pub fn find_all_arrivals(&mut self) {
        let mut pass = 1;
        loop {
            self.enqueue_pending_latch_outputs();
            log::debug!("find arrivals pass {pass}");
            self.find_arrivals(self.levelize.max_level());
            if !self.have_pending_latch_outputs() {
                break;
            }
            pass += 1;
            if pass > LATCH_PASS_BOUND {
                log::warn!(
                    "latch arrival iteration exceeded {LATCH_PASS_BOUND} passes; stopping"
                );
                self.sdc.record_warning(tempo_diagnostics::Diagnostic::warning(
                    tempo_diagnostics::DiagnosticCode::LatchIterationLimit,
                    format!("latch arrival iteration exceeded {LATCH_PASS_BOUND} passes"),
                ));
                self.pending_latch_outputs.lock().unwrap().clear();
                break;
            }
        }
    }

    /// Finds arrivals for vertices up to `level`.
    pub fn find_arrivals(&mut self, level: Level) {
        self.find_arrivals1();
        let count = self.visit_arrivals(level);
        log::debug!("found {count} arrivals to level {level}");
        if self.arrival_iter.is_empty() && self.invalid_arrivals.lock().unwrap().is_empty() {
            self.clk_arrivals_valid = true;
            self.arrivals_at_endpoints_exist = true;
        }
        self.arrivals_exist = true;
    }

    fn find_arrivals1(&mut self) {
        if !self.arrivals_seeded {
            self.genclks_ensure();
            let broken = self.levelize.broken_loop_edges().len();
            if broken > 0 {
                self.sdc.record_warning(tempo_diagnostics::Diagnostic::warning(
                    tempo_diagnostics::DiagnosticCode::BrokenLoop,
                    format!("{broken} combinational loop(s) broken for levelization"),
                ));
            }
            self.arrival_iter.clear();
            self.required_iter.clear();
            self.seed_arrivals();
            self.arrivals_seeded = true;
        } else {
            self.arrival_iter.ensure_size(self.graph);
            self.required_iter.ensure_size(self.graph);
        }
        self.seed_invalid_arrivals();
    }

    fn genclks_ensure(&mut self) {
        let mut genclks = std::mem::take(&mut self.genclks);
        genclks.ensure_insertion_delays(self.graph, self.sdc);
        self.genclks = genclks;
    }

    /// Runs a clock-network-only arrival pass (wire and combinational arcs
    /// only), seeding every declared clock source.
    pub fn find_clk_arrivals(&mut self) {
        if self.clk_arrivals_valid {
            return;
        }
        self.genclks_ensure();
        log::debug!("find clk arrivals");
        self.arrival_iter.clear();
        let clock_vertices = self.clock_vertices();
        for vertex in clock_vertices {
            self.seed_arrival(vertex);
        }
        self.visit_arrivals_pred(self.levelize.max_level(), SearchPred::clk_arrival());
        self.arrivals_exist = true;
        self.clk_arrivals_valid = true;
    }

    fn visit_arrivals(&mut self, level: Level) -> usize {
        self.visit_arrivals_pred(level, SearchPred::eval())
    }

    fn visit_arrivals_pred(&mut self, level: Level, pred: SearchPred) -> usize {
        use rayon::prelude::*;
        let mut iter = std::mem::take(&mut self.arrival_iter);
        let mut count = 0;
        while let Some((_, vertices)) = iter.take_next_level(level) {
            count += vertices.len();
            let outcomes: Vec<(VertexId, ArrivalOutcome)> =
                if vertices.len() >= PARALLEL_THRESHOLD {
                    vertices
                        .par_iter()
                        .filter_map(|&v| self.arrival_visit(v, pred).map(|o| (v, o)))
                        .collect()
                } else {
                    vertices
                        .iter()
                        .filter_map(|&v| self.arrival_visit(v, pred).map(|o| (v, o)))
                        .collect()
                };
            for (vertex, outcome) in outcomes {
                self.commit_arrival(&mut iter, vertex, outcome);
            }
        }
        self.arrival_iter = iter;
        count
    }

    // Seeding.

    fn clock_vertices(&self) -> Vec<VertexId> {
        let mut vertices = Vec::new();
        for clock in self.sdc.clocks() {
            for &pin in &clock.src_pins {
                if let Some(v) = self.graph.pin_vertex(pin) {
                    vertices.push(v);
                }
                if let Some(v) = self.graph.pin_bidirect_drvr_vertex(pin) {
                    vertices.push(v);
                }
            }
        }
        vertices.sort();
        vertices.dedup();
        vertices
    }

    fn seed_arrivals(&mut self) {
        let mut vertices = self.clock_vertices();
        // Graph roots that are not clock sources or input-delay pins.
        for &root in self.levelize.roots() {
            let pin = self.graph.vertex(root).pin;
            if !self.sdc.is_vertex_pin_clock(pin) && !self.sdc.has_input_delay(pin) {
                vertices.push(root);
            }
        }
        // Top-level input port drivers.
        for pin_info in self.network.pins() {
            if pin_info.is_top_level_port && pin_info.direction.is_any_input() {
                if let Some(v) = self.graph.pin_vertex(pin_info.id) {
                    vertices.push(v);
                }
            }
        }
        // Pins with input delays (which may be internal).
        for pin in self.sdc.input_delay_pins() {
            if let Some(v) = self.graph.pin_vertex(pin) {
                vertices.push(v);
            }
        }
        vertices.sort();
        vertices.dedup();
        for vertex in vertices {
            self.seed_arrival(vertex);
        }
    }

    fn seed_invalid_arrivals(&mut self) {
        let invalid: Vec<VertexId> = {
            let mut set = self.invalid_arrivals.lock().unwrap();
            let mut v: Vec<VertexId> = set.drain().collect();
            v.sort();
            v
        };
        for vertex in invalid {
            self.seed_arrival(vertex);
        }
    }

    /// Seeds one vertex: clock sources get clock arrivals, input-arrival
    /// startpoints get input-delay arrivals, unclocked roots get zero
    /// arrivals, everything else is enqueued for re-evaluation.
    pub(crate) fn seed_arrival(&mut self, vertex: VertexId) {
        let pin = self.graph.vertex(vertex).pin;
        if self.sdc.is_vertex_pin_clock(pin) {
            let mut bldr = TagGroupBldr::new();
            self.copy_gen_clk_src_paths(vertex, &mut bldr);
            self.seed_clk_arrivals(pin, vertex, &mut bldr);
            // Clock pins may also have input arrivals from other clocks.
            if self.sdc.has_input_delay(pin) {
                self.seed_input_arrival(pin, vertex, &mut bldr);
            }
            self.set_vertex_arrivals(vertex, &bldr);
            self.enqueue_adjacent_fanouts_of(vertex);
        } else if self.is_input_arrival_srch_start(vertex) {
            let mut bldr = TagGroupBldr::new();
            self.seed_input_arrival(pin, vertex, &mut bldr);
            let empty = bldr.is_empty();
            self.set_vertex_arrivals(vertex, &bldr);
            if !empty {
                // Only search downstream if there were non-false paths here.
                self.enqueue_adjacent_fanouts_of(vertex);
            }
        } else if self.levelize.is_root(vertex) {
            let is_reg_clk = self.graph.vertex(vertex).is_reg_clk;
            if is_reg_clk
                || (self.report_unconstrained_paths
                    && !self.network.pin(pin).is_top_level_port)
            {
                log::trace!("seed unclocked root {vertex:?}");
                let mut bldr = TagGroupBldr::new();
                let search_from = self.make_unclked_paths(vertex, is_reg_clk, &mut bldr);
                self.set_vertex_arrivals(vertex, &bldr);
                if search_from {
                    self.enqueue_adjacent_fanouts_of(vertex);
                }
            } else {
                self.delete_paths(vertex);
                self.enqueue_adjacent_fanouts_of(vertex);
            }
        } else {
            let mut iter = std::mem::take(&mut self.arrival_iter);
            iter.enqueue(self.graph, vertex);
            self.arrival_iter = iter;
        }
    }

    fn enqueue_adjacent_fanouts_of(&mut self, vertex: VertexId) {
        let pred = SearchPred::search_thru_pred();
        let fanouts = self.admitted_fanouts(vertex, pred, None);
        let mut iter = std::mem::take(&mut self.arrival_iter);
        for w in fanouts {
            iter.enqueue(self.graph, w);
        }
        self.arrival_iter = iter;
    }

    /// The fanout vertices admitted by `pred` (and the dynamic-loop rule
    /// when a builder with loop tags is given).
    pub(crate) fn admitted_fanouts(
        &self,
        vertex: VertexId,
        pred: SearchPred,
        bldr: Option<&TagGroupBldr>,
    ) -> Vec<VertexId> {
        let mut fanouts = Vec::new();
        for &e in self.graph.out_edges(vertex) {
            let edge = self.graph.edge(e);
            if pred.search_thru(self, bldr, e) && pred.search_to(self, edge.to) {
                fanouts.push(edge.to);
            }
        }
        fanouts
    }

    /// Seeds clock tags for every clock defined on `pin`.
    pub(crate) fn seed_clk_arrivals(
        &self,
        pin: PinId,
        _vertex: VertexId,
        bldr: &mut TagGroupBldr,
    ) {
        for &clk in self.sdc.vertex_pin_clocks(pin) {
            let clock = self.sdc.clock(clk);
            for ap in self.sdc.corners().ap_indices() {
                let min_max = self.ap_min_max(ap);
                for tr in RiseFall::BOTH {
                    let clk_edge = ClockEdge::new(clk, tr);
                    if clock.is_generated && clock.master.is_none() {
                        self.seed_clk_data_arrival(pin, tr, clk_edge, min_max, ap, bldr);
                    } else {
                        let insertion = self.clock_insertion(clk, pin, min_max, ap);
                        self.seed_clk_arrival(pin, tr, clk_edge, min_max, ap, insertion, bldr);
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn seed_clk_arrival(
        &self,
        pin: PinId,
        tr: RiseFall,
        clk_edge: ClockEdge,
        min_max: MinMax,
        ap: ApIndex,
        insertion: Delay,
        bldr: &mut TagGroupBldr,
    ) {
        let clk = clk_edge.clock;
        let clock = self.sdc.clock(clk);
        let mut is_propagated = false;
        let mut latency = 0.0;
        if let Some(pin_latency) = self.sdc.pin_clock_latency(pin) {
            latency = pin_latency.get(min_max);
        } else if clock.latency.get(min_max) != 0.0 {
            if self.sdc.is_propagated_pin(pin) {
                // Propagated pin overrides latency on the clock.
                is_propagated = true;
            } else {
                latency = clock.latency.get(min_max);
            }
        } else {
            is_propagated = self.sdc.is_propagated_pin(pin) || clock.is_propagated;
        }
        let uncertainty = self.pin_or_clock_uncertainty(clk, pin);
        let clk_info = self.pools.find_clk_info(ClkInfo {
            clk_edge: Some(clk_edge),
            clk_src: Some(pin),
            is_propagated,
            gen_clk_src: None,
            is_gen_clk_src_path: false,
            pulse_clk_sense: None,
            insertion,
            latency,
            uncertainty,
            ap,
            crpr_clk_path: None,
        });
        // Only false_path -from clock exceptions apply to clock tree pins.
        let states = self.sdc.exception_from_clk_states(pin, clk, tr, min_max);
        let tag = self.intern_tag(tr, ap, clk_info, true, None, false, states);
        let arrival = self.sdc.clock_edge_time(clk_edge) + insertion;
        bldr.set_arrival(tag, arrival, None);
    }

    fn pin_or_clock_uncertainty(
        &self,
        clk: ClockId,
        pin: PinId,
    ) -> Option<tempo_sdc::ClockUncertainty> {
        let u = self.sdc.clock_uncertainty(clk, Some(pin));
        if u.setup == 0.0 && u.hold == 0.0 {
            None
        } else {
            Some(u)
        }
    }

    /// Seeds a divider-less generated clock as a data arrival.
    fn seed_clk_data_arrival(
        &self,
        pin: PinId,
        tr: RiseFall,
        clk_edge: ClockEdge,
        min_max: MinMax,
        ap: ApIndex,
        bldr: &mut TagGroupBldr,
    ) {
        let Some(states) =
            self.exception_from_states(Some(pin), Some(clk_edge.clock), tr, min_max)
        else {
            return;
        };
        let clock = self.sdc.clock(clk_edge.clock);
        let is_propagated = clock.is_propagated || self.sdc.is_propagated_pin(pin);
        let insertion = self.clock_insertion(clk_edge.clock, pin, min_max, ap);
        let clk_info = self.pools.find_clk_info(ClkInfo {
            clk_edge: Some(clk_edge),
            clk_src: Some(pin),
            is_propagated,
            gen_clk_src: None,
            is_gen_clk_src_path: false,
            pulse_clk_sense: None,
            insertion,
            latency: 0.0,
            uncertainty: None,
            ap,
            crpr_clk_path: None,
        });
        let tag = self.intern_tag(tr, ap, clk_info, false, None, false, states);
        let arrival = self.sdc.clock_edge_time(clk_edge) + insertion;
        bldr.set_arrival(tag, arrival, None);
    }

    /// Seeds gen-clk source-path tags at master clock source vertices that
    /// feed a generated clock's cone.
    pub(crate) fn copy_gen_clk_src_paths(&self, vertex: VertexId, bldr: &mut TagGroupBldr) {
        let pin = self.graph.vertex(vertex).pin;
        let seeds = self.genclks.gen_clk_src_seeds(self.sdc, vertex, pin);
        for seed in seeds {
            let clk_info = self.pools.find_clk_info(seed.clk_info);
            let tag = self.intern_tag(seed.tr, seed.ap, clk_info, true, None, false, vec![]);
            bldr.set_arrival(tag, seed.arrival, None);
        }
    }

    /// Seeds zero-arrival unclocked tags for every transition and analysis
    /// point; returns `true` if any seed survived exception filtering.
    pub(crate) fn make_unclked_paths(
        &self,
        vertex: VertexId,
        is_segment_start: bool,
        bldr: &mut TagGroupBldr,
    ) -> bool {
        let pin = self.graph.vertex(vertex).pin;
        let mut search_from = false;
        for ap in self.sdc.corners().ap_indices() {
            let min_max = self.ap_min_max(ap);
            for tr in RiseFall::BOTH {
                if let Some(tag) = self.from_unclked_input_tag(pin, tr, min_max, ap, is_segment_start)
                {
                    bldr.set_arrival(tag, 0.0, None);
                    search_from = true;
                }
            }
        }
        search_from
    }

    fn from_unclked_input_tag(
        &self,
        pin: PinId,
        tr: RiseFall,
        min_max: MinMax,
        ap: ApIndex,
        is_segment_start: bool,
    ) -> Option<TagId> {
        let states = self.exception_from_states(Some(pin), None, tr, min_max)?;
        let clk_info = self.pools.find_clk_info(ClkInfo::unclocked(ap));
        Some(self.intern_tag(tr, ap, clk_info, false, None, is_segment_start, states))
    }

    pub(crate) fn is_segment_start(&self, pin: PinId) -> bool {
        (self.sdc.is_path_delay_from_pin(pin)
            || (self.sdc.has_input_delay(pin) && !self.network.pin(pin).is_top_level_port))
            && !self.sdc.is_vertex_pin_clock(pin)
    }

    fn is_input_arrival_srch_start(&self, vertex: VertexId) -> bool {
        let v = self.graph.vertex(vertex);
        let pin = self.network.pin(v.pin);
        pin.is_top_level_port
            && (pin.direction == tempo_graph::PortDirection::Input
                || (pin.direction == tempo_graph::PortDirection::Bidirect
                    && v.is_bidirect_driver))
    }

    /// Seeds input arrivals at `pin`: its input delays, or a zero-delay
    /// default seed for undelayed ports.
    pub(crate) fn seed_input_arrival(
        &self,
        pin: PinId,
        vertex: VertexId,
        bldr: &mut TagGroupBldr,
    ) {
        if self.sdc.has_input_delay(pin) {
            let ids: Vec<InputDelayId> = self.sdc.pin_input_delays(pin).to_vec();
            for id in ids {
                let input_delay = self.sdc.input_delay(id).clone();
                // Input arrivals wrt a clock defined on this same pin are
                // the insertion delay and are seeded as clock arrivals.
                if let Some(edge) = input_delay.clk_edge {
                    if self.sdc.vertex_pin_clocks(pin).contains(&edge.clock) {
                        continue;
                    }
                }
                self.seed_input_delay_arrival(pin, vertex, Some(&input_delay), false, bldr);
            }
        } else if !self.sdc.is_vertex_pin_clock(pin) {
            self.seed_input_delay_arrival(pin, vertex, None, false, bldr);
        }
    }

    /// Seeds an internal input delay as a segment start, layered on top of
    /// propagated arrivals during the vertex visit.
    pub(crate) fn seed_input_segment_arrival(
        &self,
        pin: PinId,
        vertex: VertexId,
        bldr: &mut TagGroupBldr,
    ) {
        let ids: Vec<InputDelayId> = self.sdc.pin_input_delays(pin).to_vec();
        for id in ids {
            let input_delay = self.sdc.input_delay(id).clone();
            self.seed_input_delay_arrival(pin, vertex, Some(&input_delay), true, bldr);
        }
    }

    /// Seeds the arrival(s) for one input delay (or the default zero seed
    /// when `input_delay` is `None`).
    pub(crate) fn seed_input_delay_arrival(
        &self,
        pin: PinId,
        _vertex: VertexId,
        input_delay: Option<&InputDelay>,
        is_segment_start: bool,
        bldr: &mut TagGroupBldr,
    ) {
        let clk_edge = input_delay
            .and_then(|d| d.clk_edge)
            .or_else(|| {
                self.sdc
                    .default_arrival_clock()
                    .map(|clk| ClockEdge::new(clk, RiseFall::Rise))
            });
        if let Some(ref_pin) = input_delay.and_then(|d| d.ref_pin) {
            let delay = input_delay.map(|d| d.delay).unwrap_or_default();
            let ref_tr = input_delay.map_or(RiseFall::Rise, |d| d.ref_tr);
            self.seed_ref_pin_arrival(
                pin,
                input_delay,
                clk_edge,
                ref_pin,
                ref_tr,
                delay,
                is_segment_start,
                bldr,
            );
            return;
        }
        let ap_indices: Vec<ApIndex> = self.sdc.corners().ap_indices().collect();
        for ap in ap_indices {
            let min_max = self.ap_min_max(ap);
            let (clk_arrival, clk_insertion, clk_latency) =
                self.input_delay_clk_arrival(input_delay, clk_edge, min_max, ap);
            for tr in RiseFall::BOTH {
                let delay = input_delay.map_or(0.0, |d| d.delay.get(min_max));
                let arrival = if input_delay.is_some() {
                    clk_arrival + delay
                } else {
                    0.0
                };
                if let Some(tag) = self.input_delay_tag(
                    pin,
                    tr,
                    clk_edge,
                    clk_insertion,
                    clk_latency,
                    input_delay.map(|d| d.id),
                    is_segment_start,
                    min_max,
                    ap,
                ) {
                    bldr.set_arrival(tag, arrival, None);
                }
            }
        }
    }

    /// Input delays with `-reference_pin` measure from the reference pin's
    /// propagated clock-network arrival instead of the ideal clock edge.
    #[allow(clippy::too_many_arguments)]
    fn seed_ref_pin_arrival(
        &self,
        pin: PinId,
        input_delay: Option<&InputDelay>,
        clk_edge: Option<ClockEdge>,
        ref_pin: PinId,
        ref_tr: RiseFall,
        delay: tempo_common::PerMinMax<Delay>,
        is_segment_start: bool,
        bldr: &mut TagGroupBldr,
    ) {
        let Some(ref_vertex) = self.graph.pin_vertex(ref_pin) else {
            return;
        };
        let Some(ref_group) = self.tag_group(ref_vertex) else {
            return;
        };
        let refs: Vec<(TagId, Delay)> = ref_group
            .iter()
            .filter_map(|(slot, tag_id)| {
                let tag = self.pools.tag(tag_id);
                if !tag.is_clk || tag.tr != ref_tr {
                    return None;
                }
                let info = self.pools.clk_info(tag.clk_info);
                let tag_clk = info.clock()?;
                if let Some(edge) = clk_edge {
                    if edge.clock != tag_clk {
                        return None;
                    }
                }
                Some((tag_id, self.arrivals(ref_vertex)[slot]))
            })
            .collect();
        for (ref_tag_id, ref_arrival) in refs {
            let ref_tag = self.pools.tag(ref_tag_id);
            let info = self.pools.clk_info(ref_tag.clk_info);
            let Some(edge) = info.clk_edge else { continue };
            let ap = ref_tag.ap;
            let min_max = self.ap_min_max(ap);
            let clock = self.sdc.clock(edge.clock);
            let (arrival_base, ref_insertion, ref_latency) = if clock.is_propagated {
                (ref_arrival, info.insertion, info.latency)
            } else {
                // Ideal reference clocks include insertion but not latency.
                let insertion = clock.insertion(min_max);
                (
                    self.sdc.clock_edge_time(edge) + insertion,
                    insertion,
                    0.0,
                )
            };
            for tr in RiseFall::BOTH {
                if let Some(tag) = self.input_delay_tag(
                    pin,
                    tr,
                    Some(edge),
                    ref_insertion,
                    ref_latency,
                    input_delay.map(|d| d.id),
                    is_segment_start,
                    min_max,
                    ap,
                ) {
                    bldr.set_arrival(tag, arrival_base + delay.get(min_max), None);
                }
            }
        }
    }

    fn input_delay_clk_arrival(
        &self,
        input_delay: Option<&InputDelay>,
        clk_edge: Option<ClockEdge>,
        min_max: MinMax,
        ap: ApIndex,
    ) -> (Delay, Delay, Delay) {
        let mut clk_arrival = 0.0;
        let mut clk_insertion = 0.0;
        let mut clk_latency = 0.0;
        if let (Some(delay), Some(edge)) = (input_delay, clk_edge) {
            clk_arrival = self.sdc.clock_edge_time(edge);
            let clock = self.sdc.clock(edge.clock);
            if !delay.source_latency_included {
                let src = clock.src_pins.first().copied();
                clk_insertion = match src {
                    Some(src) => self.clock_insertion(edge.clock, src, min_max, ap),
                    None => clock.insertion(min_max),
                };
                clk_arrival += clk_insertion;
            }
            if !clock.is_propagated && !delay.network_latency_included {
                clk_latency = self.sdc.clock_latency(edge.clock, None, min_max);
                clk_arrival += clk_latency;
            }
        }
        (clk_arrival, clk_insertion, clk_latency)
    }

    #[allow(clippy::too_many_arguments)]
    fn input_delay_tag(
        &self,
        pin: PinId,
        tr: RiseFall,
        clk_edge: Option<ClockEdge>,
        clk_insertion: Delay,
        clk_latency: Delay,
        input_delay: Option<InputDelayId>,
        is_segment_start: bool,
        min_max: MinMax,
        ap: ApIndex,
    ) -> Option<TagId> {
        let clk = clk_edge.map(|e| e.clock);
        let states = self.exception_from_states(Some(pin), clk, tr, min_max)?;
        let (clk_src, is_propagated, uncertainty) = match clk {
            Some(clk) => {
                let clock = self.sdc.clock(clk);
                (
                    clock.src_pins.first().copied(),
                    clock.is_propagated,
                    clock.uncertainty,
                )
            }
            None => (None, false, None),
        };
        let clk_info = self.pools.find_clk_info(ClkInfo {
            clk_edge,
            clk_src,
            is_propagated,
            gen_clk_src: None,
            is_gen_clk_src_path: false,
            pulse_clk_sense: None,
            insertion: clk_insertion,
            latency: clk_latency,
            uncertainty,
            ap,
            crpr_clk_path: None,
        });
        Some(self.intern_tag(tr, ap, clk_info, false, input_delay, is_segment_start, states))
    }

    // Latch pending-output plumbing.

    pub(crate) fn have_pending_latch_outputs(&self) -> bool {
        !self.pending_latch_outputs.lock().unwrap().is_empty()
    }

    fn enqueue_pending_latch_outputs(&mut self) {
        let pending: Vec<VertexId> = {
            let mut set = self.pending_latch_outputs.lock().unwrap();
            let mut v: Vec<VertexId> = set.drain().collect();
            v.sort();
            v
        };
        let mut iter = std::mem::take(&mut self.arrival_iter);
        for vertex in pending {
            iter.enqueue(self.graph, vertex);
        }
        self.arrival_iter = iter;
    }

    pub(crate) fn enqueue_latch_data_outputs(&self, vertex: VertexId) {
        let mut pending = self.pending_latch_outputs.lock().unwrap();
        for &e in self.graph.out_edges(vertex) {
            let edge = self.graph.edge(e);
            if edge.role == Role::LatchDToQ {
                pending.insert(edge.to);
            }
        }
    }

    // Required pass driver.

    /// Finds required times down to `level` (0 covers the whole graph).
    pub fn find_requireds(&mut self, level: Level) {
        log::debug!("find requireds to level {level}");
        if !self.requireds_seeded {
            self.seed_requireds();
        }
        self.seed_invalid_requireds();
        let count = self.visit_requireds(level);
        self.requireds_exist = true;
        log::debug!("found {count} requireds");
    }

    fn seed_requireds(&mut self) {
        let endpoints: Vec<VertexId> = {
            let mut v: Vec<VertexId> = self.endpoints().iter().copied().collect();
            v.sort();
            v
        };
        for vertex in endpoints {
            self.seed_required(vertex);
        }
        self.requireds_seeded = true;
        self.requireds_exist = true;
    }

    fn seed_invalid_requireds(&mut self) {
        let invalid: Vec<VertexId> = {
            let mut set = self.invalid_requireds.lock().unwrap();
            let mut v: Vec<VertexId> = set.drain().collect();
            v.sort();
            v
        };
        let mut iter = std::mem::take(&mut self.required_iter);
        for vertex in invalid {
            iter.enqueue(self.graph, vertex);
        }
        self.required_iter = iter;
    }

    fn visit_requireds(&mut self, level: Level) -> usize {
        use rayon::prelude::*;
        let mut iter = std::mem::take(&mut self.required_iter);
        let mut count = 0;
        while let Some((_, vertices)) = iter.take_next_level(level) {
            count += vertices.len();
            let outcomes: Vec<(VertexId, crate::required::RequiredOutcome)> =
                if vertices.len() >= PARALLEL_THRESHOLD {
                    vertices
                        .par_iter()
                        .filter_map(|&v| self.required_visit(v).map(|o| (v, o)))
                        .collect()
                } else {
                    vertices
                        .iter()
                        .filter_map(|&v| self.required_visit(v).map(|o| (v, o)))
                        .collect()
                };
            for (vertex, outcome) in outcomes {
                self.commit_required(&mut iter, vertex, outcome);
            }
        }
        self.required_iter = iter;
        count
    }

    pub(crate) fn enqueue_required_fanins(&self, iter: &mut BfsIterator, vertex: VertexId) {
        let pred = SearchPred::search_thru_pred();
        for &e in self.graph.in_edges(vertex) {
            let edge = self.graph.edge(e);
            if pred.search_thru(self, None, e) && pred.search_from(self, edge.from) {
                iter.enqueue(self.graph, edge.from);
            }
        }
    }

    /// Enqueues an endpoint's fanins after seeding its requireds, used both
    /// at cold seed time and when revalidating endpoints.
    pub(crate) fn seed_required_enqueue_fanin(&mut self, vertex: VertexId) {
        self.seed_required(vertex);
        let mut iter = std::mem::take(&mut self.required_iter);
        self.enqueue_required_fanins(&mut iter, vertex);
        self.required_iter = iter;
    }

    // Endpoints.

    /// The current endpoint set, built lazily and maintained incrementally
    /// through `endpoint_invalid`.
    pub fn endpoints(&mut self) -> &FxHashSet<VertexId> {
        let mut endpoints = match self.endpoints.take() {
            Some(endpoints) => endpoints,
            None => {
                self.invalid_endpoints.clear();
                self.graph
                    .vertex_ids()
                    .filter(|&v| self.is_endpoint(v))
                    .collect()
            }
        };
        if !self.invalid_endpoints.is_empty() {
            let invalid: Vec<VertexId> = self.invalid_endpoints.drain().collect();
            for v in invalid {
                if self.is_endpoint(v) {
                    endpoints.insert(v);
                } else {
                    endpoints.remove(&v);
                }
            }
        }
        self.endpoints.insert(endpoints)
    }

    /// Marks a vertex's endpoint-ness as needing recomputation.
    pub fn endpoint_invalid(&mut self, vertex: VertexId) {
        if self.endpoints.is_some() {
            self.invalid_endpoints.insert(vertex);
        }
    }

    /// Discards the endpoint set entirely.
    pub fn endpoints_invalid(&mut self) {
        self.endpoints = None;
        self.invalid_endpoints.clear();
    }

    /// Returns `true` if `vertex` terminates timing paths under the current
    /// constraints.
    pub fn is_endpoint(&self, vertex: VertexId) -> bool {
        let pred = SearchPred::search_thru_pred();
        let has_fanin = self.graph.in_edges(vertex).iter().any(|&e| {
            let edge = self.graph.edge(e);
            pred.search_thru(self, None, e) && pred.search_from(self, edge.from)
        });
        if !has_fanin {
            return false;
        }
        let pin = self.graph.vertex(vertex).pin;
        let has_checks = self
            .graph
            .in_edges(vertex)
            .iter()
            .any(|&e| self.graph.edge(e).role.is_timing_check());
        let has_fanout = self.graph.out_edges(vertex).iter().any(|&e| {
            let edge = self.graph.edge(e);
            pred.search_thru(self, None, e) && pred.search_to(self, edge.to)
        });
        has_checks
            || (self.sdc.gated_clk_checks_enabled() && self.sdc.is_gated_clk_enable(pin))
            || self.sdc.has_output_delay(pin)
            || self.sdc.is_path_delay_to_pin(pin)
            || !has_fanout
            || (self.report_unconstrained_paths && self.graph.vertex(vertex).is_reg_clk)
    }

    // TNS bookkeeping hooks (bodies in slack.rs).

    pub(crate) fn tns_invalid(&self, vertex: VertexId) {
        if (self.tns.is_some() || self.worst_slacks.is_some()) && self.is_endpoint(vertex) {
            self.invalid_tns.lock().unwrap().insert(vertex);
        }
    }

    fn tns_notify_before(&mut self, vertex: VertexId) {
        if self.tns.is_some() && self.is_endpoint(vertex) {
            if let Some(tns) = self.tns.as_mut() {
                tns.remove_vertex(vertex);
            }
        }
    }

    // State queries used by visitors.

    pub(crate) fn requireds_exist(&self) -> bool {
        self.requireds_exist
    }

    /// `true` once a full arrival pass has completed.
    pub fn arrivals_exist(&self) -> bool {
        self.arrivals_exist
    }

    /// Commits one arrival visit outcome: stores changed arrivals,
    /// invalidates dependents, and extends the worklist.
    pub(crate) fn commit_arrival(
        &mut self,
        iter: &mut BfsIterator,
        vertex: VertexId,
        outcome: ArrivalOutcome,
    ) {
        let pin = self.graph.vertex(vertex).pin;
        if outcome.changed {
            log::trace!("arrival changed {vertex:?}");
            self.set_vertex_arrivals(vertex, &outcome.bldr);
            self.tns_invalid(vertex);
            self.constrained_requireds_invalid(vertex, outcome.has_clk_tag);
            if outcome.is_latch_data {
                self.enqueue_latch_data_outputs(vertex);
            }
        }
        let enqueue = (!self.arrivals_at_endpoints_exist
            || self.always_to_endpoints
            || outcome.changed)
            && (self.graph.vertex(vertex).is_reg_clk || !self.sdc.is_path_delay_to_pin(pin));
        if enqueue {
            for w in &outcome.fanouts {
                iter.enqueue(self.graph, *w);
            }
        }
        self.enqueue_ref_pin_input_delays(iter, pin);
    }

    /// When a clock arrival changes, required times change for timing
    /// checks, data checks, and gated-clock enables constrained by the pin.
    fn constrained_requireds_invalid(&mut self, vertex: VertexId, is_clk: bool) {
        if !self.requireds_exist {
            return;
        }
        if is_clk {
            for &e in self.graph.out_edges(vertex) {
                let edge = self.graph.edge(e);
                if edge.role.is_timing_check() {
                    self.required_invalid(edge.to);
                }
            }
        }
        let pin = self.graph.vertex(vertex).pin;
        for &to in self.sdc.data_checks_from(pin) {
            if let Some(v) = self.graph.pin_vertex(to) {
                self.required_invalid(v);
            }
        }
        if is_clk && self.sdc.gated_clk_checks_enabled() {
            for &e in self.graph.out_edges(vertex) {
                let to = self.graph.edge(e).to;
                let to_pin = self.graph.vertex(to).pin;
                if self.sdc.is_gated_clk_enable(to_pin) {
                    self.required_invalid(to);
                }
            }
        }
    }

    /// Re-seeds pins whose input delay references `ref_pin`, as if a timing
    /// arc ran from the reference pin to the delayed pin.
    fn enqueue_ref_pin_input_delays(&mut self, iter: &mut BfsIterator, ref_pin: PinId) {
        let ids: Vec<InputDelayId> = self.sdc.ref_pin_input_delays(ref_pin).to_vec();
        for id in ids {
            let input_delay = self.sdc.input_delay(id).clone();
            let pin = input_delay.pin;
            if let Some(vertex) = self.graph.pin_vertex(pin) {
                let mut bldr = TagGroupBldr::new();
                let is_segment_start = !self.network.pin(pin).is_top_level_port;
                self.seed_input_delay_arrival(
                    pin,
                    vertex,
                    Some(&input_delay),
                    is_segment_start,
                    &mut bldr,
                );
                self.set_vertex_arrivals(vertex, &bldr);
                let pred = SearchPred::search_thru_pred();
                for w in self.admitted_fanouts(vertex, pred, None) {
                    iter.enqueue(self.graph, w);
                }
            }
        }
    }

    pub(crate) fn required_init_value(&self, ap: ApIndex) -> Delay {
        delay_init_value(self.ap_min_max(ap).opposite())
    }

    /// Paths are not propagated into a path-delay internal endpoint that is
    /// also a clock source of an unrelated clock.
    pub(crate) fn path_propagated_to_clk_src(&self, pin: PinId, tag: &Tag) -> bool {
        let info = self.pools.clk_info(tag.clk_info);
        if !info.is_gen_clk_src_path
            && tag.input_delay.is_none()
            && self.sdc.is_path_delay_to_pin(pin)
        {
            let clks = self.sdc.vertex_pin_clocks(pin);
            !clks.is_empty() && info.clock().map_or(true, |c| !clks.contains(&c))
        } else {
            false
        }
    }
}
