//! Path-end enumeration: filters, grouping, and ranking.
//!
//! `find_path_ends` is the report-facing entry point: it installs a filter
//! exception when `-from` pins or `-thru` points are given (running a
//! filtered arrival pass seeded at the first exception point), walks the
//! endpoint set, and returns path ends grouped by capture clock and ranked
//! by slack.

use crate::path_end::{PathEnd, PathEndKind};
use crate::search::{Search, FILTER_EXCEPTION_ID};
use rustc_hash::{FxHashMap, FxHashSet};
use tempo_common::{Delay, Interner, MinMax};
use tempo_graph::{PinId, VertexId};
use tempo_sdc::{
    ClockId, CornerId, ExceptionFrom, ExceptionKind, ExceptionPath, ExceptionThru, ExceptionTo,
};

/// Options for path-end enumeration.
#[derive(Clone, Debug)]
pub struct PathEndOptions {
    /// Restrict to one corner, or all corners when `None`.
    pub corner: Option<CornerId>,
    /// Restrict to one analysis direction, or both when `None`.
    pub min_max: Option<MinMax>,
    /// Maximum path ends per group.
    pub max_paths: usize,
    /// Maximum path ends per endpoint.
    pub nworst: usize,
    /// Keep only the worst end per endpoint pin.
    pub unique_pins: bool,
    /// Keep only ends with slack at or above this bound.
    pub slack_min: Delay,
    /// Keep only ends with slack at or below this bound.
    pub slack_max: Delay,
    /// Sort the final sequence by slack (otherwise group order and
    /// arrival).
    pub sort_by_slack: bool,
    /// Restrict to the named path groups (capture clock names).
    pub group_names: Option<Vec<String>>,
    /// Include max-direction (setup-style) ends.
    pub setup: bool,
    /// Include min-direction (hold-style) ends.
    pub hold: bool,
}

impl Default for PathEndOptions {
    fn default() -> Self {
        Self {
            corner: None,
            min_max: None,
            max_paths: usize::MAX,
            nworst: 1,
            unique_pins: false,
            slack_min: f64::NEG_INFINITY,
            slack_max: f64::INFINITY,
            sort_by_slack: true,
            group_names: None,
            setup: true,
            hold: false,
        }
    }
}

/// The group a path end reports under.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum PathGroupKey {
    Clock(ClockId),
    PathDelay,
    Unclocked,
    Unconstrained,
}

impl<'a> Search<'a> {
    /// Enumerates the worst path ends matching the given from/thru/to
    /// patterns and options. Constraint warnings recorded during the
    /// search are surfaced into `sink`.
    pub fn find_path_ends(
        &mut self,
        from: Option<ExceptionFrom>,
        thrus: Vec<ExceptionThru>,
        to: Option<ExceptionTo>,
        options: &PathEndOptions,
        interner: &Interner,
        sink: &tempo_diagnostics::DiagnosticSink,
    ) -> Vec<PathEnd> {
        // Results and filtered arrivals of the previous enumeration die
        // here so a new filter pass starts clean.
        self.delete_filtered_arrivals();
        let use_filter = from.as_ref().is_some_and(|f| f.has_pins()) || !thrus.is_empty();
        self.filter_from = from.clone();
        self.filter_to = to.clone();
        if use_filter {
            self.filter = Some(ExceptionPath {
                id: FILTER_EXCEPTION_ID,
                kind: ExceptionKind::Filter,
                from,
                thrus,
                to: None,
                min_max: None,
            });
            self.find_filtered_arrivals();
        } else {
            self.find_all_arrivals();
        }
        let ends = self.make_path_ends(options, interner);
        for diag in self.sdc.take_warnings() {
            sink.emit(diag);
        }
        ends
    }

    /// Runs the arrival search restricted to paths reaching the filter's
    /// first exception point, seeding at its fanin drivers.
    fn find_filtered_arrivals(&mut self) {
        self.find_arrivals(self.levelize.max_level());
        self.seed_filter_starts();
        // Search always-to-endpoints so existing arrivals at the filter
        // startpoints re-reach the -thru/-to endpoints.
        self.always_to_endpoints = true;
        self.find_all_arrivals();
        self.always_to_endpoints = false;
    }

    fn seed_filter_starts(&mut self) {
        let first_pins: Vec<PinId> = match &self.filter {
            Some(filter) => match (&filter.from, filter.thrus.first()) {
                (Some(from), _) if from.has_pins() => from.pins.clone(),
                (_, Some(thru)) => thru.pins.clone(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        };
        let mut vertices: Vec<VertexId> = Vec::new();
        for pin in first_pins {
            for drvr in self.network.drvr_pins(pin) {
                if let Some(v) = self.graph.pin_vertex(drvr) {
                    vertices.push(v);
                }
                if let Some(v) = self.graph.pin_bidirect_drvr_vertex(drvr) {
                    vertices.push(v);
                }
            }
        }
        vertices.sort();
        vertices.dedup();
        for vertex in vertices {
            self.seed_arrival(vertex);
        }
    }

    /// Deletes paths, tags, groups, and clock infos created by the previous
    /// filter pass so the next enumeration starts from unfiltered state.
    pub fn delete_filtered_arrivals(&mut self) {
        if self.filter.is_some() {
            for vertex in self.graph.vertex_ids() {
                let has_filter = self
                    .tag_group(vertex)
                    .is_some_and(|group| group.has_filter_tag);
                if has_filter {
                    self.delete_paths(vertex);
                    self.arrival_invalid(vertex);
                    self.required_invalid(vertex);
                }
            }
            self.pools.delete_filter_objects();
        }
        self.filter = None;
        self.filter_from = None;
        self.filter_to = None;
    }

    fn make_path_ends(&mut self, options: &PathEndOptions, interner: &Interner) -> Vec<PathEnd> {
        let endpoints: Vec<VertexId> = {
            let mut v: Vec<VertexId> = self.endpoints().iter().copied().collect();
            v.sort();
            v
        };
        let mut collected: Vec<PathEnd> = Vec::new();
        for vertex in endpoints {
            self.visit_path_ends(vertex, &mut |end| {
                if self.accept_path_end(end, options) {
                    collected.push(end.clone());
                }
            });
        }

        // Group, then rank within each group.
        let mut groups: FxHashMap<PathGroupKey, Vec<PathEnd>> = FxHashMap::default();
        for end in collected {
            groups.entry(group_key(&end)).or_default().push(end);
        }
        let mut ends = Vec::new();
        let mut keys: Vec<PathGroupKey> = groups.keys().cloned().collect();
        keys.sort_by_key(|k| match k {
            PathGroupKey::Clock(clk) => (0, clk.as_raw()),
            PathGroupKey::PathDelay => (1, 0),
            PathGroupKey::Unclocked => (2, 0),
            PathGroupKey::Unconstrained => (3, 0),
        });
        for key in keys {
            if let Some(names) = &options.group_names {
                let name = self.group_name(&key, interner);
                if !names.iter().any(|n| n == &name) {
                    continue;
                }
            }
            let mut group = groups.remove(&key).unwrap_or_default();
            rank_group(&mut group, options, self.graph);
            ends.extend(group);
        }
        if options.sort_by_slack {
            ends.sort_by(|a, b| a.slack.total_cmp(&b.slack));
        }
        ends
    }

    fn group_name(&self, key: &PathGroupKey, interner: &Interner) -> String {
        match key {
            PathGroupKey::Clock(clk) => interner.resolve(self.sdc.clock(*clk).name).to_string(),
            PathGroupKey::PathDelay => "path delay".to_string(),
            PathGroupKey::Unclocked => "unclocked".to_string(),
            PathGroupKey::Unconstrained => "unconstrained".to_string(),
        }
    }

    fn accept_path_end(&self, end: &PathEnd, options: &PathEndOptions) -> bool {
        match end.min_max {
            MinMax::Max if !options.setup => return false,
            MinMax::Min if !options.hold => return false,
            _ => {}
        }
        if let Some(min_max) = options.min_max {
            if end.min_max != min_max {
                return false;
            }
        }
        if let Some(corner) = options.corner {
            let tag = self.pools.tag(end.tag);
            if self.sdc.corners().ap(tag.ap).corner != corner {
                return false;
            }
        }
        if end.slack < options.slack_min || end.slack > options.slack_max {
            return false;
        }
        if end.is_unconstrained() && !self.report_unconstrained_paths {
            return false;
        }
        self.matches_filter(end)
    }

    /// Applies the installed filter (or clock-only / to-only patterns kept
    /// outside the tag-carried filter) to a candidate path end.
    fn matches_filter(&self, end: &PathEnd) -> bool {
        if let Some(filter) = &self.filter {
            // The path must have been tagged by traversing the filter's
            // exception points.
            let tag = self.pools.tag(end.tag);
            let complete = tag.states.iter().any(|state| {
                state.exception == FILTER_EXCEPTION_ID && filter.thrus_complete(*state)
            });
            return complete && self.matches_filter_to(end);
        }
        if let Some(from) = &self.filter_from {
            // -from clocks: match the launch clock edge.
            let clocks_match = end
                .launch_clk_edge
                .is_some_and(|edge| from.clocks.contains(&edge.clock));
            let tr_match = from.tr.map_or(true, |tr| {
                end.launch_clk_edge.is_some_and(|edge| edge.tr == tr)
            });
            return clocks_match && tr_match && self.matches_filter_to(end);
        }
        self.matches_filter_to(end)
    }

    fn matches_filter_to(&self, end: &PathEnd) -> bool {
        match &self.filter_to {
            None => true,
            Some(to) => {
                let pin = self.graph.vertex(end.vertex).pin;
                let tag = self.pools.tag(end.tag);
                to.matches(pin, end.capture_clk_edge, tag.tr)
            }
        }
    }
}

fn group_key(end: &PathEnd) -> PathGroupKey {
    match &end.kind {
        PathEndKind::PathDelay { .. } => PathGroupKey::PathDelay,
        PathEndKind::Unconstrained => PathGroupKey::Unconstrained,
        PathEndKind::Check { .. } | PathEndKind::OutputDelay { .. } => {
            match end.capture_clk_edge {
                Some(edge) => PathGroupKey::Clock(edge.clock),
                None => PathGroupKey::Unclocked,
            }
        }
    }
}

/// Ranks one group: worst slack first (or latest arrival when unsorted),
/// capped per endpoint, per pin, and per group.
fn rank_group(group: &mut Vec<PathEnd>, options: &PathEndOptions, graph: &tempo_graph::Graph) {
    if options.sort_by_slack {
        group.sort_by(|a, b| a.slack.total_cmp(&b.slack));
    } else {
        group.sort_by(|a, b| b.data_arrival.total_cmp(&a.data_arrival));
    }
    let mut per_endpoint: FxHashMap<VertexId, usize> = FxHashMap::default();
    let mut seen_pins: FxHashSet<tempo_graph::PinId> = FxHashSet::default();
    group.retain(|end| {
        let count = per_endpoint.entry(end.vertex).or_insert(0);
        if *count >= options.nworst {
            return false;
        }
        if options.unique_pins {
            let pin = graph.vertex(end.vertex).pin;
            if !seen_pins.insert(pin) {
                return false;
            }
        }
        *count += 1;
        true
    });
    group.truncate(options.max_paths);
}
