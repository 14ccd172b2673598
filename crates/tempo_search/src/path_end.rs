//! Path ends: the checks that terminate timing paths.
//!
//! A path end pairs a data path at an endpoint with the constraint that
//! governs it: a setup/hold check against a capture clock path, an output
//! delay budget, a path-delay override, or nothing (unconstrained). The
//! required time and slack are computed here, including cycle accounting
//! for multicycle exceptions and the CRPR credit between launch and capture
//! clock paths.

use crate::clk_info::PathRep;
use crate::pool::TagId;
use crate::search::Search;
use crate::tag::Tag;
use tempo_common::{delay_init_value, Delay, MinMax, RiseFall};
use tempo_graph::{PinId, Role, VertexId};
use tempo_sdc::{ClockEdge, ExceptionId, ExceptionKind, ExceptionPath};

/// What constrains a path end.
#[derive(Clone, Debug)]
pub enum PathEndKind {
    /// A timing check arc (setup/hold/recovery/removal) against a capture
    /// clock path.
    Check {
        /// The check arc's role.
        role: Role,
        /// The clock pin the check is measured against.
        clk_pin: PinId,
        /// The check margin from the arc.
        margin: Delay,
    },
    /// An output-delay budget at a port.
    OutputDelay {
        /// The external delay budget.
        margin: Delay,
    },
    /// A min/max path-delay exception override.
    PathDelay {
        /// The governing exception.
        exception: ExceptionId,
    },
    /// No constraint terminates this path.
    Unconstrained,
}

/// One enumerated path end: a data path at an endpoint with its governing
/// check, required time, and slack.
#[derive(Clone, Debug)]
pub struct PathEnd {
    /// The endpoint vertex.
    pub vertex: VertexId,
    /// The data path's tag.
    pub tag: TagId,
    /// The data path's arrival slot at the endpoint.
    pub slot: usize,
    /// The analysis direction of the data path.
    pub min_max: MinMax,
    /// The data arrival time.
    pub data_arrival: Delay,
    /// The required time of the check.
    pub required: Delay,
    /// Slack: `required − arrival` for max paths, `arrival − required` for
    /// min paths.
    pub slack: Delay,
    /// The launch clock edge, if the path is clocked.
    pub launch_clk_edge: Option<ClockEdge>,
    /// The capture clock edge, if the check is clock-derived.
    pub capture_clk_edge: Option<ClockEdge>,
    /// The CRPR credit folded into the required time.
    pub crpr: Delay,
    /// The governing constraint.
    pub kind: PathEndKind,
}

impl PathEnd {
    /// Returns `true` for unconstrained path ends.
    pub fn is_unconstrained(&self) -> bool {
        matches!(self.kind, PathEndKind::Unconstrained)
    }
}

fn end_slack(min_max: MinMax, arrival: Delay, required: Delay) -> Delay {
    match min_max {
        MinMax::Max => required - arrival,
        MinMax::Min => arrival - required,
    }
}

impl Search<'_> {
    /// Visits every path end at `vertex`: one per (data tag, governing
    /// check) pair.
    pub fn visit_path_ends(&self, vertex: VertexId, visitor: &mut dyn FnMut(&PathEnd)) {
        let Some(group) = self.tag_group(vertex) else {
            return;
        };
        let pin = self.graph.vertex(vertex).pin;
        for (slot, tag_id) in group.iter() {
            let tag = self.pools.tag(tag_id);
            if tag.is_clk {
                continue;
            }
            let min_max = self.ap_min_max(tag.ap);
            let arrival = self.arrivals(vertex)[slot];
            let mut produced = false;

            self.visit_check_ends(
                vertex, pin, slot, tag_id, &tag, min_max, arrival, &mut produced, visitor,
            );
            self.visit_output_delay_ends(
                vertex, pin, slot, tag_id, &tag, min_max, arrival, &mut produced, visitor,
            );
            self.visit_path_delay_ends(
                vertex, pin, slot, tag_id, &tag, min_max, arrival, &mut produced, visitor,
            );

            if !produced && self.report_unconstrained_paths {
                let required = delay_init_value(min_max.opposite());
                let end = PathEnd {
                    vertex,
                    tag: tag_id,
                    slot,
                    min_max,
                    data_arrival: arrival,
                    required,
                    slack: end_slack(min_max, arrival, required),
                    launch_clk_edge: self.launch_edge(&tag),
                    capture_clk_edge: None,
                    crpr: 0.0,
                    kind: PathEndKind::Unconstrained,
                };
                visitor(&end);
            }
        }
    }

    fn launch_edge(&self, tag: &Tag) -> Option<ClockEdge> {
        self.pools.clk_info(tag.clk_info).clk_edge
    }

    /// Path ends from timing-check arcs into the endpoint.
    #[allow(clippy::too_many_arguments)]
    fn visit_check_ends(
        &self,
        vertex: VertexId,
        pin: PinId,
        slot: usize,
        tag_id: TagId,
        tag: &Tag,
        min_max: MinMax,
        arrival: Delay,
        produced: &mut bool,
        visitor: &mut dyn FnMut(&PathEnd),
    ) {
        let corner = self.ap_corner(tag.ap);
        for &e in self.graph.in_edges(vertex) {
            let edge = self.graph.edge(e);
            if !edge.role.is_timing_check() {
                continue;
            }
            let check_min_max = if edge.role.is_max_check() {
                MinMax::Max
            } else {
                MinMax::Min
            };
            if check_min_max != min_max {
                continue;
            }
            let clk_vertex = edge.from;
            let clk_pin = self.graph.vertex(clk_vertex).pin;
            let Some(clk_group) = self.tag_group(clk_vertex) else {
                continue;
            };
            let arc_set = self.graph.arc_set(edge.arc_set);
            for arc in &arc_set.arcs {
                if arc.to_tr != tag.tr {
                    continue;
                }
                let clk_tr = arc.from_tr;
                let margin = self.graph.arc_delay(arc, corner, MinMax::Max);
                // Capture pairs with the opposite analysis direction in the
                // same corner: setup captures early, hold captures late.
                let cap_ap = self.sdc.corners().ap_opposite(tag.ap);
                for (_cap_slot, cap_tag_id) in clk_group.iter() {
                    let cap_tag = self.pools.tag(cap_tag_id);
                    if !cap_tag.is_clk || cap_tag.tr != clk_tr || cap_tag.ap != cap_ap {
                        continue;
                    }
                    let cap_info = self.pools.clk_info(cap_tag.clk_info);
                    let Some(cap_edge) = cap_info.clk_edge else {
                        continue;
                    };
                    let exception = self.exception_to(tag, pin, tag.tr, Some(cap_edge), min_max);
                    if exception
                        .is_some_and(|exc| exc.kind.is_false() || exc.kind.is_loop())
                    {
                        continue;
                    }
                    if let Some(exc) = exception {
                        if let ExceptionKind::PathDelay {
                            delay,
                            min_max: exc_min_max,
                            ..
                        } = exc.kind
                        {
                            if exc_min_max == min_max {
                                let end = self.path_delay_end(
                                    vertex, slot, tag_id, tag, min_max, arrival, delay, exc,
                                );
                                visitor(&end);
                                *produced = true;
                                continue;
                            }
                        }
                    }
                    let cycles = match exception.map(|exc| &exc.kind) {
                        Some(ExceptionKind::Multicycle { cycles }) => *cycles,
                        _ => 1,
                    };
                    let cap_path = PathRep {
                        vertex: clk_vertex,
                        tag: cap_tag_id,
                    };
                    let cap_arrival = self.clk_path_arrival(cap_path);
                    let period = self.sdc.clock(cap_edge.clock).period;
                    let uncertainty = self.sdc.clock_uncertainty(cap_edge.clock, Some(clk_pin));
                    let crpr = if self.crpr_active() {
                        self.check_crpr(tag, cap_path)
                    } else {
                        0.0
                    };
                    let required = match min_max {
                        MinMax::Max => {
                            cap_arrival + period * cycles as f64
                                - margin
                                - uncertainty.setup
                                + crpr
                        }
                        MinMax::Min => cap_arrival + margin + uncertainty.hold - crpr,
                    };
                    let end = PathEnd {
                        vertex,
                        tag: tag_id,
                        slot,
                        min_max,
                        data_arrival: arrival,
                        required,
                        slack: end_slack(min_max, arrival, required),
                        launch_clk_edge: self.launch_edge(tag),
                        capture_clk_edge: Some(cap_edge),
                        crpr,
                        kind: PathEndKind::Check {
                            role: edge.role,
                            clk_pin,
                            margin,
                        },
                    };
                    visitor(&end);
                    *produced = true;
                }
            }
        }
    }

    /// Path ends from output-delay budgets at the endpoint.
    #[allow(clippy::too_many_arguments)]
    fn visit_output_delay_ends(
        &self,
        vertex: VertexId,
        pin: PinId,
        slot: usize,
        tag_id: TagId,
        tag: &Tag,
        min_max: MinMax,
        arrival: Delay,
        produced: &mut bool,
        visitor: &mut dyn FnMut(&PathEnd),
    ) {
        let output_delays: Vec<(Option<ClockEdge>, Delay)> = self
            .sdc
            .pin_output_delays(pin)
            .map(|od| (od.clk_edge, od.delay.get(min_max)))
            .collect();
        for (clk_edge, margin) in output_delays {
            let exception = self.exception_to(tag, pin, tag.tr, clk_edge, min_max);
            if exception.is_some_and(|exc| exc.kind.is_false() || exc.kind.is_loop()) {
                continue;
            }
            if let Some(exc) = exception {
                if let ExceptionKind::PathDelay {
                    delay,
                    min_max: exc_min_max,
                    ..
                } = exc.kind
                {
                    if exc_min_max == min_max {
                        let end = self.path_delay_end(
                            vertex, slot, tag_id, tag, min_max, arrival, delay, exc,
                        );
                        visitor(&end);
                        *produced = true;
                        continue;
                    }
                }
            }
            let cycles = match exception.map(|exc| &exc.kind) {
                Some(ExceptionKind::Multicycle { cycles }) => *cycles,
                _ => 1,
            };
            let (base, capture_edge) = match clk_edge {
                Some(edge) => {
                    let latency =
                        self.sdc.clock_latency(edge.clock, None, min_max.opposite());
                    (self.sdc.clock_edge_time(edge) + latency, Some(edge))
                }
                None => (0.0, None),
            };
            let required = match min_max {
                MinMax::Max => {
                    let period = capture_edge
                        .map_or(0.0, |edge| self.sdc.clock(edge.clock).period);
                    base + period * cycles as f64 - margin
                }
                MinMax::Min => base + margin,
            };
            let end = PathEnd {
                vertex,
                tag: tag_id,
                slot,
                min_max,
                data_arrival: arrival,
                required,
                slack: end_slack(min_max, arrival, required),
                launch_clk_edge: self.launch_edge(tag),
                capture_clk_edge: capture_edge,
                crpr: 0.0,
                kind: PathEndKind::OutputDelay { margin },
            };
            visitor(&end);
            *produced = true;
        }
    }

    /// Path ends from path-delay exceptions at endpoints with no check arc
    /// or output delay of their own.
    #[allow(clippy::too_many_arguments)]
    fn visit_path_delay_ends(
        &self,
        vertex: VertexId,
        pin: PinId,
        slot: usize,
        tag_id: TagId,
        tag: &Tag,
        min_max: MinMax,
        arrival: Delay,
        produced: &mut bool,
        visitor: &mut dyn FnMut(&PathEnd),
    ) {
        if *produced || !self.sdc.is_path_delay_to_pin(pin) {
            return;
        }
        let Some(exc) = self.exception_to(tag, pin, tag.tr, None, min_max) else {
            return;
        };
        if let ExceptionKind::PathDelay {
            delay,
            min_max: exc_min_max,
            ..
        } = exc.kind
        {
            if exc_min_max == min_max {
                let end =
                    self.path_delay_end(vertex, slot, tag_id, tag, min_max, arrival, delay, exc);
                visitor(&end);
                *produced = true;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn path_delay_end(
        &self,
        vertex: VertexId,
        slot: usize,
        tag_id: TagId,
        tag: &Tag,
        min_max: MinMax,
        arrival: Delay,
        delay: Delay,
        exception: &ExceptionPath,
    ) -> PathEnd {
        PathEnd {
            vertex,
            tag: tag_id,
            slot,
            min_max,
            data_arrival: arrival,
            required: delay,
            slack: end_slack(min_max, arrival, delay),
            launch_clk_edge: self.launch_edge(tag),
            capture_clk_edge: None,
            crpr: 0.0,
            kind: PathEndKind::PathDelay {
                exception: exception.id,
            },
        }
    }

    /// Resolves the highest-priority exception governing a path end: the
    /// states carried by the path whose thrus are satisfied and whose `-to`
    /// matches the end, plus `-to`-only exceptions installed on the
    /// endpoint or capture clock.
    pub(crate) fn exception_to(
        &self,
        tag: &Tag,
        pin: PinId,
        tr: RiseFall,
        cap_edge: Option<ClockEdge>,
        min_max: MinMax,
    ) -> Option<&ExceptionPath> {
        let mut best: Option<&ExceptionPath> = None;
        for &state in &tag.states {
            let exc = self.exception(state.exception);
            if exc.kind.is_filter()
                || !exc.matches_min_max(min_max)
                || !exc.thrus_complete(state)
            {
                continue;
            }
            if let Some(to) = &exc.to {
                if !to.matches(pin, cap_edge, tr) {
                    continue;
                }
            }
            if best.map_or(true, |b| exc.priority() > b.priority()) {
                best = Some(exc);
            }
        }
        for exc in self.sdc.exceptions() {
            if exc.from.is_some() || !exc.thrus.is_empty() || !exc.matches_min_max(min_max) {
                continue;
            }
            let Some(to) = &exc.to else { continue };
            if !to.matches(pin, cap_edge, tr) {
                continue;
            }
            if best.map_or(true, |b| exc.priority() > b.priority()) {
                best = Some(exc);
            }
        }
        best
    }
}
