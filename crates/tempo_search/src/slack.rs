//! Slack aggregation: per-endpoint worst slack, total negative slack, and
//! worst slack over the design.
//!
//! Both aggregates are maintained incrementally: a vertex whose arrival or
//! required changed lands in the invalid set, and the next query subtracts
//! its previous contribution, recomputes its endpoint slack, and adds the
//! new contribution back.

use crate::search::Search;
use rustc_hash::FxHashMap;
use tempo_common::{fuzzy_less, Delay, MinMax, PerMinMax};
use tempo_graph::VertexId;

/// Total negative slack per analysis direction, with the per-endpoint
/// contributions remembered for incremental update.
#[derive(Default)]
pub(crate) struct Tns {
    totals: PerMinMax<Delay>,
    contributions: FxHashMap<VertexId, PerMinMax<Delay>>,
}

impl Tns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a vertex's contribution (before its slack changes or the
    /// vertex stops being an endpoint).
    pub fn remove_vertex(&mut self, vertex: VertexId) {
        if let Some(contribution) = self.contributions.remove(&vertex) {
            for min_max in MinMax::BOTH {
                let slack = contribution.get(min_max);
                if fuzzy_less(slack, 0.0) {
                    self.totals.set(min_max, self.totals.get(min_max) - slack);
                }
            }
        }
    }

    /// Adds a vertex's endpoint slacks.
    pub fn add_vertex(&mut self, vertex: VertexId, slacks: PerMinMax<Delay>) {
        for min_max in MinMax::BOTH {
            let slack = slacks.get(min_max);
            if fuzzy_less(slack, 0.0) {
                self.totals.set(min_max, self.totals.get(min_max) + slack);
            }
        }
        self.contributions.insert(vertex, slacks);
    }

    pub fn total(&self, min_max: MinMax) -> Delay {
        self.totals.get(min_max)
    }
}

/// Worst endpoint slack per analysis direction.
#[derive(Default)]
pub(crate) struct WorstSlacks {
    slacks: FxHashMap<VertexId, PerMinMax<Delay>>,
}

impl WorstSlacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_vertex(&mut self, vertex: VertexId) {
        self.slacks.remove(&vertex);
    }

    pub fn update_vertex(&mut self, vertex: VertexId, slacks: PerMinMax<Delay>) {
        self.slacks.insert(vertex, slacks);
    }

    pub fn worst(&self, min_max: MinMax) -> (Delay, Option<VertexId>) {
        let mut worst = f64::INFINITY;
        let mut worst_vertex = None;
        for (&vertex, slacks) in &self.slacks {
            let slack = slacks.get(min_max);
            if slack < worst {
                worst = slack;
                worst_vertex = Some(vertex);
            }
        }
        (worst, worst_vertex)
    }
}

impl Search<'_> {
    /// The worst slack among this endpoint's path ends, per direction.
    /// Endpoints with no constrained ends report infinite slack.
    pub fn wns_slacks(&self, vertex: VertexId) -> PerMinMax<Delay> {
        let mut slacks = PerMinMax::both(f64::INFINITY);
        self.visit_path_ends(vertex, &mut |end| {
            if !end.is_unconstrained() && end.slack < slacks.get(end.min_max) {
                slacks.set(end.min_max, end.slack);
            }
        });
        slacks
    }

    /// The worst slack at one endpoint for one direction.
    pub fn wns_slack(&mut self, vertex: VertexId, min_max: MinMax) -> Delay {
        self.wns_tns_preamble();
        self.wns_slacks(vertex).get(min_max)
    }

    /// Total negative slack: the sum of negative endpoint worst-slacks.
    pub fn total_negative_slack(&mut self, min_max: MinMax) -> Delay {
        self.wns_tns_preamble();
        if self.tns.is_some() {
            self.update_invalid_tns();
        } else {
            self.find_total_negative_slacks();
        }
        self.tns.as_ref().map_or(0.0, |tns| tns.total(min_max))
    }

    /// Worst endpoint slack over the design.
    pub fn worst_slack(&mut self, min_max: MinMax) -> Delay {
        self.worst_slack_preamble();
        self.worst_slacks
            .as_ref()
            .map_or(f64::INFINITY, |ws| ws.worst(min_max).0)
    }

    /// The endpoint with the worst slack.
    pub fn worst_slack_vertex(&mut self, min_max: MinMax) -> Option<VertexId> {
        self.worst_slack_preamble();
        self.worst_slacks
            .as_ref()
            .and_then(|ws| ws.worst(min_max).1)
    }

    fn wns_tns_preamble(&mut self) {
        self.find_all_arrivals();
        if !self.requireds_exist() {
            return;
        }
        // Required times are only needed at endpoints; revalidate the ones
        // whose arrivals moved and leave the rest queued.
        let snapshot: Vec<VertexId> = {
            let set = self.invalid_requireds.lock().unwrap();
            let mut v: Vec<VertexId> = set.iter().copied().collect();
            v.sort();
            v
        };
        for vertex in snapshot {
            if self.is_endpoint(vertex) {
                self.seed_required_enqueue_fanin(vertex);
                self.invalid_requireds.lock().unwrap().remove(&vertex);
            }
        }
    }

    fn worst_slack_preamble(&mut self) {
        self.wns_tns_preamble();
        if self.worst_slacks.is_some() {
            self.update_invalid_tns();
        } else {
            let mut worst = WorstSlacks::new();
            let endpoints: Vec<VertexId> = {
                let mut v: Vec<VertexId> = self.endpoints().iter().copied().collect();
                v.sort();
                v
            };
            for vertex in endpoints {
                worst.update_vertex(vertex, self.wns_slacks(vertex));
            }
            self.worst_slacks = Some(worst);
        }
    }

    fn find_total_negative_slacks(&mut self) {
        let endpoints: Vec<VertexId> = {
            let mut v: Vec<VertexId> = self.endpoints().iter().copied().collect();
            v.sort();
            v
        };
        let mut tns = Tns::new();
        for vertex in endpoints {
            tns.add_vertex(vertex, self.wns_slacks(vertex));
        }
        self.tns = Some(tns);
    }

    /// Incremental update: subtract the stale contribution, recompute the
    /// endpoint's slack, add the new one. Vertices that stopped being
    /// endpoints just drop out.
    fn update_invalid_tns(&mut self) {
        let invalid: Vec<VertexId> = {
            let mut set = self.invalid_tns.lock().unwrap();
            let mut v: Vec<VertexId> = set.drain().collect();
            v.sort();
            v
        };
        for vertex in invalid {
            let is_endpoint = self.is_endpoint(vertex);
            let slacks = is_endpoint.then(|| self.wns_slacks(vertex));
            if let Some(tns) = &mut self.tns {
                tns.remove_vertex(vertex);
            }
            if let Some(worst) = &mut self.worst_slacks {
                worst.remove_vertex(vertex);
            }
            if let Some(slacks) = slacks {
                if let Some(tns) = &mut self.tns {
                    tns.add_vertex(vertex, slacks);
                }
                if let Some(worst) = &mut self.worst_slacks {
                    worst.update_vertex(vertex, slacks);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tns_accumulates_negative_only() {
        let mut tns = Tns::new();
        tns.add_vertex(VertexId::from_raw(0), PerMinMax::new(1.0, -2.0));
        tns.add_vertex(VertexId::from_raw(1), PerMinMax::new(-0.5, -1.0));
        assert_eq!(tns.total(MinMax::Max), -3.0);
        assert_eq!(tns.total(MinMax::Min), -0.5);
    }

    #[test]
    fn tns_remove_restores() {
        let mut tns = Tns::new();
        tns.add_vertex(VertexId::from_raw(0), PerMinMax::new(0.0, -2.0));
        tns.remove_vertex(VertexId::from_raw(0));
        assert_eq!(tns.total(MinMax::Max), 0.0);
    }

    #[test]
    fn tns_update_replaces_contribution() {
        let mut tns = Tns::new();
        let v = VertexId::from_raw(3);
        tns.add_vertex(v, PerMinMax::new(0.0, -2.0));
        tns.remove_vertex(v);
        tns.add_vertex(v, PerMinMax::new(0.0, -0.5));
        assert!((tns.total(MinMax::Max) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn worst_slack_scans() {
        let mut worst = WorstSlacks::new();
        worst.update_vertex(VertexId::from_raw(0), PerMinMax::both(1.0));
        worst.update_vertex(VertexId::from_raw(1), PerMinMax::both(-0.25));
        let (slack, vertex) = worst.worst(MinMax::Max);
        assert_eq!(slack, -0.25);
        assert_eq!(vertex, Some(VertexId::from_raw(1)));
    }
}
