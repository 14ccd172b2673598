//! End-to-end scenarios for the arrival/required search: combinational
//! max-delay, latch transparency, false paths, CRPR, generated clocks,
//! reference-pin input delays, multicycle paths, and the incremental
//! invariants.

use tempo_common::{Delay, Ident, Interner, MinMax, PerMinMax, TimingSense};
use tempo_diagnostics::DiagnosticSink;
use tempo_graph::{
    Graph, Levelize, Network, PinId, PortDirection, Role, TimingArc, TimingArcSet, VertexId,
};
use tempo_sdc::{
    ClockEdge, ClockId, Corners, ExceptionFrom, ExceptionKind, ExceptionThru, ExceptionTo, Sdc,
};
use tempo_search::{PathEndOptions, Search};

/// A design-under-test builder: network, graph, and constraints together.
struct Bench {
    interner: Interner,
    network: Network,
    graph: Graph,
    sdc: Sdc,
}

impl Bench {
    fn new() -> Self {
        Self {
            interner: Interner::new(),
            network: Network::new(),
            graph: Graph::new(),
            sdc: Sdc::new(Corners::single()),
        }
    }

    fn name(&self, name: &str) -> Ident {
        self.interner.get_or_intern(name)
    }

    fn port(&mut self, name: &str, direction: PortDirection) -> (PinId, VertexId) {
        let pin = self.network.add_port(self.interner.get_or_intern(name), direction);
        let vertex = self.graph.add_vertex(pin);
        (pin, vertex)
    }

    fn pin(&mut self, name: &str, direction: PortDirection) -> (PinId, VertexId) {
        let pin = self.network.add_pin(self.interner.get_or_intern(name), direction);
        let vertex = self.graph.add_vertex(pin);
        (pin, vertex)
    }

    fn reg_clk_pin(&mut self, name: &str) -> (PinId, VertexId) {
        let pin = self
            .network
            .add_pin(self.interner.get_or_intern(name), PortDirection::Input);
        let vertex = self.graph.add_reg_clk_vertex(pin);
        (pin, vertex)
    }

    fn comb(&mut self, from: VertexId, to: VertexId, delay: Delay) {
        self.comb_min_max(from, to, delay, delay);
    }

    fn comb_min_max(&mut self, from: VertexId, to: VertexId, min: Delay, max: Delay) {
        let arcs = self.graph.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::new(min, max),
            1,
        ));
        self.graph.add_edge(from, to, Role::Comb, arcs);
    }

    fn wire(&mut self, from: VertexId, to: VertexId, min: Delay, max: Delay) {
        let arcs = self.graph.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::new(min, max),
            1,
        ));
        self.graph.add_edge(from, to, Role::Wire, arcs);
    }

    /// Rising-edge-triggered launch arc: clock rise to output rise.
    fn clk_to_q(&mut self, clk: VertexId, q: VertexId, delay: Delay) {
        let arcs = self.graph.add_arc_set(TimingArcSet::single(
            tempo_common::RiseFall::Rise,
            tempo_common::RiseFall::Rise,
            PerMinMax::both(delay),
            1,
        ));
        self.graph.add_edge(clk, q, Role::RegClkToQ, arcs);
    }

    /// Latch enable opening (rising) edge to output.
    fn latch_en_to_q(&mut self, en: VertexId, q: VertexId, delay: Delay) {
        let arcs = self.graph.add_arc_set(TimingArcSet::single(
            tempo_common::RiseFall::Rise,
            tempo_common::RiseFall::Rise,
            PerMinMax::both(delay),
            1,
        ));
        self.graph.add_edge(en, q, Role::LatchEnToQ, arcs);
    }

    fn latch_d_to_q(&mut self, d: VertexId, q: VertexId, delay: Delay) {
        let arcs = self.graph.add_arc_set(TimingArcSet::unate(
            TimingSense::PositiveUnate,
            PerMinMax::both(delay),
            1,
        ));
        self.graph.add_edge(d, q, Role::LatchDToQ, arcs);
    }

    fn setup_check(&mut self, clk: VertexId, data: VertexId, margin: Delay) {
        let arcs = self.graph.add_arc_set(TimingArcSet {
            arcs: tempo_common::RiseFall::BOTH
                .iter()
                .map(|&to_tr| TimingArc {
                    from_tr: tempo_common::RiseFall::Rise,
                    to_tr,
                    delays: vec![PerMinMax::both(margin)],
                })
                .collect(),
            sense: TimingSense::PositiveUnate,
        });
        self.graph.add_edge(clk, data, Role::Setup, arcs);
    }

    fn clock(&mut self, name: &str, period: Delay, pin: PinId) -> ClockId {
        let name = self.name(name);
        self.sdc.create_clock(name, period, None, &[pin])
    }

    fn input_delay(&mut self, pin: PinId, clk: Option<ClockId>, delay: Delay) {
        let clk_edge = clk.map(|c| ClockEdge::new(c, tempo_common::RiseFall::Rise));
        self.sdc.set_input_delay(
            pin,
            clk_edge,
            PerMinMax::both(delay),
            None,
            tempo_common::RiseFall::Rise,
            false,
            false,
        );
    }

    fn output_delay(&mut self, pin: PinId, clk: ClockId, min: Delay, max: Delay) {
        self.sdc.set_output_delay(
            pin,
            Some(ClockEdge::new(clk, tempo_common::RiseFall::Rise)),
            PerMinMax::new(min, max),
        );
    }

    fn levelize(&mut self) -> Levelize {
        Levelize::new(&mut self.graph)
    }
}

/// Worst (latest for max, earliest for min) arrival among the vertex's
/// slots in the given direction.
fn worst_arrival(bench: &Bench, search: &Search, vertex: VertexId, min_max: MinMax) -> Delay {
    let group = search.tag_group(vertex).expect("vertex has no arrivals");
    let arrivals = search.arrivals(vertex);
    let mut worst = match min_max {
        MinMax::Max => f64::NEG_INFINITY,
        MinMax::Min => f64::INFINITY,
    };
    for (slot, tag_id) in group.iter() {
        let tag = search.tag(tag_id);
        if bench.sdc.corners().ap(tag.ap).min_max != min_max {
            continue;
        }
        worst = match min_max {
            MinMax::Max => worst.max(arrivals[slot]),
            MinMax::Min => worst.min(arrivals[slot]),
        };
    }
    worst
}

/// Tightest required among the vertex's slots in the given direction.
fn tightest_required(bench: &Bench, search: &Search, vertex: VertexId, min_max: MinMax) -> Delay {
    let group = search.tag_group(vertex).expect("vertex has no arrivals");
    let requireds = search.requireds(vertex).expect("vertex has no requireds");
    let mut tightest = match min_max {
        MinMax::Max => f64::INFINITY,
        MinMax::Min => f64::NEG_INFINITY,
    };
    for (slot, tag_id) in group.iter() {
        let tag = search.tag(tag_id);
        if bench.sdc.corners().ap(tag.ap).min_max != min_max {
            continue;
        }
        tightest = match min_max {
            MinMax::Max => tightest.min(requireds[slot]),
            MinMax::Min => tightest.max(requireds[slot]),
        };
    }
    tightest
}

fn assert_close(actual: Delay, expected: Delay) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// IN -> G1 -> G2 -> OUT with an input delay of 1 and an output delay of 2
/// against a 10 ns clock: arrival 1.9, required 8, slack 6.1.
fn s1_bench() -> (Bench, VertexId, VertexId) {
    let mut bench = Bench::new();
    let (clk_pin, _clk_v) = bench.port("clk", PortDirection::Input);
    let (in_pin, in_v) = bench.port("in", PortDirection::Input);
    let (_g1_pin, g1_v) = bench.pin("g1/Y", PortDirection::Output);
    let (_g2_pin, g2_v) = bench.pin("g2/Y", PortDirection::Output);
    let (out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.comb(in_v, g1_v, 0.4);
    bench.comb(g1_v, g2_v, 0.5);
    bench.wire(g2_v, out_v, 0.0, 0.0);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.input_delay(in_pin, Some(clk), 1.0);
    bench.output_delay(out_pin, clk, 0.0, 2.0);
    (bench, in_v, out_v)
}

#[test]
fn s1_combinational_max_delay() {
    let (mut bench, _in_v, out_v) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), 1.9);
    assert_close(search.wns_slack(out_v, MinMax::Max), 6.1);
}

#[test]
fn s1_required_back_propagation() {
    let (mut bench, in_v, out_v) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    search.find_requireds(0);
    assert_close(tightest_required(&bench, &search, out_v, MinMax::Max), 8.0);
    assert_close(tightest_required(&bench, &search, in_v, MinMax::Max), 7.1);
}

#[test]
fn s1_arrival_slot_count_matches_tag_group() {
    let (mut bench, _, _) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    for vertex in bench.graph.vertex_ids() {
        if let Some(group) = search.tag_group(vertex) {
            assert_eq!(group.tag_count(), search.arrivals(vertex).len());
        }
    }
}

#[test]
fn s1_find_arrivals_twice_is_noop() {
    let (mut bench, _, _) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    let snapshot: Vec<(Option<_>, Vec<Delay>)> = bench
        .graph
        .vertex_ids()
        .map(|v| (search.tag_group_id(v), search.arrivals(v).to_vec()))
        .collect();
    search.find_all_arrivals();
    for (v, (group, arrivals)) in bench.graph.vertex_ids().zip(snapshot) {
        assert_eq!(search.tag_group_id(v), group);
        assert_eq!(search.arrivals(v), &arrivals[..]);
    }
}

#[test]
fn s1_clear_then_find_matches_cold_run() {
    let (mut bench, _, out_v) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    let cold = worst_arrival(&bench, &search, out_v, MinMax::Max);
    search.clear();
    assert!(search.tag_group(out_v).is_none());
    search.find_all_arrivals();
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), cold);
}

/// A latch with its enable opening at 0: Q follows max(D, open) + arc.
fn latch_bench(data_delay: Delay) -> (Bench, VertexId) {
    let mut bench = Bench::new();
    let (din_pin, din_v) = bench.port("din", PortDirection::Input);
    let (_d_pin, d_v) = bench.pin("l1/D", PortDirection::Input);
    let (en_pin, en_v) = bench.reg_clk_pin("l1/EN");
    let (_q_pin, q_v) = bench.pin("l1/Q", PortDirection::Output);
    let (out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.comb(din_v, d_v, 0.0);
    bench.latch_d_to_q(d_v, q_v, 0.2);
    bench.latch_en_to_q(en_v, q_v, 0.0);
    bench.wire(q_v, out_v, 0.0, 0.0);
    let en_clk = bench.clock("en", 10.0, en_pin);
    bench.input_delay(din_pin, None, data_delay);
    bench.output_delay(out_pin, en_clk, 0.0, 0.0);
    (bench, q_v)
}

#[test]
fn s2_latch_transparency() {
    let (mut bench, q_v) = latch_bench(3.0);
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    assert_close(worst_arrival(&bench, &search, q_v, MinMax::Max), 3.2);
}

#[test]
fn s2_latch_time_borrowing() {
    let (mut bench, q_v) = latch_bench(7.0);
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    assert_close(worst_arrival(&bench, &search, q_v, MinMax::Max), 7.2);
}

#[test]
fn latch_min_corner_contributes_nothing() {
    let (mut bench, q_v) = latch_bench(3.0);
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // The min-corner Q arrivals come only from the enable launch at 0; the
    // data path through D->Q is max-corner only.
    assert_close(worst_arrival(&bench, &search, q_v, MinMax::Min), 0.0);
    assert_close(worst_arrival(&bench, &search, q_v, MinMax::Max), 3.2);
}

/// Two parallel paths; a false path -thru P kills the longer one.
fn false_path_bench(install_exception: bool) -> (Bench, VertexId) {
    let mut bench = Bench::new();
    let (clk_pin, _clk_v) = bench.port("clk", PortDirection::Input);
    let (in_pin, in_v) = bench.port("in", PortDirection::Input);
    let (p_pin, p_v) = bench.pin("p/Y", PortDirection::Output);
    let (_b_pin, b_v) = bench.pin("b/Y", PortDirection::Output);
    let (_c_pin, c_v) = bench.pin("c/Y", PortDirection::Output);
    let (out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.comb(in_v, p_v, 0.3);
    bench.comb(p_v, b_v, 0.3);
    bench.wire(b_v, out_v, 0.0, 0.0);
    bench.comb(in_v, c_v, 0.1);
    bench.comb(c_v, out_v, 0.1);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.input_delay(in_pin, Some(clk), 1.0);
    bench.output_delay(out_pin, clk, 0.0, 2.0);
    if install_exception {
        let network = bench.network.clone();
        bench.sdc.add_exception(
            &network,
            ExceptionKind::False,
            None,
            vec![ExceptionThru {
                pins: vec![p_pin],
                tr: None,
            }],
            None,
            None,
        );
    }
    (bench, out_v)
}

#[test]
fn s3_false_path_thru_kills_only_matching_path() {
    let (mut bench, out_v) = false_path_bench(true);
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // Without the exception the worst path is 1 + 0.3 + 0.3 = 1.6; the
    // false -thru leaves only the parallel path 1 + 0.1 + 0.1 = 1.2.
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), 1.2);
    assert_close(search.wns_slack(out_v, MinMax::Max), 8.0 - 1.2);
}

#[test]
fn s3_without_exception_longer_path_wins() {
    let (mut bench, out_v) = false_path_bench(false);
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), 1.6);
}

/// Launch and capture share the clock tree up to X, where the min/max
/// spread is 0.15.
fn crpr_bench(crpr: bool) -> (Bench, VertexId) {
    let mut bench = Bench::new();
    let (clk_pin, clk_v) = bench.port("clk", PortDirection::Input);
    let (_x_pin, x_v) = bench.pin("x/Y", PortDirection::Output);
    let (_ck1_pin, ck1_v) = bench.reg_clk_pin("ff1/CK");
    let (_ck2_pin, ck2_v) = bench.reg_clk_pin("ff2/CK");
    let (_q1_pin, q1_v) = bench.pin("ff1/Q", PortDirection::Output);
    let (_d2_pin, d2_v) = bench.pin("ff2/D", PortDirection::Input);
    bench.wire(clk_v, x_v, 2.85, 3.0);
    bench.wire(x_v, ck1_v, 0.0, 0.0);
    bench.wire(x_v, ck2_v, 0.0, 0.0);
    bench.clk_to_q(ck1_v, q1_v, 1.0);
    bench.comb(q1_v, d2_v, 2.0);
    bench.setup_check(ck2_v, d2_v, 0.5);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.sdc.set_propagated_clock(clk);
    bench.sdc.set_crpr_enabled(crpr);
    (bench, d2_v)
}

#[test]
fn s4_crpr_credit_improves_slack_by_shared_spread() {
    let (mut bench_off, d2_off) = crpr_bench(false);
    let levelize_off = bench_off.levelize();
    let mut search_off = Search::new(
        &bench_off.graph,
        &bench_off.network,
        &bench_off.sdc,
        &levelize_off,
    );
    search_off.find_all_arrivals();
    let slack_off = search_off.wns_slack(d2_off, MinMax::Max);

    let (mut bench_on, d2_on) = crpr_bench(true);
    let levelize_on = bench_on.levelize();
    let mut search_on = Search::new(
        &bench_on.graph,
        &bench_on.network,
        &bench_on.sdc,
        &levelize_on,
    );
    search_on.find_all_arrivals();
    let slack_on = search_on.wns_slack(d2_on, MinMax::Max);

    // Launch: 3.0 + 1.0 + 2.0 = 6.0. Capture: 2.85 + 10 - 0.5 = 12.35.
    assert_close(slack_off, 6.35);
    assert_close(slack_on - slack_off, 0.15);
}

#[test]
fn crpr_inactive_matches_shadowless_arrivals() {
    // With CRPR off, the pruning shadow is never consulted; arrivals are
    // identical between the two configurations.
    let (mut bench_off, d2_off) = crpr_bench(false);
    let levelize_off = bench_off.levelize();
    let mut search_off = Search::new(
        &bench_off.graph,
        &bench_off.network,
        &bench_off.sdc,
        &levelize_off,
    );
    search_off.find_all_arrivals();

    let (mut bench_on, d2_on) = crpr_bench(true);
    let levelize_on = bench_on.levelize();
    let mut search_on = Search::new(
        &bench_on.graph,
        &bench_on.network,
        &bench_on.sdc,
        &levelize_on,
    );
    search_on.find_all_arrivals();

    assert_close(
        worst_arrival(&bench_off, &search_off, d2_off, MinMax::Max),
        worst_arrival(&bench_on, &search_on, d2_on, MinMax::Max),
    );
}

/// Master clk drives a divide-by-2 generated clock through a buffer and a
/// divider flop; both registers are clocked by the generated clock.
#[test]
fn s5_generated_clock_insertion_in_checks() {
    let mut bench = Bench::new();
    let (clk_pin, clk_v) = bench.port("clk", PortDirection::Input);
    let (_dck_pin, dck_v) = bench.reg_clk_pin("div/CK");
    let (dq_pin, dq_v) = bench.pin("div/Q", PortDirection::Output);
    let (_ck1_pin, ck1_v) = bench.reg_clk_pin("ff1/CK");
    let (_ck2_pin, ck2_v) = bench.reg_clk_pin("ff2/CK");
    let (_q1_pin, q1_v) = bench.pin("ff1/Q", PortDirection::Output);
    let (_d2_pin, d2_v) = bench.pin("ff2/D", PortDirection::Input);
    bench.wire(clk_v, dck_v, 1.0, 1.0);
    bench.clk_to_q(dck_v, dq_v, 0.5);
    bench.wire(dq_v, ck1_v, 0.0, 0.0);
    bench.wire(dq_v, ck2_v, 0.0, 0.0);
    bench.clk_to_q(ck1_v, q1_v, 1.0);
    bench.comb(q1_v, d2_v, 2.0);
    bench.setup_check(ck2_v, d2_v, 0.0);
    let master = bench.clock("clk", 10.0, clk_pin);
    bench.sdc.set_propagated_clock(master);
    let gclk_name = bench.name("gclk");
    let gclk = bench
        .sdc
        .create_generated_clock(gclk_name, master, 2, dq_pin);
    bench.sdc.set_propagated_clock(gclk);

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // Generated clock insertion = 1.0 (tree) + 0.5 (divider clk->Q).
    // Launch at ff2/D: 1.5 + 1.0 + 2.0 = 4.5; capture edge at 20 ns.
    assert_close(worst_arrival(&bench, &search, d2_v, MinMax::Max), 4.5);
    // Required: 1.5 + 20 = 21.5; slack 17.0.
    assert_close(search.wns_slack(d2_v, MinMax::Max), 17.0);
    assert_eq!(bench.sdc.clock(gclk).period, 20.0);
}

/// set_input_delay -reference_pin: the arrival measures from the reference
/// pin's propagated clock arrival, not the clock edge.
#[test]
fn s6_input_delay_with_reference_pin() {
    let mut bench = Bench::new();
    let (clk_pin, clk_v) = bench.port("clk", PortDirection::Input);
    let (ref_pin, ref_v) = bench.pin("buf/Y", PortDirection::Output);
    let (p_pin, p_v) = bench.port("p", PortDirection::Input);
    let (_out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.wire(clk_v, ref_v, 0.7, 0.7);
    bench.comb(p_v, out_v, 0.5);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.sdc.set_propagated_clock(clk);
    bench.sdc.set_input_delay(
        p_pin,
        Some(ClockEdge::new(clk, tempo_common::RiseFall::Rise)),
        PerMinMax::both(1.0),
        Some(ref_pin),
        tempo_common::RiseFall::Rise,
        false,
        false,
    );

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // REF's propagated clock arrival is 0.7; P = 0.7 + 1.0, not 0 + 1.0.
    assert_close(worst_arrival(&bench, &search, p_v, MinMax::Max), 1.7);
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), 2.2);
}

/// Registers clocked by an ideal clock with latency: the launch arrival at
/// the data pin folds in insertion + latency even though the clock network
/// was never propagated.
#[test]
fn ideal_clock_folds_insertion_and_latency_at_launch() {
    let mut bench = Bench::new();
    let (clk_pin, clk_v) = bench.port("clk", PortDirection::Input);
    let (_ck_pin, ck_v) = bench.reg_clk_pin("ff/CK");
    let (_q_pin, q_v) = bench.pin("ff/Q", PortDirection::Output);
    let (out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.wire(clk_v, ck_v, 0.0, 0.0);
    bench.clk_to_q(ck_v, q_v, 1.0);
    bench.wire(q_v, out_v, 0.0, 0.0);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.sdc.set_clock_insertion(clk, PerMinMax::both(0.3));
    bench.sdc.set_clock_latency(clk, PerMinMax::both(0.6));
    bench.output_delay(out_pin, clk, 0.0, 0.0);

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // Ideal clock: launch = edge 0 + insertion 0.3 + latency 0.6, then
    // clk->Q 1.0.
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), 1.9);
}

#[test]
fn multicycle_path_moves_capture_edge() {
    let mut bench = Bench::new();
    let (clk_pin, clk_v) = bench.port("clk", PortDirection::Input);
    let (_ck1_pin, ck1_v) = bench.reg_clk_pin("ff1/CK");
    let (_ck2_pin, ck2_v) = bench.reg_clk_pin("ff2/CK");
    let (_q1_pin, q1_v) = bench.pin("ff1/Q", PortDirection::Output);
    let (d2_pin, d2_v) = bench.pin("ff2/D", PortDirection::Input);
    bench.wire(clk_v, ck1_v, 0.0, 0.0);
    bench.wire(clk_v, ck2_v, 0.0, 0.0);
    bench.clk_to_q(ck1_v, q1_v, 1.0);
    bench.comb(q1_v, d2_v, 4.0);
    bench.setup_check(ck2_v, d2_v, 0.5);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.sdc.set_propagated_clock(clk);
    let network = bench.network.clone();
    bench.sdc.add_exception(
        &network,
        ExceptionKind::Multicycle { cycles: 2 },
        Some(ExceptionFrom {
            pins: vec![],
            clocks: vec![clk],
            tr: None,
        }),
        vec![],
        Some(ExceptionTo {
            pins: vec![d2_pin],
            clocks: vec![],
            tr: None,
        }),
        None,
    );

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // Single cycle would give 10 - 0.5 - 5 = 4.5; two cycles add a period.
    assert_close(search.wns_slack(d2_v, MinMax::Max), 14.5);
}

#[test]
fn false_path_from_clock_kills_data_but_not_clock_carrier() {
    let mut bench = Bench::new();
    let (clk_pin, clk_v) = bench.port("clk", PortDirection::Input);
    let (_ck_pin, ck_v) = bench.reg_clk_pin("ff/CK");
    let (_q_pin, q_v) = bench.pin("ff/Q", PortDirection::Output);
    let (out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.wire(clk_v, ck_v, 0.0, 0.0);
    bench.clk_to_q(ck_v, q_v, 1.0);
    bench.wire(q_v, out_v, 0.0, 0.0);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.sdc.set_propagated_clock(clk);
    bench.output_delay(out_pin, clk, 0.0, 0.0);
    let network = bench.network.clone();
    bench.sdc.add_exception(
        &network,
        ExceptionKind::False,
        Some(ExceptionFrom {
            pins: vec![],
            clocks: vec![clk],
            tr: None,
        }),
        vec![],
        None,
        None,
    );

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // The clock tree still carries clock tags...
    let ck_group = search.tag_group(ck_v).expect("clock pin has arrivals");
    assert!(ck_group.has_clk_tag);
    // ...but no data path launches from the register.
    assert!(search.tag_group(q_v).is_none());
}

#[test]
fn path_ends_enumeration_and_grouping() {
    let (mut bench, _in_v, out_v) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    let sink = DiagnosticSink::new();
    let options = PathEndOptions {
        nworst: 2,
        ..PathEndOptions::default()
    };
    let ends = search.find_path_ends(None, vec![], None, &options, &bench.interner, &sink);
    assert!(!ends.is_empty());
    // Worst slack first, all ends at the output port.
    assert_close(ends[0].slack, 6.1);
    assert!(ends.iter().all(|e| e.vertex == out_v));
    assert!(ends.windows(2).all(|w| w[0].slack <= w[1].slack));
}

#[test]
fn filtered_path_ends_respect_thru_and_rerun_cleanly() {
    let (mut bench, out_v) = false_path_bench(false);
    let p_pin = bench.network.find_pin(bench.name("p/Y")).unwrap();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    let sink = DiagnosticSink::new();
    let options = PathEndOptions {
        nworst: 4,
        ..PathEndOptions::default()
    };

    let thru = vec![ExceptionThru {
        pins: vec![p_pin],
        tr: None,
    }];
    let filtered = search.find_path_ends(None, thru, None, &options, &bench.interner, &sink);
    assert!(!filtered.is_empty());
    // Only the path through p: arrival 1.6, slack 8 - 1.6.
    for end in &filtered {
        assert_eq!(end.vertex, out_v);
        assert_close(end.data_arrival, 1.6);
    }

    // A second, unfiltered enumeration sees every path again.
    let all = search.find_path_ends(None, vec![], None, &options, &bench.interner, &sink);
    assert!(all.len() >= filtered.len());
    assert_close(all[0].slack, 8.0 - 1.6);
}

#[test]
fn tns_sums_negative_endpoint_slacks() {
    let mut bench = Bench::new();
    let (clk_pin, _clk_v) = bench.port("clk", PortDirection::Input);
    let (in_pin, in_v) = bench.port("in", PortDirection::Input);
    let (_g_pin, g_v) = bench.pin("g/Y", PortDirection::Output);
    let (out1_pin, out1_v) = bench.port("out1", PortDirection::Output);
    let (out2_pin, out2_v) = bench.port("out2", PortDirection::Output);
    bench.comb(in_v, g_v, 6.0);
    bench.wire(g_v, out1_v, 0.0, 6.0);
    bench.wire(g_v, out2_v, 0.0, 0.0);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.input_delay(in_pin, Some(clk), 0.0);
    bench.output_delay(out1_pin, clk, 0.0, 0.0);
    bench.output_delay(out2_pin, clk, 0.0, 3.0);

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    // out1: arrival 12, required 10, slack -2.
    // out2: arrival 6, required 7, slack +1.
    assert_close(search.wns_slack(out1_v, MinMax::Max), -2.0);
    assert_close(search.wns_slack(out2_v, MinMax::Max), 1.0);
    assert_close(search.total_negative_slack(MinMax::Max), -2.0);
    assert_close(search.worst_slack(MinMax::Max), -2.0);
    assert_eq!(search.worst_slack_vertex(MinMax::Max), Some(out1_v));
}

#[test]
fn unconstrained_endpoints_report_when_enabled() {
    let mut bench = Bench::new();
    let (in_pin, in_v) = bench.port("in", PortDirection::Input);
    let (_out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.comb(in_v, out_v, 1.0);
    bench.input_delay(in_pin, None, 0.5);

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.set_report_unconstrained_paths(true);
    search.find_all_arrivals();
    let mut unconstrained = 0;
    search.visit_path_ends(out_v, &mut |end| {
        if end.is_unconstrained() {
            unconstrained += 1;
        }
    });
    assert!(unconstrained > 0);
}

#[test]
fn interning_structural_equality_is_id_equality() {
    let (mut bench, _, _) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // Re-running the whole search creates no new tags, groups, or clock
    // infos: every structurally-equal object resolves to its existing ID.
    let tags = search.tag_count();
    let groups = search.tag_group_count();
    let infos = search.clk_info_count();
    search.find_all_arrivals();
    assert_eq!(search.tag_count(), tags);
    assert_eq!(search.tag_group_count(), groups);
    assert_eq!(search.clk_info_count(), infos);
}

#[test]
fn broken_combinational_loop_terminates() {
    let mut bench = Bench::new();
    let (in_pin, in_v) = bench.port("in", PortDirection::Input);
    let (a_pin, a_v) = bench.pin("a/Y", PortDirection::Output);
    let (b_pin, b_v) = bench.pin("b/Y", PortDirection::Output);
    let (c_pin, c_v) = bench.pin("c/Y", PortDirection::Output);
    let (_out_pin, out_v) = bench.port("out", PortDirection::Output);
    bench.comb(in_v, a_v, 0.1);
    bench.comb(a_v, b_v, 0.1);
    bench.comb(b_v, c_v, 0.1);
    // Close the loop; levelization breaks it.
    bench.comb(c_v, a_v, 0.1);
    bench.wire(c_v, out_v, 0.0, 0.0);
    bench.input_delay(in_pin, None, 1.0);
    bench.sdc.set_dynamic_loop_breaking(true);
    let network = bench.network.clone();
    bench.sdc.add_exception(
        &network,
        ExceptionKind::Loop,
        None,
        vec![
            ExceptionThru {
                pins: vec![a_pin],
                tr: None,
            },
            ExceptionThru {
                pins: vec![b_pin],
                tr: None,
            },
            ExceptionThru {
                pins: vec![c_pin],
                tr: None,
            },
            ExceptionThru {
                pins: vec![a_pin],
                tr: None,
            },
        ],
        None,
        None,
    );

    let levelize = bench.levelize();
    assert_eq!(levelize.broken_loop_edges().len(), 1);
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    // The search converges: one trip around the loop at most, and the
    // straight-through path reaches the output.
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), 1.3);
}

#[test]
fn clock_only_pass_propagates_clock_tree() {
    let mut bench = Bench::new();
    let (clk_pin, clk_v) = bench.port("clk", PortDirection::Input);
    let (_buf_pin, buf_v) = bench.pin("buf/Y", PortDirection::Output);
    let (_ck_pin, ck_v) = bench.reg_clk_pin("ff/CK");
    let (_q_pin, q_v) = bench.pin("ff/Q", PortDirection::Output);
    bench.wire(clk_v, buf_v, 0.4, 0.4);
    bench.wire(buf_v, ck_v, 0.1, 0.1);
    bench.clk_to_q(ck_v, q_v, 1.0);
    let clk = bench.clock("clk", 10.0, clk_pin);
    bench.sdc.set_propagated_clock(clk);

    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_clk_arrivals();
    // Clock tags reach the register clock pin...
    let group = search.tag_group(ck_v).expect("clock arrivals exist");
    assert!(group.has_clk_tag);
    assert_close(worst_arrival(&bench, &search, ck_v, MinMax::Max), 0.5);
    // ...but the clock-only predicate does not launch data paths.
    assert!(search.tag_group(q_v).is_none());
}

#[test]
fn arrival_invalidation_reconverges_incrementally() {
    let (mut bench, in_v, out_v) = s1_bench();
    let levelize = bench.levelize();
    let mut search = Search::new(&bench.graph, &bench.network, &bench.sdc, &levelize);
    search.find_all_arrivals();
    let before = worst_arrival(&bench, &search, out_v, MinMax::Max);
    search.arrival_invalid(in_v);
    search.find_all_arrivals();
    assert_close(worst_arrival(&bench, &search, out_v, MinMax::Max), before);
}
