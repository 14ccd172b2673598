//! The constraint container the search core consumes.
//!
//! Holds clocks, I/O delays, exceptions, derates, clock-stop rules, and the
//! option flags that steer the search. Population happens through the
//! builder-style `create_*`/`set_*`/`add_*` methods; an SDC text parser is
//! an external collaborator.

use crate::clocks::{Clock, ClockEdge, ClockId, ClockUncertainty, Waveform};
use crate::corner::Corners;
use crate::exceptions::{
    ExceptionFrom, ExceptionId, ExceptionKind, ExceptionPath, ExceptionState, ExceptionThru,
    ExceptionTo,
};
use crate::io_delays::{InputDelay, InputDelayId, OutputDelay};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tempo_common::{Delay, Ident, MinMax, PerMinMax, RiseFall};
use tempo_diagnostics::Diagnostic;
use tempo_graph::{Network, PinId};

/// Whether a derate applies to the clock or the data portion of a path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PathClkOrData {
    /// Clock network portion.
    Clk,
    /// Data portion.
    Data,
}

/// Timing derate factors (`set_timing_derate`), defaulting to 1.0.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Derates {
    /// Cell delay derates for clock paths.
    pub cell_clk: PerMinMax<f64>,
    /// Cell delay derates for data paths.
    pub cell_data: PerMinMax<f64>,
    /// Net delay derates for clock paths.
    pub net_clk: PerMinMax<f64>,
    /// Net delay derates for data paths.
    pub net_data: PerMinMax<f64>,
}

impl Default for Derates {
    fn default() -> Self {
        let unity = PerMinMax::both(1.0);
        Self {
            cell_clk: unity,
            cell_data: unity,
            net_clk: unity,
            net_data: unity,
        }
    }
}

/// The timing constraint set for a design.
pub struct Sdc {
    corners: Corners,
    clocks: Vec<Clock>,
    clock_by_name: FxHashMap<Ident, ClockId>,
    pin_clocks: FxHashMap<PinId, Vec<ClockId>>,
    propagated_pins: FxHashSet<PinId>,
    pin_latency: FxHashMap<PinId, PerMinMax<Delay>>,
    pin_insertion: FxHashMap<PinId, PerMinMax<Delay>>,
    pin_uncertainty: FxHashMap<PinId, ClockUncertainty>,
    input_delays: Vec<InputDelay>,
    pin_input_delays: FxHashMap<PinId, Vec<InputDelayId>>,
    ref_pin_input_delays: FxHashMap<PinId, Vec<InputDelayId>>,
    output_delays: Vec<OutputDelay>,
    pin_output_delays: FxHashMap<PinId, Vec<usize>>,
    exceptions: Vec<ExceptionPath>,
    path_delay_from_pins: FxHashSet<PinId>,
    path_delay_to_pins: FxHashSet<PinId>,
    clk_stop_pins: FxHashSet<PinId>,
    data_check_from: FxHashMap<PinId, Vec<PinId>>,
    gated_clk_enable_pins: FxHashSet<PinId>,
    derates: Derates,
    crpr_enabled: bool,
    dynamic_loop_breaking: bool,
    gated_clk_checks_enabled: bool,
    default_arrival_clock: Option<ClockId>,
    report_warnings: Mutex<Vec<Diagnostic>>,
}

impl Sdc {
    /// Creates an empty constraint set over the given corners.
    pub fn new(corners: Corners) -> Self {
        Self {
            corners,
            clocks: Vec::new(),
            clock_by_name: FxHashMap::default(),
            pin_clocks: FxHashMap::default(),
            propagated_pins: FxHashSet::default(),
            pin_latency: FxHashMap::default(),
            pin_insertion: FxHashMap::default(),
            pin_uncertainty: FxHashMap::default(),
            input_delays: Vec::new(),
            pin_input_delays: FxHashMap::default(),
            ref_pin_input_delays: FxHashMap::default(),
            output_delays: Vec::new(),
            pin_output_delays: FxHashMap::default(),
            exceptions: Vec::new(),
            path_delay_from_pins: FxHashSet::default(),
            path_delay_to_pins: FxHashSet::default(),
            clk_stop_pins: FxHashSet::default(),
            data_check_from: FxHashMap::default(),
            gated_clk_enable_pins: FxHashSet::default(),
            derates: Derates::default(),
            crpr_enabled: false,
            dynamic_loop_breaking: false,
            gated_clk_checks_enabled: false,
            default_arrival_clock: None,
            report_warnings: Mutex::new(Vec::new()),
        }
    }

    /// Returns the analysis corners.
    pub fn corners(&self) -> &Corners {
        &self.corners
    }

    // Clocks.

    /// Declares a clock (`create_clock`) on the given source pins.
    pub fn create_clock(
        &mut self,
        name: Ident,
        period: Delay,
        waveform: Option<Waveform>,
        src_pins: &[PinId],
    ) -> ClockId {
        let id = ClockId::from_raw(self.clocks.len() as u32);
        self.clocks.push(Clock {
            id,
            name,
            period,
            waveform: waveform.unwrap_or_else(|| Waveform::square(period)),
            src_pins: src_pins.to_vec(),
            is_propagated: false,
            insertion: PerMinMax::both(0.0),
            latency: PerMinMax::both(0.0),
            uncertainty: None,
            is_generated: false,
            master: None,
            divide_by: 1,
            gen_src_pin: None,
        });
        self.clock_by_name.insert(name, id);
        for &pin in src_pins {
            self.pin_clocks.entry(pin).or_default().push(id);
        }
        id
    }

    /// Declares a generated clock (`create_generated_clock`) divided down
    /// from `master` and rooted at `src_pin`.
    pub fn create_generated_clock(
        &mut self,
        name: Ident,
        master: ClockId,
        divide_by: u32,
        src_pin: PinId,
    ) -> ClockId {
        let period = self.clock(master).period * divide_by as f64;
        let id = ClockId::from_raw(self.clocks.len() as u32);
        self.clocks.push(Clock {
            id,
            name,
            period,
            waveform: Waveform::square(period),
            src_pins: vec![src_pin],
            is_propagated: false,
            insertion: PerMinMax::both(0.0),
            latency: PerMinMax::both(0.0),
            uncertainty: None,
            is_generated: true,
            master: Some(master),
            divide_by,
            gen_src_pin: Some(src_pin),
        });
        self.clock_by_name.insert(name, id);
        self.pin_clocks.entry(src_pin).or_default().push(id);
        id
    }

    /// Returns the clock with the given ID.
    pub fn clock(&self, id: ClockId) -> &Clock {
        &self.clocks[id.as_raw() as usize]
    }

    /// Returns a mutable reference to the clock with the given ID.
    pub fn clock_mut(&mut self, id: ClockId) -> &mut Clock {
        &mut self.clocks[id.as_raw() as usize]
    }

    /// Iterates over all clocks.
    pub fn clocks(&self) -> impl Iterator<Item = &Clock> {
        self.clocks.iter()
    }

    /// Returns the number of declared clocks.
    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    /// Looks up a clock by name.
    pub fn find_clock(&self, name: Ident) -> Option<ClockId> {
        self.clock_by_name.get(&name).copied()
    }

    /// Returns the clocks defined on `pin`.
    pub fn vertex_pin_clocks(&self, pin: PinId) -> &[ClockId] {
        self.pin_clocks.get(&pin).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if a clock is defined on `pin`.
    pub fn is_vertex_pin_clock(&self, pin: PinId) -> bool {
        self.pin_clocks.contains_key(&pin)
    }

    /// Marks a clock's network as propagated.
    pub fn set_propagated_clock(&mut self, clock: ClockId) {
        self.clock_mut(clock).is_propagated = true;
    }

    /// Marks the clock network through `pin` as propagated, overriding an
    /// ideal clock-level latency from this pin onward.
    pub fn set_propagated_pin(&mut self, pin: PinId) {
        self.propagated_pins.insert(pin);
    }

    /// Returns `true` if `pin` is marked propagated.
    pub fn is_propagated_pin(&self, pin: PinId) -> bool {
        self.propagated_pins.contains(&pin)
    }

    /// Sets a clock's ideal network latency.
    pub fn set_clock_latency(&mut self, clock: ClockId, latency: PerMinMax<Delay>) {
        self.clock_mut(clock).latency = latency;
    }

    /// Sets an ideal network latency on a specific pin; pin values take
    /// precedence over clock values.
    pub fn set_pin_clock_latency(&mut self, pin: PinId, latency: PerMinMax<Delay>) {
        self.pin_latency.insert(pin, latency);
    }

    /// Returns the pin-level latency override, if set.
    pub fn pin_clock_latency(&self, pin: PinId) -> Option<PerMinMax<Delay>> {
        self.pin_latency.get(&pin).copied()
    }

    /// Sets a clock's source latency (insertion delay).
    pub fn set_clock_insertion(&mut self, clock: ClockId, insertion: PerMinMax<Delay>) {
        self.clock_mut(clock).insertion = insertion;
    }

    /// Sets a source latency override on a specific pin.
    pub fn set_pin_clock_insertion(&mut self, pin: PinId, insertion: PerMinMax<Delay>) {
        self.pin_insertion.insert(pin, insertion);
    }

    /// Returns the clock insertion delay observed at `pin`: the pin override
    /// when present, otherwise the clock-level value for the early/late side.
    pub fn clock_insertion(&self, clock: ClockId, pin: PinId, early_late: MinMax) -> Delay {
        if let Some(insertion) = self.pin_insertion.get(&pin) {
            insertion.get(early_late)
        } else {
            self.clock(clock).insertion(early_late)
        }
    }

    /// Returns the ideal network latency for `clock` at `pin` (pin value
    /// wins over clock value).
    pub fn clock_latency(&self, clock: ClockId, pin: Option<PinId>, min_max: MinMax) -> Delay {
        if let Some(latency) = pin.and_then(|p| self.pin_latency.get(&p)) {
            latency.get(min_max)
        } else {
            self.clock(clock).latency.get(min_max)
        }
    }

    /// Sets uncertainty margins on a clock.
    pub fn set_clock_uncertainty(&mut self, clock: ClockId, uncertainty: ClockUncertainty) {
        self.clock_mut(clock).uncertainty = Some(uncertainty);
    }

    /// Sets uncertainty margins on a pin; pin values win over clock values.
    pub fn set_pin_clock_uncertainty(&mut self, pin: PinId, uncertainty: ClockUncertainty) {
        self.pin_uncertainty.insert(pin, uncertainty);
    }

    /// Returns the uncertainty governing a check clocked by `clock` at
    /// `pin`.
    pub fn clock_uncertainty(&self, clock: ClockId, pin: Option<PinId>) -> ClockUncertainty {
        pin.and_then(|p| self.pin_uncertainty.get(&p).copied())
            .or(self.clock(clock).uncertainty)
            .unwrap_or_default()
    }

    /// Returns the time of a clock edge within its period.
    pub fn clock_edge_time(&self, edge: ClockEdge) -> Delay {
        self.clock(edge.clock).edge_time(edge.tr)
    }

    // I/O delays.

    /// Adds a `set_input_delay` constraint.
    #[allow(clippy::too_many_arguments)]
    pub fn set_input_delay(
        &mut self,
        pin: PinId,
        clk_edge: Option<ClockEdge>,
        delay: PerMinMax<Delay>,
        ref_pin: Option<PinId>,
        ref_tr: RiseFall,
        source_latency_included: bool,
        network_latency_included: bool,
    ) -> InputDelayId {
        let id = InputDelayId::from_raw(self.input_delays.len() as u32);
        self.input_delays.push(InputDelay {
            id,
            pin,
            clk_edge,
            delay,
            ref_pin,
            ref_tr,
            source_latency_included,
            network_latency_included,
        });
        self.pin_input_delays.entry(pin).or_default().push(id);
        if let Some(ref_pin) = ref_pin {
            self.ref_pin_input_delays.entry(ref_pin).or_default().push(id);
        }
        id
    }

    /// Returns the input delay with the given ID.
    pub fn input_delay(&self, id: InputDelayId) -> &InputDelay {
        &self.input_delays[id.as_raw() as usize]
    }

    /// Returns the input delays on `pin`.
    pub fn pin_input_delays(&self, pin: PinId) -> &[InputDelayId] {
        self.pin_input_delays.get(&pin).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `pin` has an input delay.
    pub fn has_input_delay(&self, pin: PinId) -> bool {
        self.pin_input_delays.contains_key(&pin)
    }

    /// Returns the input delays whose `-reference_pin` is `pin`.
    pub fn ref_pin_input_delays(&self, pin: PinId) -> &[InputDelayId] {
        self.ref_pin_input_delays
            .get(&pin)
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates over the pins carrying input delays.
    pub fn input_delay_pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.pin_input_delays.keys().copied()
    }

    /// Adds a `set_output_delay` constraint.
    pub fn set_output_delay(
        &mut self,
        pin: PinId,
        clk_edge: Option<ClockEdge>,
        delay: PerMinMax<Delay>,
    ) {
        let index = self.output_delays.len();
        self.output_delays.push(OutputDelay {
            pin,
            clk_edge,
            delay,
        });
        self.pin_output_delays.entry(pin).or_default().push(index);
    }

    /// Returns the output delays on `pin`.
    pub fn pin_output_delays(&self, pin: PinId) -> impl Iterator<Item = &OutputDelay> {
        self.pin_output_delays
            .get(&pin)
            .into_iter()
            .flatten()
            .map(|&i| &self.output_delays[i])
    }

    /// Returns `true` if `pin` has an output delay.
    pub fn has_output_delay(&self, pin: PinId) -> bool {
        self.pin_output_delays.contains_key(&pin)
    }

    // Exceptions.

    /// Registers a timing exception. Hierarchical pins in the patterns are
    /// expanded to their leaf driver pins against `network`.
    pub fn add_exception(
        &mut self,
        network: &Network,
        kind: ExceptionKind,
        from: Option<ExceptionFrom>,
        thrus: Vec<ExceptionThru>,
        to: Option<ExceptionTo>,
        min_max: Option<MinMax>,
    ) -> ExceptionId {
        let id = ExceptionId::from_raw(self.exceptions.len() as u32);
        let from = from.map(|f| ExceptionFrom {
            pins: Self::expand_pins(network, &f.pins),
            ..f
        });
        let thrus = thrus
            .into_iter()
            .map(|t| ExceptionThru {
                pins: Self::expand_pins(network, &t.pins),
                ..t
            })
            .collect::<Vec<_>>();
        let to = to.map(|t| ExceptionTo {
            pins: Self::expand_pins(network, &t.pins),
            ..t
        });
        if let ExceptionKind::PathDelay { .. } = kind {
            if let Some(from) = &from {
                self.path_delay_from_pins.extend(from.pins.iter().copied());
            }
            if let Some(to) = &to {
                self.path_delay_to_pins.extend(to.pins.iter().copied());
            }
        }
        self.exceptions.push(ExceptionPath {
            id,
            kind,
            from,
            thrus,
            to,
            min_max,
        });
        id
    }

    fn expand_pins(network: &Network, pins: &[PinId]) -> Vec<PinId> {
        let mut expanded = Vec::with_capacity(pins.len());
        for &pin in pins {
            if network.pin(pin).is_hierarchical {
                // Keep the hierarchical pin too: thru matching tests edge
                // endpoints, which are always leaf pins, but from/to lookups
                // may name the boundary.
                expanded.push(pin);
                expanded.extend(network.drvr_pins(pin));
            } else {
                expanded.push(pin);
            }
        }
        expanded
    }

    /// Returns the exception with the given ID.
    pub fn exception(&self, id: ExceptionId) -> &ExceptionPath {
        &self.exceptions[id.as_raw() as usize]
    }

    /// Iterates over all exceptions.
    pub fn exceptions(&self) -> impl Iterator<Item = &ExceptionPath> {
        self.exceptions.iter()
    }

    /// Derives the exception states for a path starting at `pin` with launch
    /// clock `clk` and transition `tr`.
    ///
    /// Returns `None` when a false path with no pending thrus and no `-to`
    /// starts here: the path is dead before it begins. Otherwise returns the
    /// (possibly empty) initial state set.
    pub fn exception_from_states(
        &self,
        pin: Option<PinId>,
        clk: Option<ClockId>,
        tr: RiseFall,
        min_max: MinMax,
    ) -> Option<Vec<ExceptionState>> {
        let mut states = Vec::new();
        for exc in &self.exceptions {
            if !exc.matches_min_max(min_max) {
                continue;
            }
            let Some(from) = &exc.from else { continue };
            if !from.matches(pin, clk, tr) {
                continue;
            }
            let state = ExceptionState::first(exc.id);
            if exc.kind.is_false() && exc.state_complete(state) {
                // A completed false path kills the seed outright.
                return None;
            }
            states.push(state);
        }
        states.sort();
        Some(states)
    }

    /// Derives exception states for a path starting at `pin` when only
    /// `-from clock` exceptions apply (clock tree pins ignore pin-pattern
    /// exceptions).
    pub fn exception_from_clk_states(
        &self,
        _pin: PinId,
        clk: ClockId,
        tr: RiseFall,
        min_max: MinMax,
    ) -> Vec<ExceptionState> {
        let mut states = Vec::new();
        for exc in &self.exceptions {
            if !exc.matches_min_max(min_max) {
                continue;
            }
            let Some(from) = &exc.from else { continue };
            if from.has_pins() {
                continue;
            }
            if from.matches(None, Some(clk), tr) {
                states.push(ExceptionState::first(exc.id));
            }
        }
        states.sort();
        states
    }

    /// Returns states for exceptions whose first `-thru` point is satisfied
    /// by the edge `from_pin → to_pin` (and that have no `-from`).
    pub fn exception_thru_states(
        &self,
        from_pin: PinId,
        to_pin: PinId,
        to_tr: RiseFall,
        min_max: MinMax,
    ) -> Vec<ExceptionState> {
        let mut states = Vec::new();
        for exc in &self.exceptions {
            if exc.from.is_some() || !exc.matches_min_max(min_max) {
                continue;
            }
            let first = ExceptionState::first(exc.id);
            if exc.matches_next_thru(first, from_pin, to_pin, to_tr) {
                states.push(first.advanced());
            }
        }
        states
    }

    /// Returns `true` if `pin` is named by a path-delay exception `-from`.
    pub fn is_path_delay_from_pin(&self, pin: PinId) -> bool {
        self.path_delay_from_pins.contains(&pin)
    }

    /// Returns `true` if `pin` is named by a path-delay exception `-to`.
    pub fn is_path_delay_to_pin(&self, pin: PinId) -> bool {
        self.path_delay_to_pins.contains(&pin)
    }

    // Clock tree shaping.

    /// Stops clock propagation at `pin` (`set_clock_sense -stop_propagation`).
    pub fn set_clk_stop_propagation(&mut self, pin: PinId) {
        self.clk_stop_pins.insert(pin);
    }

    /// Returns `true` if clock propagation stops at `pin`.
    pub fn clk_stop_propagation(&self, pin: PinId) -> bool {
        self.clk_stop_pins.contains(&pin)
    }

    // Data checks and gated clocks.

    /// Registers a data-to-data check from `from` constraining `to`.
    pub fn add_data_check(&mut self, from: PinId, to: PinId) {
        self.data_check_from.entry(from).or_default().push(to);
    }

    /// Returns the pins whose required times depend on `from`'s arrival via
    /// data checks.
    pub fn data_checks_from(&self, from: PinId) -> &[PinId] {
        self.data_check_from.get(&from).map_or(&[], Vec::as_slice)
    }

    /// Marks `pin` as a gated-clock enable endpoint.
    pub fn add_gated_clk_enable(&mut self, pin: PinId) {
        self.gated_clk_enable_pins.insert(pin);
    }

    /// Returns `true` if `pin` is a gated-clock enable endpoint.
    pub fn is_gated_clk_enable(&self, pin: PinId) -> bool {
        self.gated_clk_enable_pins.contains(&pin)
    }

    // Derates.

    /// Sets the derate factors.
    pub fn set_derates(&mut self, derates: Derates) {
        self.derates = derates;
    }

    /// Returns the derate factor for an arc.
    pub fn timing_derate(
        &self,
        clk_or_data: PathClkOrData,
        is_cell: bool,
        min_max: MinMax,
    ) -> f64 {
        let table = match (clk_or_data, is_cell) {
            (PathClkOrData::Clk, true) => self.derates.cell_clk,
            (PathClkOrData::Clk, false) => self.derates.net_clk,
            (PathClkOrData::Data, true) => self.derates.cell_data,
            (PathClkOrData::Data, false) => self.derates.net_data,
        };
        table.get(min_max)
    }

    // Option flags.

    /// Enables or disables clock-reconvergence pessimism removal.
    pub fn set_crpr_enabled(&mut self, enabled: bool) {
        self.crpr_enabled = enabled;
    }

    /// Returns `true` if CRPR is active.
    pub fn crpr_enabled(&self) -> bool {
        self.crpr_enabled
    }

    /// Enables or disables dynamic loop breaking.
    pub fn set_dynamic_loop_breaking(&mut self, enabled: bool) {
        self.dynamic_loop_breaking = enabled;
    }

    /// Returns `true` if dynamic loop breaking is on.
    pub fn dynamic_loop_breaking(&self) -> bool {
        self.dynamic_loop_breaking
    }

    /// Enables or disables gated-clock checks.
    pub fn set_gated_clk_checks_enabled(&mut self, enabled: bool) {
        self.gated_clk_checks_enabled = enabled;
    }

    /// Returns `true` if gated-clock checks are enabled.
    pub fn gated_clk_checks_enabled(&self) -> bool {
        self.gated_clk_checks_enabled
    }

    /// Sets the default arrival clock used by inputs without an explicit
    /// clock.
    pub fn set_default_arrival_clock(&mut self, clock: Option<ClockId>) {
        self.default_arrival_clock = clock;
    }

    /// Returns the default arrival clock, if configured.
    pub fn default_arrival_clock(&self) -> Option<ClockId> {
        self.default_arrival_clock
    }

    // Warnings.

    /// Records a constraint warning to be surfaced at path-end time.
    pub fn record_warning(&self, diag: Diagnostic) {
        self.report_warnings.lock().unwrap().push(diag);
    }

    /// Drains the recorded constraint warnings.
    pub fn take_warnings(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.report_warnings.lock().unwrap())
    }
}
