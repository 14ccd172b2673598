//! Tag mutation across an edge: clock-info updates and exception-state
//! advancement.
//!
//! Given a path's tag on one side of an edge, these routines derive the tag
//! on the other side, killing paths that complete a false or loop
//! exception. Tags are reused pointer-equal when nothing changes, which
//! keeps the per-vertex merge cheap for the vast majority of edges.

use crate::clk_info::PathRep;
use crate::pool::{ClkInfoId, TagId};
use crate::search::Search;
use tempo_common::{MinMax, RiseFall, TimingSense};
use tempo_graph::{EdgeId, PinId};
use tempo_sdc::{ApIndex, ClockId, ExceptionState, InputDelayId};

impl Search<'_> {
    /// Derives the tag for a data path crossing `edge`. Returns `None` when
    /// the result completes a false path or loop.
    pub(crate) fn thru_tag(
        &self,
        from_tag: TagId,
        edge: EdgeId,
        to_tr: RiseFall,
        min_max: MinMax,
        ap: ApIndex,
    ) -> Option<TagId> {
        let e = self.graph.edge(edge);
        let from_pin = self.graph.vertex(e.from).pin;
        let to_pin = self.graph.vertex(e.to).pin;
        let to_is_reg_clk = self.graph.vertex(e.to).is_reg_clk;
        let from = self.pools.tag(from_tag);
        self.mutate_tag(
            from_tag,
            from_pin,
            from.tr,
            false,
            from.clk_info,
            to_pin,
            to_tr,
            false,
            to_is_reg_clk,
            false,
            from.clk_info,
            from.input_delay,
            min_max,
            ap,
        )
    }

    /// Derives the tag for a clock path crossing `edge`, mutating the clock
    /// info (latency and uncertainty overrides, propagation, pulse sense)
    /// and demoting the path to data past the end of the clock tree.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn thru_clk_tag(
        &self,
        from_path: PathRep,
        from_tag: TagId,
        to_propagates_clk: bool,
        edge: EdgeId,
        to_tr: RiseFall,
        min_max: MinMax,
        ap: ApIndex,
    ) -> Option<TagId> {
        let e = self.graph.edge(edge);
        let from_pin = self.graph.vertex(e.from).pin;
        let to_pin = self.graph.vertex(e.to).pin;
        let to_is_reg_clk = self.graph.vertex(e.to).is_reg_clk;
        let from = self.pools.tag(from_tag);
        let from_is_clk = from.is_clk;
        let to_is_clk =
            from_is_clk && to_propagates_clk && e.role.propagates_clock();
        let to_clk_info = self.thru_clk_info(from_path, from.clk_info, edge, to_pin, min_max);
        self.mutate_tag(
            from_tag,
            from_pin,
            from.tr,
            from_is_clk,
            from.clk_info,
            to_pin,
            to_tr,
            to_is_clk,
            to_is_reg_clk,
            false,
            to_clk_info,
            None,
            min_max,
            ap,
        )
    }

    /// Mutates a clock info across an edge: pin-level latency and
    /// uncertainty overrides (pin wins over clock), propagation marking,
    /// pulse-clock sense flips through negative-unate arcs, and
    /// generated-clock source marking at downstream clock roots.
    pub(crate) fn thru_clk_info(
        &self,
        _from_path: PathRep,
        from_clk_info: ClkInfoId,
        edge: EdgeId,
        to_pin: PinId,
        min_max: MinMax,
    ) -> ClkInfoId {
        let from_info = self.pools.clk_info(from_clk_info);
        let mut changed = false;
        let mut to_info = (*from_info).clone();

        if !to_info.is_propagated && self.sdc.is_propagated_pin(to_pin) {
            to_info.is_propagated = true;
            changed = true;
        }

        // Distinguish gen-clk source path infos at generated clock roots so
        // CRPR data can later be attached safely.
        if to_info.is_gen_clk_src_path
            && self.crpr_active()
            && self.sdc.is_vertex_pin_clock(to_pin)
        {
            to_info.gen_clk_src = Some(to_pin);
            changed = true;
        }

        // Propagate pulse-clock sense through negative-unate arcs.
        if let Some(sense) = to_info.pulse_clk_sense {
            if self.graph.arc_set(self.graph.edge(edge).arc_set).sense
                == TimingSense::NegativeUnate
            {
                to_info.pulse_clk_sense = Some(sense.opposite());
                changed = true;
            }
        }

        // Latency on the pin has precedence over the clock's value; setting
        // one turns off propagation from here on.
        if let Some(clk) = to_info.clock() {
            if let Some(latency) = self.sdc.pin_clock_latency(to_pin) {
                to_info.latency = latency.get(min_max);
                to_info.is_propagated = false;
                changed = true;
            }
            let uncertainty = self.sdc.clock_uncertainty(clk, Some(to_pin));
            if (uncertainty.setup != 0.0 || uncertainty.hold != 0.0)
                && to_info.uncertainty != Some(uncertainty)
            {
                to_info.uncertainty = Some(uncertainty);
                changed = true;
            }
        }

        if changed {
            self.pools.find_clk_info(to_info)
        } else {
            from_clk_info
        }
    }

    /// Rewrites a clock info with the given CRPR anchor.
    pub(crate) fn clk_info_with_crpr_clk_path(
        &self,
        from_clk_info: ClkInfoId,
        crpr_clk_path: PathRep,
    ) -> ClkInfoId {
        if !self.crpr_active() {
            return from_clk_info;
        }
        let mut info = (*self.pools.clk_info(from_clk_info)).clone();
        info.crpr_clk_path = Some(crpr_clk_path);
        self.pools.find_clk_info(info)
    }

    /// The tag launched through a register clock-to-output arc: exception
    /// from-states for the launch pin and clock, as a data tag.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_reg_clk_tag(
        &self,
        from_pin: PinId,
        from_tr: RiseFall,
        clk: Option<ClockId>,
        to_clk_info: ClkInfoId,
        to_tr: RiseFall,
        min_max: MinMax,
        ap: ApIndex,
    ) -> Option<TagId> {
        let states = self.exception_from_states(Some(from_pin), clk, from_tr, min_max)?;
        Some(self.intern_tag(to_tr, ap, to_clk_info, false, None, false, states))
    }

    /// The workhorse: advances exception states across `from_pin → to_pin`
    /// and interns the outgoing tag, reusing `from_tag` pointer-equal when
    /// nothing changed.
    ///
    /// Kills the path (returns `None`) when a carried state is a completed
    /// false path on a data tag, or when advancing a state completes a loop.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn mutate_tag(
        &self,
        from_tag: TagId,
        from_pin: PinId,
        from_tr: RiseFall,
        from_is_clk: bool,
        from_clk_info: ClkInfoId,
        to_pin: PinId,
        to_tr: RiseFall,
        to_is_clk: bool,
        to_is_reg_clk: bool,
        to_is_segment_start: bool,
        to_clk_info: ClkInfoId,
        to_input_delay: Option<InputDelayId>,
        min_max: MinMax,
        ap: ApIndex,
    ) -> Option<TagId> {
        let from = self.pools.tag(from_tag);
        let new_states = self.exception_thru_states(from_pin, to_pin, to_tr, min_max);
        let mut state_change = !new_states.is_empty();
        let mut states: Vec<ExceptionState> = new_states;

        for &state in &from.states {
            let exception = self.exception(state.exception);
            if exception.kind.is_false() && exception.state_complete(state) && !from_is_clk {
                // A completed false path is carried by clocks (to disable
                // downstream clock-as-data paths) but kills data paths.
                return None;
            }
            // One edge may satisfy several hierarchical -thru points.
            let mut advanced = state;
            while exception.matches_next_thru(advanced, from_pin, to_pin, to_tr) {
                advanced = advanced.advanced();
                state_change = true;
            }
            if exception.kind.is_loop() && exception.thrus_complete(advanced) {
                // The edge completes a loop traversal.
                return None;
            }
            // Loop markers die at register clock pins.
            if to_is_reg_clk && exception.kind.is_loop() {
                state_change = true;
                continue;
            }
            states.push(advanced);
        }

        let from_tag_ref = self.pools.tag(from_tag);
        if !state_change
            && to_clk_info == from_clk_info
            && to_tr == from_tr
            && to_is_clk == from_is_clk
            && from_tag_ref.is_segment_start == to_is_segment_start
            && from_tag_ref.input_delay == to_input_delay
        {
            return Some(from_tag);
        }
        Some(self.intern_tag(
            to_tr,
            ap,
            to_clk_info,
            to_is_clk,
            to_input_delay,
            to_is_segment_start,
            states,
        ))
    }
}
