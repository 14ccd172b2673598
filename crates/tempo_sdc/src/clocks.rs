//! Clock definitions: waveforms, latency, insertion, uncertainty,
//! propagation, and generated clocks.

use crate::corner::define_id;
use serde::{Deserialize, Serialize};
use tempo_common::{Delay, Ident, MinMax, PerMinMax, RiseFall};
use tempo_graph::PinId;

define_id!(
    /// Opaque, copyable ID for a clock.
    ClockId
);

/// A clock waveform: the rise and fall times within one period.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Waveform {
    /// Rising edge time within the period.
    pub rise: Delay,
    /// Falling edge time within the period.
    pub fall: Delay,
}

impl Waveform {
    /// The default 50% duty cycle waveform for the given period.
    pub fn square(period: Delay) -> Self {
        Self {
            rise: 0.0,
            fall: period / 2.0,
        }
    }

    /// Returns the edge time for the given transition.
    pub fn time(&self, tr: RiseFall) -> Delay {
        match tr {
            RiseFall::Rise => self.rise,
            RiseFall::Fall => self.fall,
        }
    }
}

/// Clock uncertainty margins applied at timing checks.
#[derive(Clone, Copy, PartialEq, Default, Debug, Serialize, Deserialize)]
pub struct ClockUncertainty {
    /// Margin subtracted from setup (max) check required times.
    pub setup: Delay,
    /// Margin added to hold (min) check required times.
    pub hold: Delay,
}

/// A clock definition.
///
/// Declared clocks come from `create_clock`; generated clocks from
/// `create_generated_clock` carry their master and divisor and derive their
/// waveform from the master's.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clock {
    /// The unique ID of this clock.
    pub id: ClockId,
    /// The clock's name.
    pub name: Ident,
    /// Period in nanoseconds.
    pub period: Delay,
    /// Edge times within the period.
    pub waveform: Waveform,
    /// The source pins this clock is defined on.
    pub src_pins: Vec<PinId>,
    /// `true` if the clock network is propagated (arrivals come from the
    /// clock tree search); `false` for ideal clocks using `latency`.
    pub is_propagated: bool,
    /// Source latency (insertion delay) per early/late side.
    pub insertion: PerMinMax<Delay>,
    /// Ideal clock network latency, applied when not propagated.
    pub latency: PerMinMax<Delay>,
    /// Uncertainty margins, if set on the clock.
    pub uncertainty: Option<ClockUncertainty>,
    /// `true` for generated clocks.
    pub is_generated: bool,
    /// The master clock of a generated clock.
    pub master: Option<ClockId>,
    /// Frequency divisor of a generated clock (1 = same frequency).
    pub divide_by: u32,
    /// The source pin of a generated clock inside the design.
    pub gen_src_pin: Option<PinId>,
}

impl Clock {
    /// Returns the edge time within the period for the given transition.
    pub fn edge_time(&self, tr: RiseFall) -> Delay {
        self.waveform.time(tr)
    }

    /// Returns the insertion delay for the given early/late side.
    pub fn insertion(&self, early_late: MinMax) -> Delay {
        self.insertion.get(early_late)
    }

    /// Returns `true` if this generated clock's master network is
    /// propagated, so its own insertion comes from the generated-clock
    /// engine.
    pub fn is_generated_with_propagated_master(&self) -> bool {
        self.is_generated && self.master.is_some()
    }
}

/// One edge of one clock; the launch/capture identity carried by clock
/// paths and timing checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ClockEdge {
    /// The clock.
    pub clock: ClockId,
    /// Which edge.
    pub tr: RiseFall,
}

impl ClockEdge {
    /// Creates a clock edge.
    pub fn new(clock: ClockId, tr: RiseFall) -> Self {
        Self { clock, tr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_clock(period: Delay) -> Clock {
        Clock {
            id: ClockId::from_raw(0),
            name: Ident::from_raw(0),
            period,
            waveform: Waveform::square(period),
            src_pins: Vec::new(),
            is_propagated: false,
            insertion: PerMinMax::both(0.0),
            latency: PerMinMax::both(0.0),
            uncertainty: None,
            is_generated: false,
            master: None,
            divide_by: 1,
            gen_src_pin: None,
        }
    }

    #[test]
    fn square_waveform_edges() {
        let clk = make_clock(10.0);
        assert_eq!(clk.edge_time(RiseFall::Rise), 0.0);
        assert_eq!(clk.edge_time(RiseFall::Fall), 5.0);
    }

    #[test]
    fn insertion_sides() {
        let mut clk = make_clock(8.0);
        clk.insertion = PerMinMax::new(0.4, 0.6);
        assert_eq!(clk.insertion(MinMax::Min), 0.4);
        assert_eq!(clk.insertion(MinMax::Max), 0.6);
    }

    #[test]
    fn clock_edge_identity() {
        let a = ClockEdge::new(ClockId::from_raw(1), RiseFall::Rise);
        let b = ClockEdge::new(ClockId::from_raw(1), RiseFall::Rise);
        let c = ClockEdge::new(ClockId::from_raw(1), RiseFall::Fall);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn serde_roundtrip() {
        let clk = make_clock(5.0);
        let json = serde_json::to_string(&clk).unwrap();
        let back: Clock = serde_json::from_str(&json).unwrap();
        assert_eq!(back.period, 5.0);
    }
}
