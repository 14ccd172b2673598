//! Boundary I/O delay constraints.

use crate::clocks::ClockEdge;
use crate::corner::define_id;
use serde::{Deserialize, Serialize};
use tempo_common::{Delay, PerMinMax, RiseFall};
use tempo_graph::PinId;

define_id!(
    /// Opaque, copyable ID for an input delay constraint.
    InputDelayId
);

/// A `set_input_delay` constraint.
///
/// Seeds an arrival at `pin` relative to a clock edge. With a reference pin,
/// the arrival is measured from the reference pin's propagated clock-network
/// arrival instead of the clock edge plus ideal latency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputDelay {
    /// The unique ID of this constraint.
    pub id: InputDelayId,
    /// The pin this delay applies to.
    pub pin: PinId,
    /// The reference clock edge, if given.
    pub clk_edge: Option<ClockEdge>,
    /// The external delay per analysis direction.
    pub delay: PerMinMax<Delay>,
    /// The reference pin (`-reference_pin`), if given.
    pub ref_pin: Option<PinId>,
    /// The clock transition observed at the reference pin.
    pub ref_tr: RiseFall,
    /// `true` if the given delay already includes the clock source latency.
    pub source_latency_included: bool,
    /// `true` if the given delay already includes the ideal network latency.
    pub network_latency_included: bool,
}

/// A `set_output_delay` constraint: external delay budget after an output
/// port, constraining the port's required time against a capture clock edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputDelay {
    /// The port pin this delay applies to.
    pub pin: PinId,
    /// The capture clock edge, if given.
    pub clk_edge: Option<ClockEdge>,
    /// The external delay per analysis direction.
    pub delay: PerMinMax<Delay>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocks::ClockId;

    #[test]
    fn input_delay_fields() {
        let d = InputDelay {
            id: InputDelayId::from_raw(0),
            pin: PinId::from_raw(3),
            clk_edge: Some(ClockEdge::new(ClockId::from_raw(0), RiseFall::Rise)),
            delay: PerMinMax::both(1.0),
            ref_pin: None,
            ref_tr: RiseFall::Rise,
            source_latency_included: false,
            network_latency_included: false,
        };
        assert_eq!(d.delay.max, 1.0);
        assert!(d.ref_pin.is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let d = OutputDelay {
            pin: PinId::from_raw(9),
            clk_edge: None,
            delay: PerMinMax::new(0.5, 2.0),
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: OutputDelay = serde_json::from_str(&json).unwrap();
        assert_eq!(back.delay.min, 0.5);
        assert_eq!(back.pin, d.pin);
    }
}
