//! Pin and port metadata for the design under analysis.
//!
//! The network is the search core's view of the netlist: pins with interned
//! hierarchical names, directions, and top-level-port / hierarchical-pin
//! flags. Netlist elaboration is an external collaborator; tests and the
//! graph bridge populate a [`Network`] directly.

use crate::ids::PinId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tempo_common::Ident;

/// The direction of a pin or port.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input pin (load).
    Input,
    /// Output pin (driver).
    Output,
    /// Bidirectional pin; such pins have both a load and a driver vertex.
    Bidirect,
    /// Internal pin of a macro or generated-clock source inside the design.
    Internal,
}

impl PortDirection {
    /// Returns `true` for input and bidirectional pins.
    pub fn is_any_input(self) -> bool {
        matches!(self, PortDirection::Input | PortDirection::Bidirect)
    }

    /// Returns `true` for output and bidirectional pins.
    pub fn is_any_output(self) -> bool {
        matches!(self, PortDirection::Output | PortDirection::Bidirect)
    }
}

/// A pin in the design.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pin {
    /// The unique ID of this pin.
    pub id: PinId,
    /// Interned hierarchical path name (e.g. `core/alu/sum_reg/D`).
    pub name: Ident,
    /// The direction of this pin.
    pub direction: PortDirection,
    /// `true` if this pin is a port of the top-level instance.
    pub is_top_level_port: bool,
    /// `true` if this is a hierarchical pin (a boundary pin of a non-leaf
    /// instance). Hierarchical pins own no vertex; searches through them
    /// expand to the driver pins below.
    pub is_hierarchical: bool,
    /// For hierarchical pins, the leaf driver pins reached through this pin.
    pub hier_drvrs: Vec<PinId>,
}

/// Pin and port metadata for the design under analysis.
///
/// Pins are appended during construction and never removed; [`PinId`]s
/// index the pin vector directly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Network {
    pins: Vec<Pin>,
    by_name: FxHashMap<Ident, PinId>,
}

impl Network {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf pin and returns its ID.
    pub fn add_pin(&mut self, name: Ident, direction: PortDirection) -> PinId {
        self.add_pin_full(name, direction, false, false)
    }

    /// Adds a top-level port pin and returns its ID.
    pub fn add_port(&mut self, name: Ident, direction: PortDirection) -> PinId {
        self.add_pin_full(name, direction, true, false)
    }

    /// Adds a hierarchical pin; drivers below it are attached with
    /// [`add_hier_drvr`](Self::add_hier_drvr).
    pub fn add_hier_pin(&mut self, name: Ident, direction: PortDirection) -> PinId {
        self.add_pin_full(name, direction, false, true)
    }

    fn add_pin_full(
        &mut self,
        name: Ident,
        direction: PortDirection,
        is_top_level_port: bool,
        is_hierarchical: bool,
    ) -> PinId {
        let id = PinId::from_raw(self.pins.len() as u32);
        self.pins.push(Pin {
            id,
            name,
            direction,
            is_top_level_port,
            is_hierarchical,
            hier_drvrs: Vec::new(),
        });
        self.by_name.insert(name, id);
        id
    }

    /// Records that `drvr` is a leaf driver reached through hierarchical
    /// pin `hier`.
    pub fn add_hier_drvr(&mut self, hier: PinId, drvr: PinId) {
        self.pins[hier.index()].hier_drvrs.push(drvr);
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.index()]
    }

    /// Looks up a pin by its interned name.
    pub fn find_pin(&self, name: Ident) -> Option<PinId> {
        self.by_name.get(&name).copied()
    }

    /// Returns the number of pins.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Iterates over all pins.
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter()
    }

    /// Returns the leaf driver pins a search through `pin` expands to:
    /// the pin itself for leaf pins, the recorded drivers for hierarchical
    /// pins.
    pub fn drvr_pins(&self, pin: PinId) -> Vec<PinId> {
        let p = self.pin(pin);
        if p.is_hierarchical {
            p.hier_drvrs.clone()
        } else {
            vec![pin]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_common::Interner;

    #[test]
    fn add_and_find() {
        let interner = Interner::new();
        let mut net = Network::new();
        let name = interner.get_or_intern("u1/A");
        let pin = net.add_pin(name, PortDirection::Input);
        assert_eq!(net.find_pin(name), Some(pin));
        assert_eq!(net.pin(pin).direction, PortDirection::Input);
        assert!(!net.pin(pin).is_top_level_port);
    }

    #[test]
    fn ports_are_top_level() {
        let interner = Interner::new();
        let mut net = Network::new();
        let pin = net.add_port(interner.get_or_intern("data_in"), PortDirection::Input);
        assert!(net.pin(pin).is_top_level_port);
    }

    #[test]
    fn direction_queries() {
        assert!(PortDirection::Input.is_any_input());
        assert!(PortDirection::Bidirect.is_any_input());
        assert!(PortDirection::Bidirect.is_any_output());
        assert!(!PortDirection::Output.is_any_input());
        assert!(!PortDirection::Internal.is_any_output());
    }

    #[test]
    fn hier_pin_expands_to_drivers() {
        let interner = Interner::new();
        let mut net = Network::new();
        let hier = net.add_hier_pin(interner.get_or_intern("blk/out"), PortDirection::Output);
        let d0 = net.add_pin(interner.get_or_intern("blk/u0/Y"), PortDirection::Output);
        let d1 = net.add_pin(interner.get_or_intern("blk/u1/Y"), PortDirection::Output);
        net.add_hier_drvr(hier, d0);
        net.add_hier_drvr(hier, d1);
        assert_eq!(net.drvr_pins(hier), vec![d0, d1]);
        assert_eq!(net.drvr_pins(d0), vec![d0]);
    }

    #[test]
    fn serde_roundtrip() {
        let interner = Interner::new();
        let mut net = Network::new();
        net.add_port(interner.get_or_intern("clk"), PortDirection::Input);
        let json = serde_json::to_string(&net).unwrap();
        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pin_count(), 1);
    }
}
