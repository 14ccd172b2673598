//! Timing graph data structures for the Tempo timing analyzer.
//!
//! This crate provides the inputs the search core traverses: pin and port
//! metadata ([`network`]), the levelized timing graph of vertices and delay
//! edges with per-analysis-point arc delays ([`graph`]), and the levelizer
//! ([`levelize`]). Entities are stored in dense append-only vectors indexed
//! by the [`ids`] newtypes.
//!
//! Graph construction from a netlist and delay calculation are external
//! collaborators; this crate stores their results and answers the traversal
//! queries the search needs (fanin/fanout iteration, arc lookup, levels,
//! roots).

#![warn(missing_docs)]

pub mod graph;
pub mod ids;
pub mod levelize;
pub mod network;

pub use graph::{Edge, Graph, Role, TimingArc, TimingArcSet, Vertex};
pub use ids::{ArcSetId, EdgeId, PinId, VertexId};
pub use levelize::{Level, Levelize};
pub use network::{Network, Pin, PortDirection};
