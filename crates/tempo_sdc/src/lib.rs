//! Timing constraint data model for the Tempo timing analyzer.
//!
//! This crate holds the constraint state the search core consumes: analysis
//! corners, clock definitions (including generated clocks, latency,
//! insertion, uncertainty, and propagation), boundary I/O delays (including
//! `-reference_pin`), timing exceptions with their state cursors, derate
//! factors, and the option flags that steer the search (CRPR, dynamic loop
//! breaking, gated-clock checks).
//!
//! SDC *text* parsing is an external collaborator; constraints are populated
//! through the [`Sdc`] API.

#![warn(missing_docs)]

pub mod clocks;
pub mod corner;
pub mod exceptions;
pub mod io_delays;
pub mod sdc;

pub use clocks::{Clock, ClockEdge, ClockId, ClockUncertainty, Waveform};
pub use corner::{AnalysisPt, ApIndex, Corner, CornerId, Corners};
pub use exceptions::{
    ExceptionFrom, ExceptionId, ExceptionKind, ExceptionPath, ExceptionState, ExceptionThru,
    ExceptionTo,
};
pub use io_delays::{InputDelay, InputDelayId, OutputDelay};
pub use sdc::{Derates, PathClkOrData, Sdc};
