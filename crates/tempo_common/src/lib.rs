//! Shared foundational types used across the Tempo timing analyzer.
//!
//! This crate provides core value types: delay scalars with fuzzy comparison,
//! the min/max analysis axis, rise/fall transitions, interned identifiers,
//! and common result types.

#![warn(missing_docs)]

pub mod delay;
pub mod ident;
pub mod min_max;
pub mod result;
pub mod transition;

pub use delay::{
    delay_init_value, fuzzy_equal, fuzzy_greater, fuzzy_greater_equal, fuzzy_less,
    fuzzy_less_equal, fuzzy_worse, Delay,
};
pub use ident::{Ident, Interner};
pub use min_max::{EarlyLate, MinMax, PerMinMax};
pub use result::{InternalError, StaResult};
pub use transition::{RiseFall, TimingSense};
