//! The conditions the timing engine reports.
//!
//! Unlike a compiler, the engine has a small, closed set of reportable
//! conditions, so each one is a [`DiagnosticCode`] variant rather than a
//! free-form category/number pair. The category is derived from the code:
//! whether the condition is a property of the constraints, of the timing
//! results, or of the graph itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What part of the analysis a condition belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Properties of the constraint set (ambiguities, conflicts).
    Constraint,
    /// Properties of the timing results (convergence, coverage).
    Timing,
    /// Properties of the timing graph (loops, connectivity).
    Graph,
}

impl Category {
    /// Returns the lowercase category name.
    pub fn label(self) -> &'static str {
        match self {
            Category::Constraint => "constraint",
            Category::Timing => "timing",
            Category::Graph => "graph",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stable identifier for one reportable condition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Clock-to-clock cycle accounting between a launch and capture clock
    /// could not be resolved unambiguously; recorded while searching and
    /// surfaced when path ends are enumerated.
    ClkCycleAccounting,
    /// Levelization broke a combinational loop; paths through the broken
    /// edge are only searched under dynamic loop breaking.
    BrokenLoop,
    /// The latch arrival fixed point hit its pass bound and stopped with
    /// arrivals as-converged.
    LatchIterationLimit,
}

impl DiagnosticCode {
    /// Returns the category this condition belongs to.
    pub fn category(self) -> Category {
        match self {
            DiagnosticCode::ClkCycleAccounting => Category::Constraint,
            DiagnosticCode::BrokenLoop => Category::Graph,
            DiagnosticCode::LatchIterationLimit => Category::Timing,
        }
    }

    /// Returns the stable name used in reports and message filters.
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::ClkCycleAccounting => "clk-cycle-accounting",
            DiagnosticCode::BrokenLoop => "broken-loop",
            DiagnosticCode::LatchIterationLimit => "latch-iteration-limit",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_derive_from_codes() {
        assert_eq!(
            DiagnosticCode::ClkCycleAccounting.category(),
            Category::Constraint
        );
        assert_eq!(DiagnosticCode::BrokenLoop.category(), Category::Graph);
        assert_eq!(
            DiagnosticCode::LatchIterationLimit.category(),
            Category::Timing
        );
    }

    #[test]
    fn display_is_the_stable_name() {
        assert_eq!(
            format!("{}", DiagnosticCode::LatchIterationLimit),
            "latch-iteration-limit"
        );
        assert_eq!(format!("{}", Category::Graph), "graph");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::BrokenLoop;
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
