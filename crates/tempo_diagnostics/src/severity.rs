//! How seriously a reported condition affects the analysis results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a reported condition.
///
/// The engine distinguishes three levels: notes add context to a report,
/// warnings flag results that are valid but deserve review (a broken loop,
/// a capped latch iteration), and errors mean the results cannot be
/// trusted. There is no ordering between levels; consumers branch on the
/// specific severity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Additional context attached to a report.
    Note,
    /// The results are valid but a condition deserves review.
    Warning,
    /// The results cannot be trusted.
    Error,
}

impl Severity {
    /// Returns the lowercase severity name.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Returns `true` if this severity invalidates the analysis.
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_error() {
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
        assert!(!Severity::Note.is_error());
    }

    #[test]
    fn labels() {
        assert_eq!(Severity::Note.label(), "note");
        assert_eq!(format!("{}", Severity::Warning), "warning");
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        let back: Severity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Severity::Error);
    }
}
