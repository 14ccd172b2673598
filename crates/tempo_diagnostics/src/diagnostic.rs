//! One reported condition: severity, code, message, and notes.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// One reported condition.
///
/// Timing diagnostics name pins and clocks by path in the message rather
/// than carrying source locations; the constraint text that caused a
/// condition is an external collaborator's concern. Notes carry follow-up
/// detail (the pins involved, the iteration count, the suggested option).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How seriously this condition affects the results.
    pub severity: Severity,
    /// Which condition this is.
    pub code: DiagnosticCode,
    /// The message, naming the pins and clocks involved.
    pub message: String,
    /// Follow-up detail lines.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Creates a note diagnostic.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, code, message)
    }

    fn with_severity(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Appends a follow-up detail line.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_severity() {
        let code = DiagnosticCode::LatchIterationLimit;
        assert_eq!(Diagnostic::error(code, "e").severity, Severity::Error);
        assert_eq!(Diagnostic::warning(code, "w").severity, Severity::Warning);
        assert_eq!(Diagnostic::note(code, "n").severity, Severity::Note);
    }

    #[test]
    fn with_note_appends() {
        let diag = Diagnostic::warning(
            DiagnosticCode::ClkCycleAccounting,
            "ambiguous accounting between clk_a and clk_b",
        )
        .with_note("both clocks reach u1/CK");
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn serde_roundtrip() {
        let diag = Diagnostic::warning(
            DiagnosticCode::BrokenLoop,
            "combinational loop broken at u7/Y -> u3/A",
        );
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, diag.message);
        assert_eq!(back.code, diag.code);
    }
}
