//! Collection of reported conditions, with repetition capping.
//!
//! Timing conditions repeat: one unresolvable clock pair or one broken
//! loop can fire at thousands of pins. The sink therefore supports a
//! per-code emission cap; once a code reaches the cap, further records are
//! dropped but still counted, and the suppressed totals stay queryable so
//! a report can say "… and 4,231 more". Severity totals always count every
//! emission, suppressed or not.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct SinkState {
    diagnostics: Vec<Diagnostic>,
    recorded_per_code: HashMap<DiagnosticCode, usize>,
    suppressed_per_code: HashMap<DiagnosticCode, usize>,
    error_count: usize,
    warning_count: usize,
}

/// A thread-safe collector of reported conditions.
///
/// Parallel analysis stages emit concurrently; all state lives under one
/// short-held mutex.
pub struct DiagnosticSink {
    state: Mutex<SinkState>,
    code_limit: usize,
}

impl DiagnosticSink {
    /// Creates a sink that records every emission.
    pub fn new() -> Self {
        Self::with_code_limit(usize::MAX)
    }

    /// Creates a sink that records at most `limit` diagnostics per code;
    /// emissions past the cap are counted but not stored.
    pub fn with_code_limit(limit: usize) -> Self {
        Self {
            state: Mutex::new(SinkState::default()),
            code_limit: limit,
        }
    }

    /// Emits a diagnostic. Returns `false` when the record was suppressed
    /// by the per-code cap (its severity still counts).
    pub fn emit(&self, diag: Diagnostic) -> bool {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        match diag.severity {
            Severity::Error => state.error_count += 1,
            Severity::Warning => state.warning_count += 1,
            Severity::Note => {}
        }
        let recorded = state.recorded_per_code.entry(diag.code).or_insert(0);
        if *recorded >= self.code_limit {
            *state.suppressed_per_code.entry(diag.code).or_insert(0) += 1;
            return false;
        }
        *recorded += 1;
        state.diagnostics.push(diag);
        true
    }

    /// Returns `true` if any error has been emitted.
    pub fn has_errors(&self) -> bool {
        self.state.lock().unwrap().error_count > 0
    }

    /// Total errors emitted, including suppressed ones.
    pub fn error_count(&self) -> usize {
        self.state.lock().unwrap().error_count
    }

    /// Total warnings emitted, including suppressed ones.
    pub fn warning_count(&self) -> usize {
        self.state.lock().unwrap().warning_count
    }

    /// How many emissions of `code` were dropped by the cap.
    pub fn suppressed_count(&self, code: DiagnosticCode) -> usize {
        self.state
            .lock()
            .unwrap()
            .suppressed_per_code
            .get(&code)
            .copied()
            .unwrap_or(0)
    }

    /// Takes the recorded diagnostics, leaving the sink empty. Severity and
    /// suppression totals are preserved; per-code caps start over.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        let mut state = self.state.lock().unwrap();
        state.recorded_per_code.clear();
        std::mem::take(&mut state.diagnostics)
    }

    /// Returns a snapshot of the recorded diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.state.lock().unwrap().diagnostics.clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latch_warning() -> Diagnostic {
        Diagnostic::warning(
            DiagnosticCode::LatchIterationLimit,
            "latch arrival iteration stopped",
        )
    }

    fn accounting_error() -> Diagnostic {
        Diagnostic::error(
            DiagnosticCode::ClkCycleAccounting,
            "unresolvable clock pair",
        )
    }

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert_eq!(sink.error_count(), 0);
        assert_eq!(sink.warning_count(), 0);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn severity_totals() {
        let sink = DiagnosticSink::new();
        assert!(sink.emit(accounting_error()));
        assert!(sink.emit(latch_warning()));
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.diagnostics().len(), 2);
    }

    #[test]
    fn per_code_cap_suppresses_but_still_counts() {
        let sink = DiagnosticSink::with_code_limit(2);
        assert!(sink.emit(latch_warning()));
        assert!(sink.emit(latch_warning()));
        assert!(!sink.emit(latch_warning()));
        assert!(!sink.emit(latch_warning()));
        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.warning_count(), 4);
        assert_eq!(sink.suppressed_count(DiagnosticCode::LatchIterationLimit), 2);
        // Other codes are unaffected by the cap.
        assert!(sink.emit(accounting_error()));
        assert_eq!(sink.suppressed_count(DiagnosticCode::ClkCycleAccounting), 0);
    }

    #[test]
    fn take_all_drains_and_resets_caps() {
        let sink = DiagnosticSink::with_code_limit(1);
        assert!(sink.emit(latch_warning()));
        assert!(!sink.emit(latch_warning()));
        assert_eq!(sink.take_all().len(), 1);
        assert!(sink.take_all().is_empty());
        // Totals survive the drain; the cap starts over.
        assert_eq!(sink.warning_count(), 2);
        assert!(sink.emit(latch_warning()));
    }

    #[test]
    fn concurrent_emission() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DiagnosticSink::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    sink.emit(accounting_error());
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.error_count(), 800);
        assert_eq!(sink.diagnostics().len(), 800);
    }
}
