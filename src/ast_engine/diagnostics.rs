//! Diagnostic aggregation and fatal-error halting.

use tracing::{debug, warn};

use super::cursor_stream::AdapterError;
use crate::frontend::{FrontEndDiagnostic, FrontEndSeverity};
use crate::types::{Diagnostic, DiagnosticCategory, Severity, SourceLocation};

/// Fixed mapping from front-end severities; `None` means dropped.
pub fn map_severity(severity: FrontEndSeverity) -> Option<Severity> {
    match severity {
        FrontEndSeverity::Ignored => None,
        FrontEndSeverity::Note => Some(Severity::Note),
        FrontEndSeverity::Warning => Some(Severity::Warning),
        FrontEndSeverity::Error => Some(Severity::Error),
        FrontEndSeverity::Fatal => Some(Severity::Fatal),
    }
}

/// Collects diagnostics for one file and tracks where traversal must stop.
#[derive(Debug)]
pub struct DiagnosticAggregator {
    file: String,
    diagnostics: Vec<Diagnostic>,
    /// Byte offset of the first fatal diagnostic in the analyzed file.
    halt_offset: Option<usize>,
    halted: bool,
}

impl DiagnosticAggregator {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            diagnostics: Vec::new(),
            halt_offset: None,
            halted: false,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_fatal() {
            let offset = match &diagnostic.location {
                Some(loc) if loc.file == self.file => Some(loc.offset),
                Some(_) => None,
                None => Some(0),
            };
            if let Some(offset) = offset {
                warn!(file = %self.file, offset, message = %diagnostic.message, "Fatal diagnostic");
                self.halt_offset = Some(self.halt_offset.map_or(offset, |o| o.min(offset)));
            }
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn ingest_front_end<'d>(&mut self, diagnostics: impl IntoIterator<Item = &'d FrontEndDiagnostic>) {
        for d in diagnostics {
            if let Some(severity) = map_severity(d.severity) {
                self.push(Diagnostic::new(
                    severity,
                    DiagnosticCategory::FrontEnd,
                    d.message.clone(),
                    d.location.clone(),
                ));
            }
        }
    }

    pub fn adapter_error(&mut self, error: &AdapterError) {
        debug!(%error, "Skipping invalid cursor");
        self.push(Diagnostic::new(
            Severity::Note,
            DiagnosticCategory::AdapterError,
            error.to_string(),
            Some(error.location().clone()),
        ));
    }

    pub fn unsupported(&mut self, construct: &str, location: &SourceLocation) {
        self.push(Diagnostic::new(
            Severity::Note,
            DiagnosticCategory::UnsupportedConstruct,
            format!("unsupported construct {} not modeled", construct),
            Some(location.clone()),
        ));
    }

    pub fn merge_conflict(&mut self, message: impl Into<String>, location: &SourceLocation) {
        self.push(Diagnostic::new(
            Severity::Warning,
            DiagnosticCategory::MergeConflict,
            message,
            Some(location.clone()),
        ));
    }

    pub fn validation(&mut self, severity: Severity, message: impl Into<String>, location: Option<&SourceLocation>) {
        self.push(Diagnostic::new(
            severity,
            DiagnosticCategory::Validation,
            message,
            location.cloned(),
        ));
    }

    /// The front-end produced nothing usable for this file.
    pub fn fatal(&mut self, message: impl Into<String>, location: Option<SourceLocation>) {
        self.push(Diagnostic::new(
            Severity::Fatal,
            DiagnosticCategory::FatalParseFailure,
            message,
            location,
        ));
    }

    /// Whether a cursor at `location` lies at or after the halt point.
    pub fn should_halt(&self, location: &SourceLocation) -> bool {
        match self.halt_offset {
            Some(offset) => location.file == self.file && location.offset >= offset,
            None => false,
        }
    }

    pub fn mark_halted(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The model may be missing entities.
    pub fn incomplete(&self) -> bool {
        self.halt_offset.is_some()
    }

    pub fn has_fatal(&self) -> bool {
        self.halt_offset.is_some() || self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    /// Hand over the diagnostics in emission order, plus the incomplete flag.
    pub fn finish(self) -> (Vec<Diagnostic>, bool) {
        let incomplete = self.incomplete();
        (self.diagnostics, incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_end(severity: FrontEndSeverity, offset: usize) -> FrontEndDiagnostic {
        FrontEndDiagnostic {
            severity,
            message: format!("{:?}", severity),
            location: Some(SourceLocation::new("main.cpp", 1, 1, offset)),
        }
    }

    #[test]
    fn test_severity_mapping_drops_ignored() {
        let mut agg = DiagnosticAggregator::new("main.cpp");
        agg.ingest_front_end(&[
            front_end(FrontEndSeverity::Ignored, 0),
            front_end(FrontEndSeverity::Warning, 4),
            front_end(FrontEndSeverity::Error, 8),
        ]);
        let (diagnostics, incomplete) = agg.finish();
        let severities: Vec<_> = diagnostics.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Error]);
        assert!(!incomplete);
    }

    #[test]
    fn test_fatal_halts_at_offset() {
        let mut agg = DiagnosticAggregator::new("main.cpp");
        agg.ingest_front_end(&[front_end(FrontEndSeverity::Fatal, 120)]);

        assert!(!agg.should_halt(&SourceLocation::new("main.cpp", 3, 1, 40)));
        assert!(agg.should_halt(&SourceLocation::new("main.cpp", 9, 1, 120)));
        assert!(!agg.should_halt(&SourceLocation::new("other.h", 9, 1, 500)));
        assert!(agg.incomplete());
    }

    #[test]
    fn test_fatal_in_other_file_does_not_halt() {
        let mut agg = DiagnosticAggregator::new("main.cpp");
        agg.push(Diagnostic::new(
            Severity::Fatal,
            DiagnosticCategory::FrontEnd,
            "boom",
            Some(SourceLocation::new("header.h", 1, 1, 0)),
        ));
        assert!(!agg.incomplete());
        assert!(agg.has_fatal());
    }

    #[test]
    fn test_fatal_without_location_halts_everything() {
        let mut agg = DiagnosticAggregator::new("main.cpp");
        agg.fatal("could not parse", None);
        assert!(agg.should_halt(&SourceLocation::start_of("main.cpp")));
        let (diagnostics, incomplete) = agg.finish();
        assert_eq!(diagnostics[0].category, DiagnosticCategory::FatalParseFailure);
        assert!(incomplete);
    }
}
