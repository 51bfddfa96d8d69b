use once_cell::sync::Lazy;
use serde::Serialize;

use crate::location::CodeLocation;

/// Canonical diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Declaration cannot run.
    Error,
}

/// Structured metadata for a declaration diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticCode {
    /// Stable identifier (e.g. `TBL012`).
    pub code: &'static str,
    /// Component that raises the diagnostic.
    pub subsystem: &'static str,
    pub default_severity: Severity,
    /// Short human-readable description.
    pub summary: &'static str,
}

/// Concrete diagnostic produced from a configuration error.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: &'static DiagnosticCode,
    /// Long form message presented to the user.
    pub message: String,
    pub location: Option<CodeLocation>,
}

impl Diagnostic {
    /// Convenience constructor.
    pub fn new(code: &'static DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Attach location metadata to an existing diagnostic.
    pub fn with_location(mut self, location: CodeLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Public accessor for the registry.
pub fn diagnostic_codes() -> &'static [DiagnosticCode] {
    &DIAGNOSTIC_CODES
}

/// Registry of every configuration diagnostic.
pub static DIAGNOSTIC_CODES: Lazy<Vec<DiagnosticCode>> = Lazy::new(|| {
    vec![
        DiagnosticCode {
            code: "TBL001",
            subsystem: "table",
            default_severity: Severity::Error,
            summary: "Table declared without a body function",
        },
        DiagnosticCode {
            code: "TBL002",
            subsystem: "table",
            default_severity: Severity::Error,
            summary: "Table declared with more than one body function",
        },
        DiagnosticCode {
            code: "TBL003",
            subsystem: "table",
            default_severity: Severity::Error,
            summary: "Table received `nil` where an entry or decoration was expected",
        },
        DiagnosticCode {
            code: "TBL004",
            subsystem: "table",
            default_severity: Severity::Error,
            summary: "Entry description is not text, a naming function, or a template",
        },
        DiagnosticCode {
            code: "TBL010",
            subsystem: "binding",
            default_severity: Severity::Error,
            summary: "Entry supplies fewer parameters than the function requires",
        },
        DiagnosticCode {
            code: "TBL011",
            subsystem: "binding",
            default_severity: Severity::Error,
            summary: "Entry supplies more parameters than a non-variadic function accepts",
        },
        DiagnosticCode {
            code: "TBL012",
            subsystem: "binding",
            default_severity: Severity::Error,
            summary: "Entry parameter is not assignable to the declared parameter type",
        },
        DiagnosticCode {
            code: "TBL013",
            subsystem: "binding",
            default_severity: Severity::Error,
            summary: "Entry parameter is not assignable to the variadic element type",
        },
        DiagnosticCode {
            code: "TBL014",
            subsystem: "binding",
            default_severity: Severity::Error,
            summary: "Context-taking function invoked without a spec context",
        },
    ]
});
