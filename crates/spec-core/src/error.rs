use std::fmt;

use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticCode, diagnostic_codes};
use crate::location::CodeLocation;

/// Which user function a table argument list was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// The function shared by every entry of a table.
    TableBody,
    /// A naming function used to render entry descriptions.
    EntryDescription,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::TableBody => f.write_str("Table Body function"),
            FunctionKind::EntryDescription => f.write_str("Entry Description function"),
        }
    }
}

/// Mistakes in how a table or spec was declared.
///
/// These never describe a test outcome. Table assembly errors are returned
/// while building; argument mismatches for a single entry are carried by the
/// generated subject and surface when it is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no table body function provided to table declared at {location}")]
    MissingTableBody { location: CodeLocation },
    #[error("table declared at {location} received more than one table body function")]
    MultipleTableBodies { location: CodeLocation },
    #[error("table declared at {location} received `nil` as argument #{index}")]
    NilTableArgument { index: usize, location: CodeLocation },
    #[error(
        "invalid entry description at {location}: expected text, a naming function, a format template, or nothing"
    )]
    InvalidEntryDescription { location: CodeLocation },
    #[error(
        "too few parameters passed to {kind} for entry at {location}: expected {expected}, got {actual}"
    )]
    TooFewParameters {
        expected: usize,
        actual: usize,
        kind: FunctionKind,
        location: CodeLocation,
    },
    #[error(
        "too many parameters passed to {kind} for entry at {location}: expected {expected}, got {actual}"
    )]
    TooManyParameters {
        expected: usize,
        actual: usize,
        kind: FunctionKind,
        location: CodeLocation,
    },
    #[error(
        "incorrect parameter type passed to {kind} for entry at {location}: parameter #{position} expected `{expected}`, got `{actual}`"
    )]
    IncorrectParameterType {
        position: usize,
        expected: &'static str,
        actual: &'static str,
        kind: FunctionKind,
        location: CodeLocation,
    },
    #[error(
        "incorrect variadic parameter type passed to {kind} for entry at {location}: expected `{expected}`, got `{actual}`"
    )]
    IncorrectVariadicParameterType {
        expected: &'static str,
        actual: &'static str,
        kind: FunctionKind,
        location: CodeLocation,
    },
    #[error("{kind} for entry at {location} expects a spec context but none was supplied")]
    MissingContext {
        kind: FunctionKind,
        location: CodeLocation,
    },
}

impl ConfigError {
    /// Location the error is attributed to.
    pub fn location(&self) -> &CodeLocation {
        match self {
            ConfigError::MissingTableBody { location }
            | ConfigError::MultipleTableBodies { location }
            | ConfigError::NilTableArgument { location, .. }
            | ConfigError::InvalidEntryDescription { location }
            | ConfigError::TooFewParameters { location, .. }
            | ConfigError::TooManyParameters { location, .. }
            | ConfigError::IncorrectParameterType { location, .. }
            | ConfigError::IncorrectVariadicParameterType { location, .. }
            | ConfigError::MissingContext { location, .. } => location,
        }
    }

    /// Stable diagnostic code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::MissingTableBody { .. } => "TBL001",
            ConfigError::MultipleTableBodies { .. } => "TBL002",
            ConfigError::NilTableArgument { .. } => "TBL003",
            ConfigError::InvalidEntryDescription { .. } => "TBL004",
            ConfigError::TooFewParameters { .. } => "TBL010",
            ConfigError::TooManyParameters { .. } => "TBL011",
            ConfigError::IncorrectParameterType { .. } => "TBL012",
            ConfigError::IncorrectVariadicParameterType { .. } => "TBL013",
            ConfigError::MissingContext { .. } => "TBL014",
        }
    }

    /// Convert into a structured diagnostic, or `None` if the code is unregistered.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        let code = self.code();
        let meta: &'static DiagnosticCode =
            diagnostic_codes().iter().find(|entry| entry.code == code)?;
        Some(Diagnostic::new(meta, self.to_string()).with_location(self.location().clone()))
    }
}
