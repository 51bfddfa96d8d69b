//! Core types for declaring specs: containers, setup nodes, subjects, failures, and summaries.

mod container;
mod context;
mod diagnostics;
mod error;
mod location;
mod measure;
mod node;
mod outcome;
mod summary;

pub use container::Container;
pub use context::SpecContext;
pub use diagnostics::{DIAGNOSTIC_CODES, Diagnostic, DiagnosticCode, Severity, diagnostic_codes};
pub use error::{ConfigError, FunctionKind};
pub use location::CodeLocation;
pub use measure::{Benchmarker, MeasurementReport};
pub use node::{
    AsyncBody, Flag, MeasureBody, NodeKind, SetupKind, SetupNode, Subject, SubjectBody, SyncBody,
};
pub use outcome::{NodeError, NodeResult, SpecFailure, SpecState, fail};
pub use summary::SpecSummary;

/// Convenient prelude re-exporting the most commonly used items.
pub mod prelude {
    pub use crate::container::Container;
    pub use crate::context::SpecContext;
    pub use crate::location::CodeLocation;
    pub use crate::measure::Benchmarker;
    pub use crate::node::{Flag, SetupNode, Subject};
    pub use crate::outcome::{NodeError, NodeResult, SpecState, fail};
}
