use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Source position attached to containers, nodes, and table entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeLocation {
    /// Path of the source file as reported by the compiler.
    pub file_name: String,
    /// One-based line number.
    pub line_number: u32,
}

impl CodeLocation {
    /// Construct a location from explicit parts.
    pub fn new(file_name: impl Into<String>, line_number: u32) -> Self {
        Self {
            file_name: file_name.into(),
            line_number,
        }
    }

    /// Capture the location of the caller.
    ///
    /// Functions that forward their own caller should be annotated with
    /// `#[track_caller]` so the captured position points at user code.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&Location<'_>> for CodeLocation {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file_name: location.file().to_string(),
            line_number: location.line(),
        }
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name, self.line_number)
    }
}
