use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::location::CodeLocation;
use crate::measure::MeasurementReport;
use crate::outcome::{SpecFailure, SpecState};

/// Result of one example, handed to suite orchestration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecSummary {
    pub suite_id: String,
    /// Container texts outer to inner, then the subject's text.
    pub component_texts: Vec<String>,
    /// Locations in the same order as `component_texts`.
    pub component_code_locations: Vec<CodeLocation>,
    pub state: SpecState,
    /// Absent unless the example failed.
    pub failure: Option<SpecFailure>,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub run_time: Duration,
    pub is_measurement: bool,
    pub number_of_samples: usize,
    pub measurements: BTreeMap<String, MeasurementReport>,
}

impl SpecSummary {
    /// Space-joined component texts.
    pub fn full_text(&self) -> String {
        self.component_texts.join(" ")
    }
}

fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64() * 1_000.0)
}
