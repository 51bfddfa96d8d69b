use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

const DEFAULT_PRECISION: usize = 3;

/// Aggregated samples recorded under one label by a measured subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementReport {
    pub name: String,
    /// Free-form info captured by the first recording.
    pub info: Option<String>,
    /// Position of this label among all labels, by first recording.
    pub order: usize,
    pub results: Vec<f64>,
    pub units: String,
    pub precision: usize,
    pub smallest_label: String,
    pub largest_label: String,
    pub average_label: String,
}

impl MeasurementReport {
    pub fn smallest(&self) -> f64 {
        self.results
            .iter()
            .copied()
            .reduce(f64::min)
            .unwrap_or_default()
    }

    pub fn largest(&self) -> f64 {
        self.results
            .iter()
            .copied()
            .reduce(f64::max)
            .unwrap_or_default()
    }

    pub fn average(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.results.iter().sum::<f64>() / self.results.len() as f64
    }

    /// Population standard deviation of the recorded values.
    pub fn std_deviation(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let average = self.average();
        let variance = self
            .results
            .iter()
            .map(|value| (value - average).powi(2))
            .sum::<f64>()
            / self.results.len() as f64;
        variance.sqrt()
    }
}

/// Recording handle passed to measured subjects.
///
/// One benchmarker lives for a whole example run, so values recorded in
/// every sample accumulate under their label.
#[derive(Debug, Default)]
pub struct Benchmarker {
    measurements: BTreeMap<String, MeasurementReport>,
}

impl Benchmarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body`, record its wall-clock duration in seconds, and return it.
    pub fn time<F>(&mut self, name: &str, body: F, info: Option<&str>) -> Duration
    where
        F: FnOnce(),
    {
        let start = Instant::now();
        body();
        let elapsed = start.elapsed();
        self.record(
            name,
            elapsed.as_secs_f64(),
            info,
            ReportShape {
                units: "s",
                precision: DEFAULT_PRECISION,
                labels: ("Fastest Time", "Slowest Time", "Average Time"),
            },
        );
        elapsed
    }

    /// Record an arbitrary numeric value.
    pub fn record_value(&mut self, name: &str, value: f64, info: Option<&str>) {
        self.record(
            name,
            value,
            info,
            ReportShape {
                units: "",
                precision: DEFAULT_PRECISION,
                labels: ("Smallest", "Largest", "Average"),
            },
        );
    }

    /// Record a numeric value with explicit display units and precision.
    pub fn record_value_with_precision(
        &mut self,
        name: &str,
        value: f64,
        units: &str,
        precision: usize,
        info: Option<&str>,
    ) {
        self.record(
            name,
            value,
            info,
            ReportShape {
                units,
                precision,
                labels: ("Smallest", "Largest", "Average"),
            },
        );
    }

    /// Borrow the reports recorded so far.
    pub fn measurements(&self) -> &BTreeMap<String, MeasurementReport> {
        &self.measurements
    }

    pub fn into_measurements(self) -> BTreeMap<String, MeasurementReport> {
        self.measurements
    }

    fn record(&mut self, name: &str, value: f64, info: Option<&str>, shape: ReportShape<'_>) {
        let order = self.measurements.len();
        // name, info, units and labels are fixed by the first recording
        self.measurements
            .entry(name.to_string())
            .or_insert_with(|| MeasurementReport {
                name: name.to_string(),
                info: info.map(str::to_string),
                order,
                results: Vec::new(),
                units: shape.units.to_string(),
                precision: shape.precision,
                smallest_label: shape.labels.0.to_string(),
                largest_label: shape.labels.1.to_string(),
                average_label: shape.labels.2.to_string(),
            })
            .results
            .push(value);
    }
}

struct ReportShape<'a> {
    units: &'a str,
    precision: usize,
    labels: (&'static str, &'static str, &'static str),
}
