//! Execution engine for spec examples.
//!
//! An [`Example`] pairs a subject with its chain of enclosing containers and
//! runs the Before, JustBefore, Subject and After phases in order. Every node
//! invocation is a catch-and-convert boundary: explicit failures, panics and
//! async timeouts all land in a single-assignment [`Failer`], so the first
//! failure of a run is the one that is reported.

mod config;
mod failer;
mod tree;

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use spec_core::{
    AsyncBody, Benchmarker, CodeLocation, Container, Flag, MeasurementReport, NodeError,
    NodeResult, SetupNode, SpecContext, SpecFailure, SpecState, SpecSummary, Subject, SubjectBody,
};
use thiserror::Error;
use tokio::time;
use tracing::{debug, instrument, trace, warn};

pub use config::{ASYNC_TIMEOUT_ENV, ExecConfig};
pub use failer::{Component, Failer, panic_payload_text};
pub use tree::SpecTree;

/// Errors raised while driving examples outside of an existing runtime.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to build tokio runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("invalid value `{value}` for {name}: {source}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// One runnable unit: a subject plus its containers, outermost first.
#[derive(Debug)]
pub struct Example {
    subject: Subject,
    containers: Vec<Arc<Container>>,
    config: ExecConfig,
    focused: bool,
    pending: bool,
    skipped: bool,
    state: SpecState,
    failure: Option<SpecFailure>,
    run_time: Duration,
    measurements: BTreeMap<String, MeasurementReport>,
}

impl Example {
    /// Build an example; `focused`/`pending` are the union of the subject's and
    /// every container's flags.
    pub fn new(subject: Subject, containers: Vec<Arc<Container>>) -> Self {
        let flags = containers
            .iter()
            .map(|container| container.flag())
            .chain(std::iter::once(subject.flag()));
        let (mut focused, mut pending) = (false, false);
        for flag in flags {
            match flag {
                Flag::Focused => focused = true,
                Flag::Pending => pending = true,
                Flag::None => {}
            }
        }

        Self {
            subject,
            containers,
            config: ExecConfig::default(),
            focused,
            pending,
            skipped: false,
            state: SpecState::Invalid,
            failure: None,
            run_time: Duration::ZERO,
            measurements: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn containers(&self) -> &[Arc<Container>] {
        &self.containers
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Mark the example as skipped; a later run executes no nodes.
    pub fn skip(&mut self) {
        self.skipped = true;
    }

    pub fn skipped(&self) -> bool {
        self.skipped
    }

    pub fn is_measurement(&self) -> bool {
        self.subject.is_measurement()
    }

    pub fn state(&self) -> SpecState {
        self.state
    }

    pub fn failure(&self) -> Option<&SpecFailure> {
        self.failure.as_ref()
    }

    pub fn run_time(&self) -> Duration {
        self.run_time
    }

    pub fn measurements(&self) -> &BTreeMap<String, MeasurementReport> {
        &self.measurements
    }

    pub fn passed(&self) -> bool {
        self.state == SpecState::Passed
    }

    pub fn failed(&self) -> bool {
        self.state.is_failure()
    }

    /// Container texts followed by the subject text, space-joined.
    pub fn concatenated_string(&self) -> String {
        self.containers
            .iter()
            .map(|container| container.text())
            .chain(std::iter::once(self.subject.text()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Snapshot the example's outcome for reporting.
    pub fn summary(&self, suite_id: &str) -> SpecSummary {
        let mut component_texts: Vec<String> = self
            .containers
            .iter()
            .map(|container| container.text().to_string())
            .collect();
        component_texts.push(self.subject.text().to_string());

        let mut component_code_locations: Vec<CodeLocation> = self
            .containers
            .iter()
            .map(|container| container.location().clone())
            .collect();
        component_code_locations.push(self.subject.location().clone());

        let state = if self.skipped {
            SpecState::Skipped
        } else if self.pending {
            SpecState::Pending
        } else {
            self.state
        };

        SpecSummary {
            suite_id: suite_id.to_string(),
            component_texts,
            component_code_locations,
            state,
            failure: self.failure.clone(),
            run_time: self.run_time,
            is_measurement: self.is_measurement(),
            number_of_samples: self.subject.samples(),
            measurements: self.measurements.clone(),
        }
    }

    /// Run the example to completion. Must be called within a tokio runtime.
    #[instrument(skip_all, fields(spec = %self.concatenated_string()))]
    pub async fn run(&mut self) {
        if self.skipped {
            trace!("skipped");
            self.finish(SpecState::Skipped, None);
            return;
        }
        if self.pending {
            trace!("pending");
            self.finish(SpecState::Pending, None);
            return;
        }

        let started = Instant::now();
        let mut failer = Failer::new();
        let mut benchmarker = Benchmarker::new();
        let samples = self.subject.samples();

        for sample in 0..samples {
            trace!(sample, samples, "running sample");
            self.run_sample(&mut failer, &mut benchmarker).await;
            if failer.is_failed() {
                if sample + 1 < samples {
                    debug!(sample, "halting sampling after failure");
                }
                break;
            }
        }

        self.run_time = started.elapsed();
        self.measurements = benchmarker.into_measurements();
        let (state, failure) = failer.drain();
        self.finish(state, failure);
        metrics::histogram!("spec.exec.run_time_ms").record(self.run_time.as_secs_f64() * 1_000.0);
    }

    /// Drive [`Example::run`] on a private current-thread runtime.
    ///
    /// Async bodies abandoned after a timeout are left behind when the runtime
    /// is shut down; they are never awaited.
    pub fn run_blocking(&mut self) -> Result<(), ExecutionError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.run());
        runtime.shutdown_background();
        Ok(())
    }

    fn finish(&mut self, state: SpecState, failure: Option<SpecFailure>) {
        self.state = state;
        self.failure = failure;
        metrics::counter!("spec.exec.outcomes", "state" => state.as_str()).increment(1);
    }

    async fn run_sample(&self, failer: &mut Failer, benchmarker: &mut Benchmarker) {
        let mut entered = 0;
        let mut aborted = false;

        'befores: for (index, container) in self.containers.iter().enumerate() {
            entered = index + 1;
            for node in container.befores() {
                if !run_setup(node, index, failer) {
                    aborted = true;
                    break 'befores;
                }
            }
        }

        if !aborted {
            'just_befores: for (index, container) in self.containers[..entered].iter().enumerate() {
                for node in container.just_befores() {
                    if !run_setup(node, index, failer) {
                        aborted = true;
                        break 'just_befores;
                    }
                }
            }
        }

        if aborted {
            trace!(entered, "setup failed; skipping subject");
        } else {
            self.run_subject(failer, benchmarker).await;
        }

        for (index, container) in self.containers[..entered].iter().enumerate().rev() {
            for node in container.afters() {
                run_setup(node, index, failer);
            }
        }
    }

    async fn run_subject(&self, failer: &mut Failer, benchmarker: &mut Benchmarker) {
        let component = Component::new(
            self.subject.kind(),
            self.containers.len(),
            self.subject.location().clone(),
        );
        match self.subject.body() {
            SubjectBody::Sync(body) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| body()));
                record_outcome(failer, &component, outcome);
            }
            SubjectBody::Measured { body, .. } => {
                let outcome = catch_unwind(AssertUnwindSafe(|| body(&mut *benchmarker)));
                record_outcome(failer, &component, outcome);
            }
            SubjectBody::Async { body, timeout } => {
                let timeout = timeout.unwrap_or(self.config.default_async_timeout());
                run_async(body, timeout, &component, failer).await;
            }
        }
    }
}

/// Invoke a setup node, returning `false` when it recorded a failure.
fn run_setup(node: &SetupNode, index: usize, failer: &mut Failer) -> bool {
    trace!(kind = ?node.kind(), index, "running setup node");
    let component = Component::new(node.kind().into(), index, node.location().clone());
    let outcome = catch_unwind(AssertUnwindSafe(|| node.invoke()));
    record_outcome(failer, &component, outcome)
}

fn record_outcome(
    failer: &mut Failer,
    component: &Component,
    outcome: Result<NodeResult, Box<dyn Any + Send>>,
) -> bool {
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            record_error(failer, component, err);
            false
        }
        Err(payload) => {
            failer.panic(component, payload);
            false
        }
    }
}

fn record_error(failer: &mut Failer, component: &Component, err: NodeError) {
    match err {
        NodeError::Failure { message, location } => {
            let location = location.unwrap_or_else(|| component.location.clone());
            failer.fail(component, message, location);
        }
        NodeError::Fault(fault) => failer.fault(component, &fault),
    }
}

/// Race an async body's completion signal against its timeout.
///
/// The body runs on its own task. A task that finishes with an error or panic
/// fails the subject immediately; a task that finishes cleanly still has to
/// signal completion before the deadline. Once the deadline has passed the
/// subject is timed out even if the body finished in the meantime.
async fn run_async(
    body: &AsyncBody,
    timeout: Duration,
    component: &Component,
    failer: &mut Failer,
) {
    let ctx = SpecContext::new();
    let future = match catch_unwind(AssertUnwindSafe(|| body(ctx.clone()))) {
        Ok(future) => future,
        Err(payload) => {
            failer.panic(component, payload);
            return;
        }
    };

    let mut task = tokio::spawn(future);
    let deadline = time::sleep(timeout);
    tokio::pin!(deadline);
    let mut task_finished = false;

    loop {
        tokio::select! {
            biased;
            // An overrun that blocked the thread leaves every branch ready.
            _ = &mut deadline => {
                ctx.cancel();
                warn!(
                    ?timeout,
                    location = %component.location,
                    "async body timed out; abandoning its task"
                );
                failer.timeout(component);
                return;
            }
            joined = &mut task, if !task_finished => {
                task_finished = true;
                match joined {
                    Ok(Ok(())) => continue,
                    Ok(Err(err)) => record_error(failer, component, err),
                    Err(join_err) if join_err.is_panic() => {
                        failer.panic(component, join_err.into_panic());
                    }
                    Err(join_err) => {
                        let message = format!("async body aborted: {join_err}");
                        failer.fail(component, message, component.location.clone());
                    }
                }
                return;
            }
            _ = ctx.completed() => {
                trace!("async body signalled completion");
                return;
            }
        }
    }
}
