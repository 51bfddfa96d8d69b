use std::any::Any;

use spec_core::{CodeLocation, ConfigError, NodeKind, SpecFailure, SpecState};
use tracing::{debug, trace};

const PANIC_MESSAGE: &str = "Test Panicked";
const TIMEOUT_MESSAGE: &str = "Timed out";

/// Node currently executing, used to attribute a recorded failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub kind: NodeKind,
    /// Index of the owning container, or the chain length for the subject.
    pub index: usize,
    pub location: CodeLocation,
}

impl Component {
    pub fn new(kind: NodeKind, index: usize, location: CodeLocation) -> Self {
        Self {
            kind,
            index,
            location,
        }
    }
}

/// Single-assignment failure register for one example run.
///
/// Only the first failure is kept; every later call is ignored until
/// [`Failer::drain`] resets the register.
#[derive(Debug, Default)]
pub struct Failer {
    recorded: Option<(SpecState, SpecFailure)>,
}

impl Failer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicit failure.
    pub fn fail(
        &mut self,
        component: &Component,
        message: impl Into<String>,
        location: CodeLocation,
    ) {
        self.record(SpecState::Failed, component, message.into(), location, None);
    }

    /// Record a caught panic, forwarding its payload.
    pub fn panic(&mut self, component: &Component, payload: Box<dyn Any + Send>) {
        let forwarded = panic_payload_text(payload.as_ref());
        self.record(
            SpecState::Panicked,
            component,
            PANIC_MESSAGE.to_string(),
            component.location.clone(),
            Some(forwarded),
        );
    }

    /// Record an elapsed timeout.
    pub fn timeout(&mut self, component: &Component) {
        self.record(
            SpecState::TimedOut,
            component,
            TIMEOUT_MESSAGE.to_string(),
            component.location.clone(),
            None,
        );
    }

    /// Record a declaration fault surfaced by a node; it cannot be recovered from.
    pub fn fault(&mut self, component: &Component, error: &ConfigError) {
        self.record(
            SpecState::Panicked,
            component,
            error.to_string(),
            error.location().clone(),
            None,
        );
    }

    /// Returns `true` once any failure has been recorded.
    pub fn is_failed(&self) -> bool {
        self.recorded.is_some()
    }

    pub fn failure(&self) -> Option<&SpecFailure> {
        self.recorded.as_ref().map(|(_, failure)| failure)
    }

    /// Take the recorded outcome, leaving the register empty.
    pub fn drain(&mut self) -> (SpecState, Option<SpecFailure>) {
        match self.recorded.take() {
            Some((state, failure)) => (state, Some(failure)),
            None => (SpecState::Passed, None),
        }
    }

    fn record(
        &mut self,
        state: SpecState,
        component: &Component,
        message: String,
        location: CodeLocation,
        forwarded_panic: Option<String>,
    ) {
        if let Some((first, _)) = &self.recorded {
            trace!(%state, %first, "ignoring failure after the first");
            return;
        }
        debug!(%state, %location, kind = ?component.kind, "recorded failure: {message}");
        self.recorded = Some((
            state,
            SpecFailure {
                message,
                location,
                forwarded_panic,
                component_type: component.kind,
                component_index: component.index,
                component_location: component.location.clone(),
            },
        ));
    }
}

/// Render a panic payload as text.
pub fn panic_payload_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic payload)".to_string()
    }
}
