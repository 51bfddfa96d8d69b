use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::context::SpecContext;
use crate::location::CodeLocation;
use crate::measure::Benchmarker;
use crate::outcome::NodeResult;

/// Zero-argument body used by setup nodes and ordinary subjects.
pub type SyncBody = Arc<dyn Fn() -> NodeResult + Send + Sync>;

/// Body of an asynchronous subject; completion is signalled through the context.
pub type AsyncBody = Arc<dyn Fn(SpecContext) -> BoxFuture<'static, NodeResult> + Send + Sync>;

/// Body of a measured subject, invoked once per sample.
pub type MeasureBody = Arc<dyn Fn(&mut Benchmarker) -> NodeResult + Send + Sync>;

/// Declarative marker carried by containers and subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    #[default]
    None,
    Focused,
    Pending,
}

/// Role of a node in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    BeforeEach,
    JustBeforeEach,
    AfterEach,
    Subject,
    MeasuredSubject,
}

/// The three setup roles a container can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupKind {
    BeforeEach,
    JustBeforeEach,
    AfterEach,
}

impl From<SetupKind> for NodeKind {
    fn from(kind: SetupKind) -> Self {
        match kind {
            SetupKind::BeforeEach => NodeKind::BeforeEach,
            SetupKind::JustBeforeEach => NodeKind::JustBeforeEach,
            SetupKind::AfterEach => NodeKind::AfterEach,
        }
    }
}

/// A before/just-before/after node registered on a container.
#[derive(Clone)]
pub struct SetupNode {
    kind: SetupKind,
    location: CodeLocation,
    body: SyncBody,
}

impl SetupNode {
    /// Construct a setup node located at the caller.
    #[track_caller]
    pub fn new<F>(kind: SetupKind, body: F) -> Self
    where
        F: Fn() -> NodeResult + Send + Sync + 'static,
    {
        Self {
            kind,
            location: CodeLocation::caller(),
            body: Arc::new(body),
        }
    }

    #[track_caller]
    pub fn before_each<F>(body: F) -> Self
    where
        F: Fn() -> NodeResult + Send + Sync + 'static,
    {
        Self::new(SetupKind::BeforeEach, body)
    }

    #[track_caller]
    pub fn just_before_each<F>(body: F) -> Self
    where
        F: Fn() -> NodeResult + Send + Sync + 'static,
    {
        Self::new(SetupKind::JustBeforeEach, body)
    }

    #[track_caller]
    pub fn after_each<F>(body: F) -> Self
    where
        F: Fn() -> NodeResult + Send + Sync + 'static,
    {
        Self::new(SetupKind::AfterEach, body)
    }

    /// Override the captured location.
    pub fn with_location(mut self, location: CodeLocation) -> Self {
        self.location = location;
        self
    }

    pub fn kind(&self) -> SetupKind {
        self.kind
    }

    pub fn location(&self) -> &CodeLocation {
        &self.location
    }

    /// Invoke the body once. Panics propagate to the caller.
    pub fn invoke(&self) -> NodeResult {
        (self.body)()
    }
}

impl fmt::Debug for SetupNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupNode")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Executable shape of a subject.
#[derive(Clone)]
pub enum SubjectBody {
    /// Runs synchronously on the engine's thread of control.
    Sync(SyncBody),
    /// Dispatched onto its own task and raced against a timeout.
    Async {
        body: AsyncBody,
        timeout: Option<Duration>,
    },
    /// Repeats the full lifecycle once per sample.
    Measured { body: MeasureBody, samples: usize },
}

impl fmt::Debug for SubjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectBody::Sync(_) => f.write_str("Sync(..)"),
            SubjectBody::Async { timeout, .. } => f
                .debug_struct("Async")
                .field("timeout", timeout)
                .finish_non_exhaustive(),
            SubjectBody::Measured { samples, .. } => f
                .debug_struct("Measured")
                .field("samples", samples)
                .finish_non_exhaustive(),
        }
    }
}

/// The innermost behaviour under test.
#[derive(Debug, Clone)]
pub struct Subject {
    text: String,
    location: CodeLocation,
    flag: Flag,
    body: SubjectBody,
}

impl Subject {
    /// Assemble a subject from already-built parts.
    pub fn from_parts(
        text: impl Into<String>,
        location: CodeLocation,
        flag: Flag,
        body: SubjectBody,
    ) -> Self {
        Self {
            text: text.into(),
            location,
            flag,
            body,
        }
    }

    /// Ordinary subject.
    #[track_caller]
    pub fn it<F>(text: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> NodeResult + Send + Sync + 'static,
    {
        Self::from_parts(
            text,
            CodeLocation::caller(),
            Flag::None,
            SubjectBody::Sync(Arc::new(body)),
        )
    }

    /// Asynchronous subject that must call [`SpecContext::done`] before its timeout.
    #[track_caller]
    pub fn it_async<F, Fut>(text: impl Into<String>, body: F) -> Self
    where
        F: Fn(SpecContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = NodeResult> + Send + 'static,
    {
        let body: AsyncBody = Arc::new(move |ctx| body(ctx).boxed());
        Self::from_parts(
            text,
            CodeLocation::caller(),
            Flag::None,
            SubjectBody::Async {
                body,
                timeout: None,
            },
        )
    }

    /// Measured subject repeated `samples` times (at least once).
    #[track_caller]
    pub fn measure<F>(text: impl Into<String>, samples: usize, body: F) -> Self
    where
        F: Fn(&mut Benchmarker) -> NodeResult + Send + Sync + 'static,
    {
        Self::from_parts(
            text,
            CodeLocation::caller(),
            Flag::None,
            SubjectBody::Measured {
                body: Arc::new(body),
                samples: samples.max(1),
            },
        )
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flag = flag;
        self
    }

    pub fn focused(self) -> Self {
        self.with_flag(Flag::Focused)
    }

    pub fn pending(self) -> Self {
        self.with_flag(Flag::Pending)
    }

    pub fn with_location(mut self, location: CodeLocation) -> Self {
        self.location = location;
        self
    }

    /// Set the timeout of an asynchronous subject; other shapes ignore it.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        if let SubjectBody::Async { timeout, .. } = &mut self.body {
            *timeout = Some(duration);
        }
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> &CodeLocation {
        &self.location
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn body(&self) -> &SubjectBody {
        &self.body
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            SubjectBody::Measured { .. } => NodeKind::MeasuredSubject,
            SubjectBody::Sync(_) | SubjectBody::Async { .. } => NodeKind::Subject,
        }
    }

    pub fn is_measurement(&self) -> bool {
        matches!(self.body, SubjectBody::Measured { .. })
    }

    /// Number of lifecycle repetitions; 1 unless measured.
    pub fn samples(&self) -> usize {
        match self.body {
            SubjectBody::Measured { samples, .. } => samples,
            SubjectBody::Sync(_) | SubjectBody::Async { .. } => 1,
        }
    }

    /// Timeout configured on an asynchronous subject.
    pub fn timeout(&self) -> Option<Duration> {
        match self.body {
            SubjectBody::Async { timeout, .. } => timeout,
            SubjectBody::Sync(_) | SubjectBody::Measured { .. } => None,
        }
    }
}
