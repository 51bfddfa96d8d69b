use std::fmt;

use tokio_util::sync::CancellationToken;

/// Context handed to asynchronous subjects.
///
/// The subject reports completion through [`SpecContext::done`]. When the
/// subject's timeout elapses first, the engine cancels the context and moves
/// on; bodies that keep running should watch [`SpecContext::is_cancelled`]
/// and stop touching shared fixtures.
#[derive(Clone)]
pub struct SpecContext {
    cancellation: CancellationToken,
    completion: CancellationToken,
}

impl SpecContext {
    /// Create a fresh context for one subject invocation.
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            completion: CancellationToken::new(),
        }
    }

    /// Signal that the subject finished. Repeated calls are ignored.
    pub fn done(&self) {
        self.completion.cancel();
    }

    /// Returns `true` once [`SpecContext::done`] has been called.
    pub fn is_done(&self) -> bool {
        self.completion.is_cancelled()
    }

    /// Wait until the subject signals completion.
    pub async fn completed(&self) {
        self.completion.cancelled().await;
    }

    /// Returns `true` once the engine gave up on the subject.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Wait until the engine gives up on the subject.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Access the underlying cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Abandon the subject: cancel the context without signalling completion.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl Default for SpecContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecContext")
            .field("done", &self.is_done())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
