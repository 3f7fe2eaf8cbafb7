// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Cancellation and deadline handle for topology acquisition.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reasons a [`Context`] may be done.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error, strum::EnumIs)]
pub enum ContextError {
    /// The context was cancelled.
    #[error("context cancelled")]
    Cancelled,
    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellable, optionally deadline-bearing execution context.
///
/// Clones share cancellation: cancelling any clone cancels all of them.  A child
/// context is cancelled with its parent but may be cancelled (or time out) on its own.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context which is never done unless cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context which is done once `deadline` has passed.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// A context which is done `timeout` from now.
    ///
    /// Must be called from within a tokio runtime if the runtime clock is paused.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A child context with an (optional) tighter deadline.
    #[must_use]
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout.map(|t| Instant::now() + t)) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (parent, child) => parent.or(child),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Cancel this context (and all its clones and children).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline of this context, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why this context is done, or `Ok(())` if it is not.
    ///
    /// Cancellation takes precedence over an elapsed deadline.
    ///
    /// # Errors
    ///
    /// Returns the [`ContextError`] describing why the context is done.
    pub fn err(&self) -> Result<(), ContextError> {
        if self.token.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Wait until this context is done and report why.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => ContextError::Cancelled,
                    () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }
}
