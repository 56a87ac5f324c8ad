//! Loop control: cancellation and an optional overall deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation flag and deadline checked by the orchestration loop.
///
/// The loop checks [`should_stop`](Self::should_stop) at the top of every pass
/// and before every blocking call, and races its fixed-interval pause against
/// both signals. Cloning shares the underlying token, so the CLI can keep a
/// clone and cancel it from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct LoopControl {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl LoopControl {
    /// Creates a control with a fresh token and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a control driven by an existing token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Stops the loop once `deadline` passes.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stops the loop `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Returns a handle to the cancellation token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled or past the deadline.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Sleeps for `interval` unless stopped first.
    ///
    /// Returns `true` if the loop should continue afterwards.
    pub async fn pause(&self, interval: Duration) -> bool {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = self.token.cancelled() => false,
            () = deadline => false,
            () = tokio::time::sleep(interval) => !self.should_stop(),
        }
    }
}
