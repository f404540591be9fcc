//! Per-call cancellation and deadlines.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{CancelCause, ConnectorError, ConnectorResult};

/// Carries a caller's cancellation signal and optional deadline into a
/// connector operation.
///
/// Contexts form a tree: cancelling a parent cancels every context derived
/// from it, and a child's deadline is never later than its parent's.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one shared with an async runtime.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A child context that also expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A child context that also expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// A child that can be cancelled without affecting `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// Fail with `Cancelled` if the caller stopped waiting.
    pub fn check(&self) -> ConnectorResult<()> {
        match self.cause() {
            Some(cause) => Err(ConnectorError::Cancelled(cause)),
            None => Ok(()),
        }
    }

    fn cause(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            return Some(CancelCause::Requested);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_never_expires() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn cancel_propagates_to_children_only() {
        let parent = Context::background();
        let child = parent.child();
        let grandchild = child.with_timeout(Duration::from_secs(60));

        child.cancel();
        assert!(parent.check().is_ok());
        assert!(matches!(
            grandchild.check(),
            Err(ConnectorError::Cancelled(CancelCause::Requested))
        ));
    }

    #[test]
    fn elapsed_deadline_cancels() {
        let ctx = Context::background().with_deadline(Instant::now());
        assert!(matches!(
            ctx.check(),
            Err(ConnectorError::Cancelled(CancelCause::DeadlineExceeded))
        ));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn child_deadline_never_extends_parent() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
