//! External stop signals for long-running layouts.
//!
//! `iterations` can be set arbitrarily high, so interruptible runs check an
//! [`Interrupt`] once per iteration.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Why a run was stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    Cancelled,
    DeadlineExceeded,
}

/// Cancellation token and/or deadline checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Interrupt {
    /// An interrupt that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    /// Stop when `token` is cancelled.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            deadline: None,
        }
    }

    /// Stop once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: None,
            deadline: Some(deadline),
        }
    }

    /// Stop once `budget` has elapsed from now.
    pub fn with_timeout(budget: Duration) -> Self {
        Self::with_deadline(Instant::now() + budget)
    }

    /// Add a deadline to an existing interrupt.
    pub fn and_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the reason to stop, if any. Cancellation wins over the deadline.
    pub fn check(&self) -> Option<InterruptReason> {
        if self
            .token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Some(InterruptReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(InterruptReason::DeadlineExceeded),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_fires() {
        assert_eq!(Interrupt::none().check(), None);
    }

    #[test]
    fn test_token_cancellation() {
        let token = CancellationToken::new();
        let interrupt = Interrupt::with_token(token.clone());
        assert_eq!(interrupt.check(), None);

        token.cancel();
        assert_eq!(interrupt.check(), Some(InterruptReason::Cancelled));
    }

    #[test]
    fn test_past_deadline_fires() {
        let interrupt = Interrupt::with_deadline(Instant::now());
        assert_eq!(interrupt.check(), Some(InterruptReason::DeadlineExceeded));

        let interrupt = Interrupt::with_timeout(Duration::from_secs(3600));
        assert_eq!(interrupt.check(), None);
    }

    #[test]
    fn test_cancellation_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let interrupt = Interrupt::with_token(token).and_deadline(Instant::now());
        assert_eq!(interrupt.check(), Some(InterruptReason::Cancelled));
    }
}
