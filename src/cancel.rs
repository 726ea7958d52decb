//! Deadlines and cancellation for blocking engine I/O.

use std::fmt;
use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Granularity of sliced blocking reads; bounds how late a deadline or a
/// cancellation is noticed.
pub(crate) const POLL_SLICE: Duration = Duration::from_millis(50);

/// Shared flag flipped once to abandon in-flight I/O.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Limits applied to one blocking exchange.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Wait<'a> {
    deadline: Option<Instant>,
    cancel: Option<&'a CancelToken>,
}

impl<'a> Wait<'a> {
    pub(crate) fn new(deadline: Option<Instant>, cancel: Option<&'a CancelToken>) -> Self {
        Self { deadline, cancel }
    }

    pub(crate) fn unbounded() -> Self {
        Self::default()
    }

    pub(crate) fn within(timeout: Option<Duration>) -> Self {
        Self::new(timeout.map(|t| Instant::now() + t), None)
    }

    /// Time left before the deadline, if any.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails with `TimedOut` past the deadline and with a cancellation error
    /// once the token is tripped.
    pub(crate) fn check(&self) -> io::Result<()> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(io::Error::other(Abandoned::Cancelled));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    Abandoned::DeadlineElapsed,
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Abandoned {
    Cancelled,
    DeadlineElapsed,
}

impl fmt::Display for Abandoned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abandoned::Cancelled => f.write_str("request cancelled"),
            Abandoned::DeadlineElapsed => f.write_str("deadline elapsed"),
        }
    }
}

impl std::error::Error for Abandoned {}

/// True for errors produced by [`Wait::check`] rather than by the peer.
pub(crate) fn is_abandoned(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<Abandoned>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_wait_never_expires() {
        let wait = Wait::unbounded();
        assert!(wait.check().is_ok());
        assert!(wait.remaining().is_none());
    }

    #[test]
    fn elapsed_deadline_times_out() {
        let wait = Wait::new(Some(Instant::now()), None);
        let err = wait.check().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(is_abandoned(&err));
        assert_eq!(wait.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        let wait = Wait::new(None, Some(&token));
        assert!(wait.check().is_ok());
        clone.cancel();
        let err = wait.check().unwrap_err();
        assert!(is_abandoned(&err));
        assert!(token.is_cancelled());
    }
}
