//! One-shot cancellation signal carrying a recorded cause.
//!
//! A `CancelToken` fires at most once. The first cause recorded wins and
//! every clone observes it. Child tokens fire with their parent but can be
//! cancelled on their own without touching the parent.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Why a token fired.
#[derive(Debug, Clone)]
pub enum CancelCause {
    /// Explicit external cancellation.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
    /// The owning reader was closed.
    Closed,
    /// The wrapped source reached its natural end.
    EndOfStream,
    /// The wrapped source failed.
    Source(Arc<io::Error>),
}

#[derive(Debug, Default)]
struct State {
    cause: Option<CancelCause>,
    children: Vec<Weak<Inner>>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    fired: Condvar,
    deadline: Option<Instant>,
}

impl Inner {
    fn new(deadline: Option<Instant>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            fired: Condvar::new(),
            deadline,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, cause: CancelCause) -> bool {
        let children = {
            let mut state = self.lock();
            if state.cause.is_some() {
                return false;
            }
            state.cause = Some(cause.clone());
            self.fired.notify_all();
            std::mem::take(&mut state.children)
        };

        // Parent lock is released before touching children.
        for child in children.iter().filter_map(Weak::upgrade) {
            child.fire(cause.clone());
        }
        true
    }

    fn check_deadline(&self) {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.fire(CancelCause::DeadlineExceeded);
            }
        }
    }
}

/// Cloneable cancellation token.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Create a token that only fires when cancelled explicitly.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(None)),
        }
    }

    /// Create a token that fires with `DeadlineExceeded` at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(Inner::new(Some(deadline))),
        }
    }

    /// Create a token that fires with `DeadlineExceeded` after `timeout`.
    ///
    /// A timeout too large to represent as an `Instant` means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    /// Derive a token that fires when this one fires.
    ///
    /// The child inherits the deadline and, if this token already fired,
    /// starts out fired with the same cause.
    pub fn child(&self) -> Self {
        let child = Arc::new(Inner::new(self.inner.deadline));
        {
            let mut state = self.inner.lock();
            if let Some(cause) = state.cause.clone() {
                child.lock().cause = Some(cause);
            } else {
                state.children.retain(|weak| weak.strong_count() > 0);
                state.children.push(Arc::downgrade(&child));
            }
        }
        Self { inner: child }
    }

    /// Request cancellation with the `Cancelled` cause.
    pub fn cancel(&self) {
        self.cancel_with(CancelCause::Cancelled);
    }

    /// Request cancellation with a specific cause.
    ///
    /// Returns `false` if the token had already fired; the earlier cause is kept.
    pub fn cancel_with(&self, cause: CancelCause) -> bool {
        self.inner.fire(cause)
    }

    /// Returns true once the token has fired (including by deadline).
    pub fn is_cancelled(&self) -> bool {
        self.inner.check_deadline();
        self.inner.lock().cause.is_some()
    }

    /// The recorded cause, if the token has fired.
    pub fn cause(&self) -> Option<CancelCause> {
        self.inner.check_deadline();
        self.inner.lock().cause.clone()
    }

    /// Block until the token fires and return the cause.
    pub fn wait(&self) -> CancelCause {
        let mut state = self.inner.lock();
        loop {
            if let Some(cause) = &state.cause {
                return cause.clone();
            }

            match self.inner.deadline {
                None => {
                    state = self
                        .inner
                        .fired
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        drop(state);
                        self.inner.fire(CancelCause::DeadlineExceeded);
                        state = self.inner.lock();
                        continue;
                    }
                    state = self
                        .inner
                        .fired
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_token_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cause().is_none());
    }

    #[test]
    fn test_cancel_records_cause() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.cause(), Some(CancelCause::Cancelled)));
    }

    #[test]
    fn test_first_cause_wins() {
        let token = CancelToken::new();
        assert!(token.cancel_with(CancelCause::Closed));
        assert!(!token.cancel_with(CancelCause::EndOfStream));
        assert!(matches!(token.cause(), Some(CancelCause::Closed)));
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_wait_unblocks_on_cancel() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.wait())
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel_with(CancelCause::Closed);

        let cause = waiter.join().expect("waiter thread");
        assert!(matches!(cause, CancelCause::Closed));
    }

    #[test]
    fn test_deadline_fires_while_waiting() {
        let token = CancelToken::with_timeout(Duration::from_millis(30));
        let started = Instant::now();
        let cause = token.wait();
        assert!(matches!(cause, CancelCause::DeadlineExceeded));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_deadline_observed_without_waiting() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        assert!(matches!(token.cause(), Some(CancelCause::DeadlineExceeded)));
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        let token = CancelToken::with_timeout(Duration::MAX);
        assert!(!token.is_cancelled());
        assert!(token.cause().is_none());
        token.cancel();
        assert!(matches!(token.wait(), CancelCause::Cancelled));
    }

    #[test]
    fn test_explicit_cancel_beats_deadline() {
        let token = CancelToken::with_timeout(Duration::from_secs(60));
        token.cancel();
        assert!(matches!(token.wait(), CancelCause::Cancelled));
    }

    // --- Child tokens ---

    #[test]
    fn test_child_fires_with_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        parent.cancel();
        assert!(matches!(child.cause(), Some(CancelCause::Cancelled)));
    }

    #[test]
    fn test_child_cancel_does_not_affect_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        child.cancel_with(CancelCause::Closed);
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_child_of_fired_parent_starts_fired() {
        let parent = CancelToken::new();
        parent.cancel_with(CancelCause::EndOfStream);
        let child = parent.child();
        assert!(matches!(child.cause(), Some(CancelCause::EndOfStream)));
    }

    #[test]
    fn test_child_inherits_deadline() {
        let parent = CancelToken::with_timeout(Duration::from_millis(20));
        let child = parent.child();
        assert!(matches!(child.wait(), CancelCause::DeadlineExceeded));
    }

    #[test]
    fn test_child_wait_unblocks_on_parent_cancel() {
        let parent = CancelToken::new();
        let child = parent.child();
        let waiter = thread::spawn(move || child.wait());

        thread::sleep(Duration::from_millis(20));
        parent.cancel();

        assert!(matches!(
            waiter.join().expect("waiter thread"),
            CancelCause::Cancelled
        ));
    }

    #[test]
    fn test_source_cause_keeps_error_kind() {
        let token = CancelToken::new();
        token.cancel_with(CancelCause::Source(Arc::new(io::Error::from(
            io::ErrorKind::UnexpectedEof,
        ))));
        match token.cause() {
            Some(CancelCause::Source(err)) => {
                assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected Source cause, got {:?}", other),
        }
    }
}
