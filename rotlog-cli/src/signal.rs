//! Signal handling for graceful shutdown.
//!
//! `ShutdownFlag` turns SIGINT (Ctrl+C) into cancellation of a
//! `CancelToken`, so a running pipe ends cleanly and its file is closed.

use rotlog_stream::CancelToken;
use tracing::{debug, warn};

/// Cancellation source fed by Ctrl+C.
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    token: CancelToken,
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownFlag {
    /// Create a new shutdown flag and register the SIGINT handler.
    ///
    /// If the handler cannot be registered (e.g. one is already set), the
    /// flag is still usable and can be triggered manually.
    pub fn new() -> Self {
        let flag = Self::manual();
        let token = flag.token.clone();

        if let Err(err) = ctrlc::set_handler(move || {
            debug!("interrupt received, stopping");
            token.cancel();
        }) {
            warn!(%err, "could not install Ctrl+C handler");
        }

        flag
    }

    /// Create a shutdown flag without registering a handler.
    pub fn manual() -> Self {
        Self {
            token: CancelToken::new(),
        }
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn should_stop(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token cancelled on shutdown.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotlog_stream::CancelCause;

    #[test]
    fn test_shutdown_flag_initially_false() {
        let flag = ShutdownFlag::manual();
        assert!(!flag.should_stop());
        assert!(!flag.token().is_cancelled());
    }

    #[test]
    fn test_shutdown_flag_trigger() {
        let flag = ShutdownFlag::manual();
        flag.trigger();
        assert!(flag.should_stop());
        assert!(matches!(flag.token().cause(), Some(CancelCause::Cancelled)));
    }

    #[test]
    fn test_shutdown_flag_clone_shares_state() {
        let flag1 = ShutdownFlag::manual();
        let flag2 = flag1.clone();
        assert!(!flag2.should_stop());
        flag1.trigger();
        assert!(flag2.should_stop());
    }

    #[test]
    fn test_shutdown_flag_new_does_not_panic() {
        // Should not panic even if a handler is already installed
        let first = ShutdownFlag::new();
        let second = ShutdownFlag::new();
        assert!(!first.should_stop());
        assert!(!second.should_stop());
    }
}
