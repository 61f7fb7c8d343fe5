//! Scoped activation of a session.
//!
//! ```
//! use std::sync::Arc;
//! use rift_intercept::{Method, Response, Session};
//!
//! let session = Arc::new(Session::new());
//! {
//!     let guard = session.enter();
//!     session
//!         .register(Method::GET, "http://testme.org/", [Response::text("hi")])
//!         .unwrap();
//!     let _transport = guard.transport();
//!     assert!(session.is_active());
//! }
//! assert!(!session.is_active());
//! assert_eq!(session.entry_count(), 0);
//! ```

use std::sync::Arc;
use tracing::debug;

use crate::registry::Session;
use crate::transport::MockTransport;

/// Keeps a session active for as long as it lives. Dropping the guard (on
/// any exit path, unwinding included) deactivates and resets the session.
#[must_use = "the session is deactivated as soon as the guard is dropped"]
#[derive(Debug)]
pub struct MockGuard {
    session: Arc<Session>,
}

impl MockGuard {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Connection provider answering from this session.
    pub fn transport(&self) -> MockTransport {
        MockTransport::new(Arc::clone(&self.session))
    }
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        self.session.deactivate();
        self.session.reset();
        debug!("Interception scope closed");
    }
}

impl Session {
    /// Activate the session until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> MockGuard {
        self.activate();
        debug!("Interception scope opened");
        MockGuard {
            session: Arc::clone(self),
        }
    }
}

/// Run `f` inside a fresh, active session. The session is reset on return
/// and on panic.
pub fn with_mocking<T>(f: impl FnOnce(&MockGuard) -> T) -> T {
    let session = Arc::new(Session::new());
    let guard = session.enter();
    f(&guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Method;
    use crate::response::Response;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_guard_activates_and_resets() {
        let session = Arc::new(Session::new());
        {
            let _guard = session.enter();
            assert!(session.is_active());
            session
                .register(Method::GET, "http://testme.org/", [Response::new()])
                .unwrap();
            assert_eq!(session.entry_count(), 1);
        }
        assert!(!session.is_active());
        assert_eq!(session.entry_count(), 0);
    }

    #[test]
    fn test_guard_resets_on_panic() {
        let session = Arc::new(Session::new());
        let inner = Arc::clone(&session);
        let result = panic::catch_unwind(AssertUnwindSafe(move || {
            let _guard = inner.enter();
            inner
                .register(Method::GET, "http://testme.org/", [Response::new()])
                .unwrap();
            panic!("test body failed");
        }));
        assert!(result.is_err());
        assert!(!session.is_active());
        assert_eq!(session.entry_count(), 0);
    }

    #[test]
    fn test_with_mocking_returns_value() {
        let count = with_mocking(|guard| {
            let session = guard.session();
            assert!(session.is_active());
            session
                .register(Method::GET, "http://testme.org/", [Response::new()])
                .unwrap();
            session.entry_count()
        });
        assert_eq!(count, 1);
    }
}
