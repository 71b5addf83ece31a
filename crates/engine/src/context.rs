//! Ambient cancellation and deadline context
//!
//! Every public collection operation takes a `&Context`. A context can be
//! canceled explicitly or expire at a deadline; either ends the only
//! interruptible wait in the engine, the injected latency.
//!
//! Derived contexts (`with_timeout`, `with_deadline`) are canceled together
//! with their parent and keep the earlier of the two deadlines. Clones share
//! the same cancellation state.

use parking_lot::{Condvar, Mutex};
use recstore_core::{Error, Result};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Cancellation and deadline carrier passed to every operation
#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    deadline: Option<Instant>,
    state: Mutex<CancelState>,
    signal: Condvar,
}

#[derive(Debug, Default)]
struct CancelState {
    canceled: bool,
    children: Vec<Weak<ContextInner>>,
}

impl Context {
    /// A context that is never canceled and has no deadline
    pub fn background() -> Self {
        Self::with_parts(None, false)
    }

    fn with_parts(deadline: Option<Instant>, canceled: bool) -> Self {
        Context {
            inner: Arc::new(ContextInner {
                deadline,
                state: Mutex::new(CancelState {
                    canceled,
                    children: Vec::new(),
                }),
                signal: Condvar::new(),
            }),
        }
    }

    /// Derive a context that expires `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`
    ///
    /// The child keeps the parent's deadline if that one is earlier.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };

        let mut state = self.inner.state.lock();
        let child = Self::with_parts(Some(deadline), state.canceled);
        if !state.canceled {
            state.children.retain(|c| c.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Cancel this context and every context derived from it
    pub fn cancel(&self) {
        Self::cancel_inner(&self.inner);
    }

    fn cancel_inner(inner: &ContextInner) {
        let children = {
            let mut state = inner.state.lock();
            if state.canceled {
                return;
            }
            state.canceled = true;
            inner.signal.notify_all();
            std::mem::take(&mut state.children)
        };
        for child in children.iter().filter_map(Weak::upgrade) {
            Self::cancel_inner(&child);
        }
    }

    /// True once `cancel` has been called on this context or an ancestor
    pub fn is_canceled(&self) -> bool {
        self.inner.state.lock().canceled
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// `Canceled` or `Timeout` if the context is done, `Ok` otherwise
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            return Err(Error::Canceled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::Timeout),
            _ => Ok(()),
        }
    }

    /// Block for `duration`, returning early with an error if the context
    /// is canceled or its deadline passes first
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let wake_at = Instant::now() + duration;
        let until = match self.inner.deadline {
            Some(deadline) if deadline < wake_at => deadline,
            _ => wake_at,
        };

        {
            let mut state = self.inner.state.lock();
            while !state.canceled && Instant::now() < until {
                self.inner.signal.wait_until(&mut state, until);
            }
        }

        self.check()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recstore_core::ErrorKind;
    use std::thread;

    #[test]
    fn test_background_never_done() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
        assert!(ctx.sleep(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_cancel() {
        let ctx = Context::background();
        ctx.cancel();
        assert!(ctx.is_canceled());
        assert_eq!(ctx.check().unwrap_err().kind(), ErrorKind::Canceled);
    }

    #[test]
    fn test_expired_deadline_is_timeout() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        assert_eq!(ctx.check().unwrap_err().kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_child_keeps_earlier_deadline() {
        let parent = Context::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn test_parent_cancel_reaches_child() {
        let parent = Context::background();
        let child = parent.with_timeout(Duration::from_secs(60));
        let grandchild = child.with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert!(child.is_canceled());
        assert!(grandchild.is_canceled());
    }

    #[test]
    fn test_child_of_canceled_starts_canceled() {
        let parent = Context::background();
        parent.cancel();
        let child = parent.with_timeout(Duration::from_secs(1));
        assert!(child.is_canceled());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = Context::background();
        let child = parent.with_timeout(Duration::from_secs(60));
        child.cancel();
        assert!(!parent.is_canceled());
    }

    #[test]
    fn test_sleep_stops_at_deadline() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let start = Instant::now();
        let err = ctx.sleep(Duration::from_secs(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_sleep_wakes_on_cancel() {
        let ctx = Context::background();
        let remote = ctx.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        let err = ctx.sleep(Duration::from_secs(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Canceled);
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
