//! Artificial latency applied to every collection operation

use recstore_core::Result;
use std::time::Duration;
use tracing::debug;

use crate::context::Context;

/// Wraps operations in an optional, cancellable delay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyInjector {
    delay: Option<Duration>,
}

impl LatencyInjector {
    /// Injector with the given delay; `None` or zero means no delay
    pub fn new(delay: Option<Duration>) -> Self {
        LatencyInjector {
            delay: delay.filter(|d| !d.is_zero()),
        }
    }

    /// Configured delay
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Run `op` after the configured delay
    ///
    /// If `ctx` is already done, or ends during the delay, `op` never runs and
    /// the context's error is returned.
    pub fn run<T>(&self, ctx: &Context, op: impl FnOnce() -> Result<T>) -> Result<T> {
        ctx.check()?;
        if let Some(delay) = self.delay {
            debug!(delay_ms = delay.as_millis() as u64, "Injecting latency");
            ctx.sleep(delay)?;
        }
        op()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recstore_core::ErrorKind;
    use std::cell::Cell;
    use std::time::Instant;

    #[test]
    fn test_no_delay_runs_immediately() {
        let injector = LatencyInjector::default();
        assert_eq!(injector.run(&Context::background(), || Ok(7)).unwrap(), 7);
        assert_eq!(LatencyInjector::new(Some(Duration::ZERO)).delay(), None);
    }

    #[test]
    fn test_delay_is_applied() {
        let injector = LatencyInjector::new(Some(Duration::from_millis(15)));
        let start = Instant::now();
        injector.run(&Context::background(), || Ok(())).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_canceled_context_skips_op() {
        let ran = Cell::new(false);
        let ctx = Context::background();
        ctx.cancel();

        let err = LatencyInjector::default()
            .run(&ctx, || {
                ran.set(true);
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Canceled);
        assert!(!ran.get());
    }

    #[test]
    fn test_timeout_during_delay_skips_op() {
        let ran = Cell::new(false);
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        let injector = LatencyInjector::new(Some(Duration::from_secs(10)));

        let err = injector
            .run(&ctx, || {
                ran.set(true);
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!ran.get());
    }
}
