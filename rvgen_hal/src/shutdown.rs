//! Cancellation signal shared between the runner and the termination handler.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// One-shot shutdown flag with an interruptible wait.
///
/// Cloning yields another handle to the same signal.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    triggered: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

impl ShutdownSignal {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiter.
    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);
        let _guard = self.inner.lock.lock();
        self.inner.cvar.notify_all();
    }

    /// Whether shutdown has been requested.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for `timeout` or until triggered, whichever comes first.
    ///
    /// Returns `true` if the signal is triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock();
        while !self.is_triggered() {
            if self.inner.cvar.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_triggered()
    }
}
