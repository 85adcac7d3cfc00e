//! Shared helpers for wbutil-core integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// An operation that fails a fixed number of times before succeeding.
#[derive(Clone)]
pub struct Flaky {
    failures_left: Arc<AtomicU32>,
    calls: Arc<AtomicU32>,
}

impl Flaky {
    /// Fail `failures` times, then succeed forever.
    pub fn new(failures: u32) -> Self {
        Self {
            failures_left: Arc::new(AtomicU32::new(failures)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Run once, returning `value` on success.
    pub fn call<T>(&self, value: T) -> std::io::Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(std::io::Error::other("transient failure"));
        }
        Ok(value)
    }

    /// Total calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}
