//! Miscellaneous helpers with no real home elsewhere.
//!
//! - [`uniq`] / [`UniqExt`]: lazy, order-preserving de-duplication
//! - [`RetryPolicy`]: re-run a fallible operation a bounded (or unbounded)
//!   number of times with a constant wait between attempts

use std::cell::Cell;
use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

use backon::{BlockingRetryable, ConstantBuilder};

use crate::error::{Error, Result};

// ============================================================================
// uniq
// ============================================================================

/// Iterator adapter returned by [`uniq`].
#[derive(Debug, Clone)]
pub struct Uniq<I: Iterator> {
    inner: I,
    seen: HashSet<I::Item>,
}

impl<I> Iterator for Uniq<I>
where
    I: Iterator,
    I::Item: Eq + Hash + Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        for item in self.inner.by_ref() {
            if self.seen.insert(item.clone()) {
                return Some(item);
            }
        }
        None
    }
}

/// Yield the items of `iter` with duplicates removed, keeping first-seen order.
///
/// # Examples
///
/// ```
/// use wbutil_core::misc::uniq;
///
/// let v: Vec<_> = uniq([1, 2, 2, 3]).collect();
/// assert_eq!(v, vec![1, 2, 3]);
/// ```
pub fn uniq<I>(iter: I) -> Uniq<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Eq + Hash + Clone,
{
    Uniq {
        inner: iter.into_iter(),
        seen: HashSet::new(),
    }
}

/// Method form of [`uniq`] for any iterator.
pub trait UniqExt: Iterator + Sized {
    /// Drop items already yielded earlier in the iteration.
    fn uniq(self) -> Uniq<Self>
    where
        Self::Item: Eq + Hash + Clone,
    {
        uniq(self)
    }
}

impl<I: Iterator> UniqExt for I {}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Retry settings for a fallible operation.
///
/// `times` bounds the total number of attempts (`None` retries forever),
/// `wait` is slept between attempts, and `default` is returned instead of
/// an error once the attempts are used up.
#[derive(Debug, Clone)]
pub struct RetryPolicy<T> {
    times: Option<u32>,
    wait: Duration,
    default: Option<T>,
}

impl<T> Default for RetryPolicy<T> {
    fn default() -> Self {
        Self {
            times: None,
            wait: Duration::ZERO,
            default: None,
        }
    }
}

impl<T: Clone> RetryPolicy<T> {
    /// A policy allowing at most `times` attempts in total.
    pub fn new(times: u32) -> Self {
        Self {
            times: Some(times),
            ..Self::default()
        }
    }

    /// A policy that keeps retrying until the operation succeeds.
    pub fn forever() -> Self {
        Self::default()
    }

    /// Set the pause between attempts.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Set the value returned when every attempt fails.
    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    /// Maximum number of attempts, if bounded.
    pub fn times(&self) -> Option<u32> {
        self.times
    }

    /// Pause between attempts.
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Run `op`, retrying on any error.
    pub fn run<F, E>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> std::result::Result<T, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.run_when(op, |_| true)
    }

    /// Run `op`, retrying only errors for which `retry_if` returns true.
    ///
    /// Errors rejected by `retry_if` are returned at once as
    /// [`Error::Operation`].
    pub fn run_when<F, E, P>(&self, mut op: F, retry_if: P) -> Result<T>
    where
        F: FnMut() -> std::result::Result<T, E>,
        E: std::error::Error + Send + Sync + 'static,
        P: Fn(&E) -> bool,
    {
        if self.times == Some(0) {
            return self.exhausted(0, None);
        }

        // backon counts retries, not attempts.
        let max_retries = match self.times {
            Some(n) => (n - 1) as usize,
            None => usize::MAX,
        };
        let backoff = ConstantBuilder::default()
            .with_delay(self.wait)
            .with_max_times(max_retries);

        let attempts = Cell::new(0u32);
        let outcome = (|| {
            attempts.set(attempts.get().saturating_add(1));
            op()
        })
        .retry(backoff)
        .sleep(std::thread::sleep)
        .when(|e| retry_if(e))
        .notify(|err, dur| {
            tracing::debug!(attempt = attempts.get(), wait = ?dur, error = %err, "Retrying operation");
        })
        .call();

        match outcome {
            Ok(value) => Ok(value),
            Err(e) if retry_if(&e) => {
                tracing::warn!(attempts = attempts.get(), error = %e, "Retries exhausted");
                self.exhausted(attempts.get(), Some(Box::new(e)))
            }
            Err(e) => Err(Error::operation_with_source(e.to_string(), e)),
        }
    }

    fn exhausted(&self, attempts: u32, source: Option<crate::error::BoxError>) -> Result<T> {
        match &self.default {
            Some(value) => Ok(value.clone()),
            None => Err(Error::RetriesExhausted { attempts, source }),
        }
    }
}
