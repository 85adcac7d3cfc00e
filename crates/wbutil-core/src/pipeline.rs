//! Keyed worker pool over a shared queue.
//!
//! A [`Pipeline`] applies one function to every submitted item using a fixed
//! number of workers. Each item gets an [`ItemKey`]; results can be awaited
//! per key with [`Pipeline::get`], or collected in input order with
//! [`Pipeline::map`].
//!
//! The queue exists from construction, so items may be submitted before
//! [`Pipeline::start`]; they wait until the workers launch. A pipeline runs
//! once: it can be started a single time, and stops accepting items after
//! [`Pipeline::shutdown`].
//!
//! # Usage
//!
//! ```rust
//! use wbutil_core::pipeline::Pipeline;
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() -> wbutil_core::Result<()> {
//! let pipeline = Pipeline::new(|x: u64| x * x).with_workers(2);
//! let squares = pipeline.map(1..=4).await?;
//! assert_eq!(squares, vec![1, 4, 9, 16]);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 4;

// ============================================================================
// ItemKey
// ============================================================================

/// Identifier for an item submitted to a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey(String);

impl ItemKey {
    /// A fresh random key (UUID v4).
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ItemKey {
    fn from(index: usize) -> Self {
        Self(index.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Queue plumbing
// ============================================================================

struct Job<T> {
    key: ItemKey,
    item: T,
    done: watch::Sender<bool>,
}

enum JobSender<T> {
    Bounded(mpsc::Sender<Job<T>>),
    Unbounded(mpsc::UnboundedSender<Job<T>>),
}

impl<T> Clone for JobSender<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Bounded(tx) => Self::Bounded(tx.clone()),
            Self::Unbounded(tx) => Self::Unbounded(tx.clone()),
        }
    }
}

impl<T> JobSender<T> {
    async fn send(&self, job: Job<T>) -> Result<()> {
        let sent = match self {
            Self::Bounded(tx) => tx.send(job).await.is_ok(),
            Self::Unbounded(tx) => tx.send(job).is_ok(),
        };
        if sent {
            Ok(())
        } else {
            Err(Error::PipelineStopped)
        }
    }
}

enum JobReceiver<T> {
    Bounded(mpsc::Receiver<Job<T>>),
    Unbounded(mpsc::UnboundedReceiver<Job<T>>),
}

impl<T> JobReceiver<T> {
    async fn recv(&mut self) -> Option<Job<T>> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }
}

fn channel<T>(capacity: usize) -> (JobSender<T>, JobReceiver<T>) {
    if capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (JobSender::Unbounded(tx), JobReceiver::Unbounded(rx))
    } else {
        let (tx, rx) = mpsc::channel(capacity);
        (JobSender::Bounded(tx), JobReceiver::Bounded(rx))
    }
}

// ============================================================================
// Pipeline
// ============================================================================

type Func<T, R> = Arc<dyn Fn(T) -> R + Send + Sync>;
type Results<R> = Arc<Mutex<HashMap<ItemKey, R>>>;

struct State<T> {
    started: bool,
    stopped: bool,
    sender: Option<JobSender<T>>,
    receiver: Option<JobReceiver<T>>,
    handles: Vec<JoinHandle<()>>,
    events: HashMap<ItemKey, watch::Receiver<bool>>,
}

/// Applies a function to submitted items on a pool of workers.
pub struct Pipeline<T, R> {
    func: Func<T, R>,
    workers: usize,
    capacity: usize,
    results: Results<R>,
    state: Mutex<State<T>>,
}

fn lock<X>(m: &Mutex<X>) -> MutexGuard<'_, X> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T, R> Pipeline<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Create a pipeline for `func` with [`DEFAULT_WORKERS`] workers and an
    /// unbounded queue.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let (tx, rx) = channel(0);
        Self {
            func: Arc::new(func),
            workers: DEFAULT_WORKERS,
            capacity: 0,
            results: Arc::new(Mutex::new(HashMap::new())),
            state: Mutex::new(State {
                started: false,
                stopped: false,
                sender: Some(tx),
                receiver: Some(rx),
                handles: Vec::new(),
                events: HashMap::new(),
            }),
        }
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Bound the queue to `capacity` pending items (0 means unbounded).
    ///
    /// With a bounded queue, [`put`](Self::put) waits for room, so filling
    /// it before [`start`](Self::start) blocks the caller. Replaces the
    /// queue: items already submitted are dropped.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (tx, rx) = channel(capacity);
        state.sender = Some(tx);
        state.receiver = Some(rx);
        state.events.clear();
        self
    }

    /// The function applied to each item.
    pub fn func(&self) -> &(dyn Fn(T) -> R + Send + Sync) {
        &*self.func
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        lock(&self.state).started
    }

    /// Whether [`shutdown`](Self::shutdown) has completed.
    pub fn is_stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    /// Launch the workers. Must be called from within a Tokio runtime.
    ///
    /// Fails with [`Error::PipelineReused`] if the pipeline was already started.
    pub fn start(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::validation_field("workers", "must be at least 1"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::operation_with_source("pipeline needs a Tokio runtime", e))?;

        let mut state = lock(&self.state);
        if state.started {
            return Err(Error::PipelineReused);
        }
        let rx = state.receiver.take().ok_or(Error::PipelineStopped)?;
        state.started = true;

        let receiver = Arc::new(tokio::sync::Mutex::new(rx));
        for id in 0..self.workers {
            let handle = runtime.spawn(worker(
                id,
                Arc::clone(&receiver),
                Arc::clone(&self.func),
                Arc::clone(&self.results),
            ));
            state.handles.push(handle);
        }

        tracing::debug!(workers = self.workers, capacity = self.capacity, "Pipeline started");
        Ok(())
    }

    /// Submit an item, returning its key.
    ///
    /// Items submitted before [`start`](Self::start) are queued. A random key is generated when `key` is `None`. Submitting a key that
    /// is already in use replaces the earlier entry.
    pub async fn put(&self, item: T, key: Option<ItemKey>) -> Result<ItemKey> {
        let key = key.unwrap_or_else(ItemKey::random);
        let (done_tx, done_rx) = watch::channel(false);

        let sender = {
            let mut state = lock(&self.state);
            if state.stopped {
                return Err(Error::PipelineStopped);
            }
            let sender = state.sender.clone().ok_or(Error::PipelineStopped)?;
            state.events.insert(key.clone(), done_rx);
            sender
        };

        sender
            .send(Job {
                key: key.clone(),
                item,
                done: done_tx,
            })
            .await?;
        Ok(key)
    }

    /// Wait for the result of the item submitted under `key`.
    ///
    /// Waits indefinitely when `timeout` is `None`.
    pub async fn get(&self, key: &ItemKey, timeout: Option<Duration>) -> Result<R>
    where
        R: Clone,
    {
        self.wait(key, timeout).await?;
        lock(&self.results)
            .get(key)
            .cloned()
            .ok_or_else(|| Error::operation(format!("no result produced for item {key}")))
    }

    /// Wait for the result under `key` and remove it from the pipeline.
    ///
    /// The key is forgotten: later lookups fail with [`Error::UnknownKey`].
    pub async fn take(&self, key: &ItemKey, timeout: Option<Duration>) -> Result<R> {
        self.wait(key, timeout).await?;
        lock(&self.state).events.remove(key);
        lock(&self.results)
            .remove(key)
            .ok_or_else(|| Error::operation(format!("no result produced for item {key}")))
    }

    async fn wait(&self, key: &ItemKey, timeout: Option<Duration>) -> Result<()> {
        let mut done = lock(&self.state)
            .events
            .get(key)
            .cloned()
            .ok_or_else(|| Error::UnknownKey {
                key: key.to_string(),
            })?;

        let finished = done.wait_for(|finished| *finished);
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, finished)
                .await
                .map_err(|_| Error::Timeout {
                    millis: limit.as_millis() as u64,
                })?,
            None => finished.await,
        };
        outcome
            .map(|_| ())
            .map_err(|_| Error::operation(format!("item {key} was dropped before completion")))
    }

    /// Apply the function to every item and return the results in input order.
    ///
    /// Starts the pipeline if needed and shuts it down afterwards.
    pub async fn map<I>(&self, items: I) -> Result<Vec<R>>
    where
        I: IntoIterator<Item = T>,
    {
        if !self.is_started() {
            self.start()?;
        }
        let mut keys = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            keys.push(self.put(item, Some(ItemKey::from(i))).await?);
        }
        self.shutdown().await?;

        let mut results = Vec::with_capacity(keys.len());
        for key in &keys {
            results.push(self.take(key, None).await?);
        }
        Ok(results)
    }

    /// Apply the function to every item, discarding the results.
    ///
    /// Starts the pipeline if needed and shuts it down afterwards.
    pub async fn apply<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        if !self.is_started() {
            self.start()?;
        }
        for item in items {
            self.put(item, None).await?;
        }
        self.shutdown().await?;
        lock(&self.results).clear();
        Ok(())
    }

    /// Stop accepting items, let workers drain the queue, and join them.
    ///
    /// Items queued on a pipeline that was never started are dropped.
    pub async fn shutdown(&self) -> Result<()> {
        let handles = {
            let mut state = lock(&self.state);
            state.sender = None;
            state.receiver = None;
            std::mem::take(&mut state.handles)
        };

        let mut failures = 0usize;
        for handle in handles {
            if let Err(e) = handle.await {
                failures += 1;
                tracing::error!(error = %e, "Pipeline worker failed");
            }
        }
        lock(&self.state).stopped = true;

        tracing::debug!(
            results = lock(&self.results).len(),
            failures,
            "Pipeline stopped"
        );
        if failures > 0 {
            return Err(Error::operation(format!("{failures} pipeline workers failed")));
        }
        Ok(())
    }
}

impl<T, R> fmt::Debug for Pipeline<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Pipeline")
            .field("workers", &self.workers)
            .field("capacity", &self.capacity)
            .field("started", &state.started)
            .field("stopped", &state.stopped)
            .finish()
    }
}

async fn worker<T, R>(
    id: usize,
    receiver: Arc<tokio::sync::Mutex<JobReceiver<T>>>,
    func: Func<T, R>,
    results: Results<R>,
) where
    T: Send + 'static,
    R: Send + 'static,
{
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(Job { key, item, done }) = job else {
            break;
        };

        let func = Arc::clone(&func);
        match tokio::task::spawn_blocking(move || func(item)).await {
            Ok(result) => {
                lock(&results).insert(key, result);
            }
            Err(e) => {
                tracing::error!(worker = id, key = %key, error = %e, "Pipeline function failed");
            }
        }
        done.send_replace(true);
    }
    tracing::trace!(worker = id, "Pipeline worker exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_map_preserves_order() {
        let pipeline = Pipeline::new(|x: u32| x + 1);
        let out = pipeline.map(vec![5, 1, 9, 3]).await.unwrap();
        assert_eq!(out, vec![6, 2, 10, 4]);
        assert!(pipeline.is_stopped());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_map_empty() {
        let pipeline = Pipeline::new(|x: u32| x);
        let out = pipeline.map(Vec::new()).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_map_with_slow_items_keeps_order() {
        let pipeline = Pipeline::new(|ms: u64| {
            std::thread::sleep(Duration::from_millis(ms));
            ms
        })
        .with_workers(3);
        let out = pipeline.map(vec![30, 0, 10]).await.unwrap();
        assert_eq!(out, vec![30, 0, 10]);
    }

    #[tokio::test]
    async fn test_put_and_get_by_key() {
        let pipeline = Pipeline::new(|s: String| s.to_uppercase());
        pipeline.start().unwrap();

        let key = pipeline
            .put("hello".to_string(), Some(ItemKey::from("greeting")))
            .await
            .unwrap();
        assert_eq!(key.as_str(), "greeting");
        let value = pipeline.get(&key, Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(value, "HELLO");

        // Results stay available for repeated reads.
        let again = pipeline.get(&key, None).await.unwrap();
        assert_eq!(again, "HELLO");
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_put_generates_random_keys() {
        let pipeline = Pipeline::new(|x: i32| x);
        pipeline.start().unwrap();
        let a = pipeline.put(1, None).await.unwrap();
        let b = pipeline.put(2, None).await.unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let pipeline = Pipeline::new(|x: i32| x);
        pipeline.start().unwrap();
        assert!(matches!(pipeline.start(), Err(Error::PipelineReused)));
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_map_after_shutdown_fails() {
        let pipeline = Pipeline::new(|x: i32| x);
        pipeline.map(vec![1]).await.unwrap();
        assert!(matches!(
            pipeline.map(vec![2]).await,
            Err(Error::PipelineStopped)
        ));
    }

    #[tokio::test]
    async fn test_put_after_shutdown_fails() {
        let pipeline = Pipeline::new(|x: i32| x);
        pipeline.start().unwrap();
        pipeline.shutdown().await.unwrap();
        assert!(matches!(
            pipeline.put(1, None).await,
            Err(Error::PipelineStopped)
        ));
    }

    #[tokio::test]
    async fn test_put_before_start_is_queued() {
        let pipeline = Pipeline::new(|x: i32| x * 10);
        let key = pipeline.put(4, Some(ItemKey::from("early"))).await.unwrap();
        assert!(!pipeline.is_started());
        assert!(!pipeline.is_stopped());

        pipeline.start().unwrap();
        let value = pipeline.get(&key, Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(value, 40);
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_map_drains_items_put_before_start() {
        let pipeline = Pipeline::new(|x: i32| x + 1).with_workers(2);
        let early = pipeline.put(100, None).await.unwrap();
        let out = pipeline.map(vec![1, 2]).await.unwrap();
        assert_eq!(out, vec![2, 3]);
        assert_eq!(pipeline.get(&early, None).await.unwrap(), 101);
    }

    #[tokio::test]
    async fn test_start_after_shutdown_fails() {
        let pipeline = Pipeline::new(|x: i32| x);
        pipeline.shutdown().await.unwrap();
        assert!(matches!(pipeline.start(), Err(Error::PipelineStopped)));
    }

    #[tokio::test]
    async fn test_take_forgets_key() {
        let pipeline = Pipeline::new(|x: i32| x);
        pipeline.start().unwrap();
        let key = pipeline.put(7, None).await.unwrap();
        assert_eq!(pipeline.take(&key, None).await.unwrap(), 7);

        let err = pipeline.get(&key, None).await.unwrap_err();
        assert!(matches!(err, Error::UnknownKey { .. }));
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_unknown_key() {
        let pipeline = Pipeline::new(|x: i32| x);
        pipeline.start().unwrap();
        let err = pipeline.get(&ItemKey::from("nope"), None).await.unwrap_err();
        assert!(matches!(err, Error::UnknownKey { .. }));
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_get_times_out() {
        let pipeline = Pipeline::new(|x: u64| {
            std::thread::sleep(Duration::from_millis(200));
            x
        });
        pipeline.start().unwrap();
        let key = pipeline.put(1, None).await.unwrap();
        let err = pipeline
            .get(&key, Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { millis: 10 }));
        pipeline.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_apply_runs_every_item() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let pipeline = Pipeline::new(move |n: usize| {
            c.fetch_add(n, Ordering::SeqCst);
        });
        pipeline.apply(1..=10).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 55);
    }

    #[tokio::test]
    async fn test_bounded_queue() {
        let pipeline = Pipeline::new(|x: i32| x * 2)
            .with_workers(1)
            .with_capacity(1);
        let out = pipeline.map(0..5).await.unwrap();
        assert_eq!(out, vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let pipeline = Pipeline::new(|x: i32| x).with_workers(0);
        assert!(matches!(
            pipeline.start(),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let pipeline = Pipeline::new(|x: i32| x);
        assert!(matches!(pipeline.start(), Err(Error::Operation { .. })));
    }

    #[tokio::test]
    async fn test_func_is_inspectable() {
        let pipeline = Pipeline::new(|x: i32| x - 1);
        assert_eq!((pipeline.func())(10), 9);
        assert_eq!(pipeline.workers(), DEFAULT_WORKERS);
    }

    #[test]
    fn test_item_key_conversions() {
        assert_eq!(ItemKey::from(3usize).as_str(), "3");
        assert_eq!(ItemKey::from("k").to_string(), "k");
        assert_eq!(ItemKey::from("k".to_string()), ItemKey::from("k"));
    }
}
