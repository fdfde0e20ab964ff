//! Request-scoped batching loader.
//!
//! A [`BatchLoader`] coalesces every `load` issued during one synchronous
//! burst into a single call to its [`BatchFn`]. Keys are de-duplicated
//! before dispatch, so concurrent loads of the same key share one upstream
//! lookup (single-flight). Results are routed back by key, which makes the
//! caller-visible order independent of the order the executor produced them.
//!
//! Loaders do not memoize: a `load` issued after a batch has been dispatched
//! starts a new batch. Cross-request reuse belongs to the response cache.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::oneshot;

/// Per-key result produced by a [`BatchFn`].
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome<V, E> {
    Found(V),
    Failed(E),
}

/// The executor a loader delegates to.
///
/// `load` receives a de-duplicated key set in first-requested order. It may
/// build its map from a response in any order and may omit keys; omitted
/// keys resolve to absent. A failure that affects only some keys should be
/// reported per key with [`KeyOutcome::Failed`] so siblings still resolve.
#[async_trait]
pub trait BatchFn: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;
    type Error: Clone + fmt::Display + fmt::Debug + Send + Sync + 'static;

    async fn load(
        &self,
        keys: &[Self::Key],
    ) -> HashMap<Self::Key, KeyOutcome<Self::Value, Self::Error>>;
}

/// What a caller sees when its key failed inside the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyFailurePolicy {
    /// Resolve the key to absent.
    #[default]
    Absent,
    /// Resolve the key to [`LoadError::Failed`].
    Error,
}

/// Error returned from [`BatchLoader::load`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError<E> {
    #[error("{0}")]
    Failed(E),

    #[error("Batch dispatcher dropped before resolving the key")]
    Dropped,
}

/// Result of one `load` call.
pub type LoadResult<V, E> = Result<Option<V>, LoadError<E>>;

type Waiter<V, E> = oneshot::Sender<LoadResult<V, E>>;

struct PendingBatch<K, V, E> {
    /// Distinct keys in first-requested order.
    keys: Vec<K>,
    waiters: HashMap<K, Vec<Waiter<V, E>>>,
}

impl<K: Clone + Eq + Hash, V, E> PendingBatch<K, V, E> {
    fn new() -> Self {
        Self {
            keys: Vec::new(),
            waiters: HashMap::new(),
        }
    }

    fn enqueue(&mut self, key: K, waiter: Waiter<V, E>) {
        match self.waiters.get_mut(&key) {
            Some(waiters) => waiters.push(waiter),
            None => {
                self.keys.push(key.clone());
                self.waiters.insert(key, vec![waiter]);
            }
        }
    }
}

/// Counters for one loader instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Batches handed to the executor.
    pub batches: u64,
    /// Distinct keys handed to the executor, summed over batches.
    pub keys: u64,
    /// `load` calls made.
    pub loads: u64,
}

struct LoaderInner<F: BatchFn> {
    name: &'static str,
    batch_fn: F,
    policy: KeyFailurePolicy,
    pending: Mutex<Option<PendingBatch<F::Key, F::Value, F::Error>>>,
    batches: AtomicU64,
    keys: AtomicU64,
    loads: AtomicU64,
}

/// Batching, de-duplicating loader over a [`BatchFn`].
///
/// Cloning is cheap and clones share pending batches.
pub struct BatchLoader<F: BatchFn> {
    inner: Arc<LoaderInner<F>>,
}

impl<F: BatchFn> Clone for BatchLoader<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: BatchFn> BatchLoader<F> {
    pub fn new(name: &'static str, batch_fn: F) -> Self {
        Self::with_policy(name, batch_fn, KeyFailurePolicy::default())
    }

    pub fn with_policy(name: &'static str, batch_fn: F, policy: KeyFailurePolicy) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                name,
                batch_fn,
                policy,
                pending: Mutex::new(None),
                batches: AtomicU64::new(0),
                keys: AtomicU64::new(0),
                loads: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn policy(&self) -> KeyFailurePolicy {
        self.inner.policy
    }

    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            batches: self.inner.batches.load(Ordering::Relaxed),
            keys: self.inner.keys.load(Ordering::Relaxed),
            loads: self.inner.loads.load(Ordering::Relaxed),
        }
    }

    /// Queue `key` into the current batch and return a future for its value.
    ///
    /// Registration happens before this returns, so every `load` made before
    /// the caller's next suspension point lands in the same batch. Must be
    /// called from within a current-thread Tokio runtime: on a multi-thread
    /// runtime another worker may dispatch the batch before the burst ends,
    /// splitting it. If the dispatcher is dropped before answering, the
    /// future resolves to [`LoadError::Dropped`].
    pub fn load(
        &self,
        key: F::Key,
    ) -> impl Future<Output = LoadResult<F::Value, F::Error>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.inner.loads.fetch_add(1, Ordering::Relaxed);

        let schedule = {
            let mut pending = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let schedule = pending.is_none();
            pending.get_or_insert_with(PendingBatch::new).enqueue(key, tx);
            schedule
        };

        if schedule {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                // Let the rest of the current burst enqueue first.
                tokio::task::yield_now().await;
                inner.dispatch().await;
            });
        }

        async move { rx.await.unwrap_or(Err(LoadError::Dropped)) }
    }

    /// Load several keys, resolving to one result per requested key in the
    /// same order and multiplicity.
    pub async fn load_many(&self, keys: &[F::Key]) -> Vec<LoadResult<F::Value, F::Error>> {
        let futures: Vec<_> = keys.iter().cloned().map(|key| self.load(key)).collect();
        join_all(futures).await
    }
}

impl<F: BatchFn> LoaderInner<F> {
    async fn dispatch(&self) {
        let batch = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(batch) = batch else {
            return;
        };

        self.batches.fetch_add(1, Ordering::Relaxed);
        self.keys.fetch_add(batch.keys.len() as u64, Ordering::Relaxed);
        tracing::debug!(loader = self.name, keys = batch.keys.len(), "Dispatching batch");

        let mut outcomes = self.batch_fn.load(&batch.keys).await;

        for (key, waiters) in batch.waiters {
            let result = match outcomes.remove(&key) {
                Some(KeyOutcome::Found(value)) => Ok(Some(value)),
                None => Ok(None),
                Some(KeyOutcome::Failed(err)) => match self.policy {
                    KeyFailurePolicy::Absent => {
                        tracing::warn!(
                            loader = self.name,
                            key = ?key,
                            error = %err,
                            "Key failed inside batch, resolving as absent"
                        );
                        Ok(None)
                    }
                    KeyFailurePolicy::Error => Err(LoadError::Failed(err)),
                },
            };

            for waiter in waiters {
                // A dropped receiver means the caller stopped waiting.
                let _ = waiter.send(result.clone());
            }
        }
    }
}
