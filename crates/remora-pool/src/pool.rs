use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};

/// Error type returned by a release hook.
pub type ReleaseError = Box<dyn std::error::Error + Send + Sync>;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type ResetHook<T> = Box<dyn Fn(&mut T) + Send + Sync>;
type ReleaseHook<T> = Box<dyn Fn(T) -> Result<(), ReleaseError> + Send + Sync>;

/// Queue plus lifecycle flag, only ever touched under the pool lock.
struct PoolState<T> {
    /// `None` until the first growth.
    queue: Option<VecDeque<T>>,
    disposed: bool,
}

/// Point-in-time counters for a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects currently waiting in the queue.
    pub available: usize,
    /// Objects ever produced by the factory.
    pub manufactured: usize,
    /// Number of growth batches.
    pub growths: usize,
    pub check_outs: u64,
    pub check_ins: u64,
}

impl PoolStats {
    /// Check-outs not yet matched by a check-in.
    pub fn outstanding(&self) -> u64 {
        self.check_outs.saturating_sub(self.check_ins)
    }
}

/// Capacity-bounded, lazily growing pool of reusable objects.
///
/// The pool starts empty. The first [`check_out`](Self::check_out), and every
/// later one that finds the queue drained, manufactures `growth` objects from
/// the factory inside the same write-lock acquisition that dequeues the
/// result, so concurrent callers never observe an empty pool mid-growth.
///
/// Two check-outs arriving on an empty pool are serialized by the lock: the
/// second sees the first's batch. A caller that drains the batch completely
/// before the next one arrives triggers a fresh growth, so under sustained
/// contention the pool may manufacture more than the peak demand.
///
/// Teardown ([`shutdown`](Self::shutdown), also run on drop) drains the queue
/// and hands every object to the release hook. Release failures and panics are
/// logged and suppressed so the remaining objects are still released.
///
/// A factory panic propagates to the caller of `check_out`. Objects
/// manufactured before the panic stay queued and the pool remains usable.
///
/// The pool is `Send` for `T: Send`. Sharing it across threads needs
/// `T: Send + Sync`, as the queue sits behind an `RwLock`.
pub struct ObjectPool<T> {
    config: PoolConfig,
    state: RwLock<PoolState<T>>,
    factory: Factory<T>,
    reset: Option<ResetHook<T>>,
    release: Option<ReleaseHook<T>>,
    manufactured: AtomicUsize,
    growths: AtomicUsize,
    check_outs: AtomicU64,
    check_ins: AtomicU64,
}

impl<T> ObjectPool<T> {
    /// Create a pool that manufactures objects with `factory`.
    ///
    /// Nothing is manufactured until the first check-out.
    pub fn new<F>(config: PoolConfig, factory: F) -> PoolResult<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self::build(config, Box::new(factory)))
    }

    pub(crate) fn build(config: PoolConfig, factory: Factory<T>) -> Self {
        Self {
            config,
            state: RwLock::new(PoolState {
                queue: None,
                disposed: false,
            }),
            factory,
            reset: None,
            release: None,
            manufactured: AtomicUsize::new(0),
            growths: AtomicUsize::new(0),
            check_outs: AtomicU64::new(0),
            check_ins: AtomicU64::new(0),
        }
    }

    /// Install a hook applied to every object as it is checked back in.
    pub fn with_reset<R>(mut self, reset: R) -> Self
    where
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Install a hook that releases objects drained during teardown.
    ///
    /// Without a hook, drained objects are simply dropped.
    pub fn with_release<R>(mut self, release: R) -> Self
    where
        R: Fn(T) -> Result<(), ReleaseError> + Send + Sync + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    /// Take an object from the pool, growing it first if it is empty.
    pub fn check_out(&self) -> PoolResult<T> {
        let mut state = self.write_state();
        if state.disposed {
            return Err(PoolError::Disposed);
        }
        let obj = match state.queue.as_mut().and_then(VecDeque::pop_front) {
            Some(obj) => obj,
            None => self.grow(&mut state),
        };
        drop(state);

        self.check_outs.fetch_add(1, Ordering::Relaxed);
        Ok(obj)
    }

    /// Return an object to the pool.
    pub fn check_in(&self, obj: T) -> PoolResult<()> {
        self.try_check_in(obj).map_err(|(err, _)| err)
    }

    /// Like [`check_in`](Self::check_in) but hands the object back on failure.
    pub(crate) fn try_check_in(&self, mut obj: T) -> Result<(), (PoolError, T)> {
        if let Some(reset) = &self.reset {
            reset(&mut obj);
        }
        let mut state = self.write_state();
        if state.disposed {
            return Err((PoolError::Disposed, obj));
        }
        match state.queue.as_mut() {
            Some(queue) => queue.push_back(obj),
            None => return Err((PoolError::InvalidCheckIn, obj)),
        }
        drop(state);
        self.check_ins.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of objects currently available.
    pub fn len(&self) -> PoolResult<usize> {
        let state = self.read_state();
        if state.disposed {
            return Err(PoolError::Disposed);
        }
        Ok(state.queue.as_ref().map_or(0, VecDeque::len))
    }

    /// Returns `true` if no objects are currently available.
    pub fn is_empty(&self) -> PoolResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// Number of objects manufactured per growth.
    pub fn growth(&self) -> PoolResult<usize> {
        if self.is_disposed() {
            return Err(PoolError::Disposed);
        }
        Ok(self.config.growth)
    }

    /// Initial queue capacity.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    pub fn is_disposed(&self) -> bool {
        self.read_state().disposed
    }

    pub fn stats(&self) -> PoolStats {
        let available = {
            let state = self.read_state();
            state.queue.as_ref().map_or(0, VecDeque::len)
        };
        PoolStats {
            available,
            manufactured: self.manufactured.load(Ordering::Relaxed),
            growths: self.growths.load(Ordering::Relaxed),
            check_outs: self.check_outs.load(Ordering::Relaxed),
            check_ins: self.check_ins.load(Ordering::Relaxed),
        }
    }

    /// Tear the pool down, releasing every pooled object.
    ///
    /// Idempotent. Objects still checked out are not affected; returning them
    /// afterwards fails with [`PoolError::Disposed`].
    pub fn shutdown(&self) {
        let drained: Vec<T> = {
            let mut state = self.write_state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state
                .queue
                .take()
                .map(|queue| queue.into_iter().collect())
                .unwrap_or_default()
        };

        let count = drained.len();
        let failures = drained
            .into_iter()
            .map(|obj| self.release_one(obj))
            .filter(|released| !released)
            .count();
        debug!(released = count, failures, "object pool disposed");
    }

    /// Release a single object, swallowing errors and panics.
    pub(crate) fn release_one(&self, obj: T) -> bool {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match &self.release {
            Some(release) => release(obj),
            None => {
                drop(obj);
                Ok(())
            }
        }));
        match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "failed to release pooled object; ignoring");
                false
            }
            Err(_) => {
                warn!("pooled object panicked during release; ignoring");
                false
            }
        }
    }

    /// Manufacture one growth batch, returning its first object to the caller
    /// and queueing the rest.
    fn grow(&self, state: &mut PoolState<T>) -> T {
        let count = self.config.growth.max(1);
        debug!(count, "object pool creating pooled objects");

        let capacity = self.config.capacity;
        let queue = state
            .queue
            .get_or_insert_with(|| VecDeque::with_capacity(capacity));
        if self.config.reclaim_on_growth {
            queue.shrink_to(capacity);
        }
        queue.reserve(count - 1);

        let first = self.manufacture();
        for _ in 1..count {
            queue.push_back(self.manufacture());
        }
        self.growths.fetch_add(1, Ordering::Relaxed);
        first
    }

    fn manufacture(&self) -> T {
        let obj = (self.factory)();
        self.manufactured.fetch_add(1, Ordering::Relaxed);
        obj
    }

    /// A panicking factory poisons the lock mid-growth. The queue only ever
    /// gains whole objects, so the state behind a poisoned lock is still valid.
    fn read_state(&self) -> RwLockReadGuard<'_, PoolState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, PoolState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("ObjectPool")
            .field("config", &self.config)
            .field("available", &stats.available)
            .field("manufactured", &stats.manufactured)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
