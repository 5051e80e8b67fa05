use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{PoolError, PoolResult};
use crate::pool::ObjectPool;

impl<T> ObjectPool<T> {
    /// Check out an object wrapped in a guard that checks it back in on drop.
    pub fn lease(self: &Arc<Self>) -> PoolResult<Lease<T>> {
        let obj = self.check_out()?;
        Ok(Lease {
            pool: Arc::clone(self),
            obj: Some(obj),
        })
    }
}

/// RAII guard around a checked-out object.
///
/// Dropping the lease returns the object to its pool. If the pool has been
/// disposed in the meantime, the object goes through the pool's release hook
/// instead.
pub struct Lease<T> {
    pool: Arc<ObjectPool<T>>,
    obj: Option<T>,
}

impl<T> Lease<T> {
    /// Take the object out of pool management. It will not be checked in.
    pub fn detach(mut self) -> T {
        self.obj.take().expect("lease holds an object until dropped")
    }

    /// The pool this lease returns to.
    pub fn pool(&self) -> &Arc<ObjectPool<T>> {
        &self.pool
    }
}

impl<T> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.obj.as_ref().expect("lease holds an object until dropped")
    }
}

impl<T> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.obj.as_mut().expect("lease holds an object until dropped")
    }
}

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        let Some(obj) = self.obj.take() else {
            return;
        };
        match self.pool.try_check_in(obj) {
            Ok(()) => {}
            Err((PoolError::Disposed, obj)) => {
                debug!("lease outlived its pool; releasing object");
                self.pool.release_one(obj);
            }
            Err((err, obj)) => {
                warn!(error = %err, "leased object could not be checked in; releasing it");
                self.pool.release_one(obj);
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Lease").field(&self.obj).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pool() -> Arc<ObjectPool<Vec<u8>>> {
        Arc::new(ObjectPool::new(PoolConfig::new(2, 2), || vec![0u8; 8]).unwrap())
    }

    #[test]
    fn lease_returns_on_drop() {
        let pool = pool();
        {
            let mut lease = pool.lease().unwrap();
            lease[0] = 7;
            assert_eq!(pool.len().unwrap(), 1);
        }
        assert_eq!(pool.len().unwrap(), 2);
        assert_eq!(pool.stats().check_ins, 1);
    }

    #[test]
    fn detached_object_is_not_returned() {
        let pool = pool();
        let lease = pool.lease().unwrap();
        let buf = lease.detach();
        assert_eq!(buf.len(), 8);
        assert_eq!(pool.len().unwrap(), 1);
        assert_eq!(pool.stats().outstanding(), 1);
    }

    #[test]
    fn lease_after_shutdown_is_released() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let pool = Arc::new(
            ObjectPool::new(PoolConfig::new(2, 2), || 1u32)
                .unwrap()
                .with_release(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        );

        let lease = pool.lease().unwrap();
        pool.shutdown();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        drop(lease);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rejected_check_in_routes_through_release() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let pool = Arc::new(
            ObjectPool::new(PoolConfig::new(2, 2), || 1u32)
                .unwrap()
                .with_release(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        );

        // The pool has never grown, so the check-in is refused.
        let lease = Lease {
            pool: Arc::clone(&pool),
            obj: Some(9),
        };
        drop(lease);

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(pool.len().unwrap(), 0);
        assert_eq!(pool.stats().check_ins, 0);
    }

    #[test]
    fn lease_on_disposed_pool_fails() {
        let pool = pool();
        pool.shutdown();
        assert_eq!(pool.lease().unwrap_err(), PoolError::Disposed);
    }
}
