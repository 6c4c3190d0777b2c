use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type LockMap = HashMap<u64, Arc<tokio::sync::Mutex<()>>>;

/// One async mutex per order, shared by everything that read-modify-writes an
/// order. Cloning shares the same set of locks.
///
/// An entry only lives while some task holds or waits for it.
#[derive(Clone, Default)]
pub struct OrderLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`.
    pub async fn lock(&self, order_id: u64) -> OrderGuard {
        let mutex = {
            // Recover from a poisoned map; the entries themselves stay valid.
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(order_id).or_default().clone()
        };
        OrderGuard {
            order_id,
            locks: self.locks.clone(),
            guard: mutex.lock_owned().await,
        }
    }

    /// Number of orders currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one order until dropped.
pub struct OrderGuard {
    order_id: u64,
    locks: Arc<Mutex<LockMap>>,
    guard: OwnedMutexGuard<()>,
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let ours = OwnedMutexGuard::mutex(&self.guard);
        // The map and this guard are the only owners: nobody is waiting.
        let idle = locks
            .get(&self.order_id)
            .is_some_and(|mutex| Arc::ptr_eq(mutex, ours) && Arc::strong_count(mutex) == 2);
        if idle {
            locks.remove(&self.order_id);
        }
    }
}
