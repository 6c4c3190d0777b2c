use super::locks::OrderLocks;
use crate::domain::order::OrderStatus;
use crate::domain::ports::{SharedObserver, SharedOrderStore, StatusChange};
use crate::error::{PaymentError, Result};
use std::sync::RwLock;
use tracing::debug;

/// Publishes order status changes to subscribed observers.
///
/// The new status is persisted before any observer runs, and observers are
/// notified in subscription order. The status write holds the same per-order
/// lock as the payment lifecycle, so it never overwrites charge state saved
/// concurrently.
pub struct OrderEvents {
    orders: SharedOrderStore,
    locks: OrderLocks,
    observers: RwLock<Vec<SharedObserver>>,
}

impl OrderEvents {
    pub fn new(orders: SharedOrderStore, locks: OrderLocks) -> Self {
        Self {
            orders,
            locks,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: SharedObserver) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// Moves the order to `status` and notifies observers.
    ///
    /// Returns `None` when the order already had that status, in which case
    /// nothing is saved and nobody is notified.
    pub async fn update_status(
        &self,
        order_id: u64,
        status: OrderStatus,
    ) -> Result<Option<StatusChange>> {
        let Some(change) = self.save_status(order_id, status).await? else {
            return Ok(None);
        };

        // Observers take the order lock themselves, so it is released by now.
        // Clone the list so no lock is held across their awaits.
        let observers = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for observer in observers {
            observer.on_status_changed(&change).await;
        }

        Ok(Some(change))
    }

    async fn save_status(&self, order_id: u64, status: OrderStatus) -> Result<Option<StatusChange>> {
        let _guard = self.locks.lock(order_id).await;

        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        if order.status == status {
            return Ok(None);
        }

        let change = StatusChange {
            order_id,
            from: order.status,
            to: status,
        };
        order.status = status;
        order.add_note(format!(
            "Order status changed from {} to {}.",
            change.from, change.to
        ));
        self.orders.save(order).await?;
        debug!(order_id, from = %change.from, to = %change.to, "Order status changed");
        Ok(Some(change))
    }
}
