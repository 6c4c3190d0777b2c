use crate::domain::order::Order;
use crate::domain::ports::{Inventory, NoticeLevel, OrderStore, Storefront};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for orders.
///
/// Uses `Arc<RwLock<HashMap<u64, Order>>>` to allow shared concurrent access.
/// Used by the CLI when no database path is given, and by tests.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<u64, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, order_id: u64) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn save(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|order| order.billing.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        matching.sort_by_key(|order| order.id);
        Ok(matching)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|order| order.id);
        Ok(all)
    }
}

/// Records what checkout would show the shopper.
#[derive(Default, Clone)]
pub struct InMemoryStorefront {
    notices: Arc<RwLock<Vec<(NoticeLevel, String)>>>,
    carts_emptied: Arc<RwLock<usize>>,
}

impl InMemoryStorefront {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.read().await.clone()
    }

    /// Removes and returns the pending notices.
    pub async fn take_notices(&self) -> Vec<(NoticeLevel, String)> {
        std::mem::take(&mut *self.notices.write().await)
    }

    pub async fn carts_emptied(&self) -> usize {
        *self.carts_emptied.read().await
    }
}

#[async_trait]
impl Storefront for InMemoryStorefront {
    async fn empty_cart(&self) {
        *self.carts_emptied.write().await += 1;
    }

    async fn add_notice(&self, level: NoticeLevel, message: String) {
        self.notices.write().await.push((level, message));
    }
}

/// Tracks which orders had their stock reduced.
#[derive(Default, Clone)]
pub struct InMemoryInventory {
    reduced: Arc<RwLock<Vec<u64>>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reduced_orders(&self) -> Vec<u64> {
        self.reduced.read().await.clone()
    }
}

#[async_trait]
impl Inventory for InMemoryInventory {
    async fn reduce_stock(&self, order: &Order) -> Result<()> {
        self.reduced.write().await.push(order.id);
        Ok(())
    }
}
