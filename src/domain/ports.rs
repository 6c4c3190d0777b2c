use super::order::{Order, OrderStatus};
use super::payment::{PaymentRequest, TransactionResult};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence for orders. The lifecycle reads an order, mutates it and hands
/// the whole record back through `save`.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, order_id: u64) -> Result<Option<Order>>;
    async fn save(&self, order: Order) -> Result<()>;
    async fn find_by_email(&self, email: &str) -> Result<Vec<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;
}

/// Submits one transaction to the processor and interprets its answer.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn execute(&self, request: &PaymentRequest) -> Result<TransactionResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// The shopper-facing side of checkout.
#[async_trait]
pub trait Storefront: Send + Sync {
    async fn empty_cart(&self);
    async fn add_notice(&self, level: NoticeLevel, message: String);
}

#[async_trait]
pub trait Inventory: Send + Sync {
    async fn reduce_stock(&self, order: &Order) -> Result<()>;
}

/// An order moved from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: u64,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Reacts to order status changes published by the order pipeline.
#[async_trait]
pub trait OrderStatusObserver: Send + Sync {
    async fn on_status_changed(&self, change: &StatusChange);
}

pub type SharedOrderStore = Arc<dyn OrderStore>;
pub type SharedGateway = Arc<dyn PaymentGateway>;
pub type SharedStorefront = Arc<dyn Storefront>;
pub type SharedInventory = Arc<dyn Inventory>;
pub type SharedObserver = Arc<dyn OrderStatusObserver>;
