use crate::domain::order::{
    META_AUTHORIZATION_CODE, META_CC_LAST4, META_CC_TYPE, META_CHARGE_CAPTURED, META_CHARGE_ID,
    Order,
};
use crate::domain::ports::SharedOrderStore;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

/// Orders handled per export or erase page.
pub const PAGE_SIZE: usize = 10;

const ERASED_KEYS: [&str; 5] = [
    META_CHARGE_ID,
    META_CHARGE_CAPTURED,
    META_AUTHORIZATION_CODE,
    META_CC_LAST4,
    META_CC_TYPE,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedOrder {
    pub order_id: u64,
    /// Exported as "USAePay payment id".
    pub payment_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPage {
    pub items: Vec<ExportedOrder>,
    pub done: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErasureReport {
    pub items_removed: bool,
    pub items_retained: bool,
    pub messages: Vec<String>,
    pub done: bool,
}

/// Personal-data export and erasure for orders paid through the gateway.
pub struct PrivacyService {
    orders: SharedOrderStore,
    retention_days: Option<u32>,
}

impl PrivacyService {
    pub fn new(orders: SharedOrderStore, retention_days: Option<u32>) -> Self {
        Self {
            orders,
            retention_days,
        }
    }

    /// One page of gateway orders for `email`, ordered by id. `page` starts at 1.
    async fn gateway_orders(&self, email: &str, page: usize) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .find_by_email(email)
            .await?
            .into_iter()
            .filter(Order::paid_with_gateway)
            .collect();
        orders.sort_by_key(|order| order.id);

        let skip = page.saturating_sub(1) * PAGE_SIZE;
        Ok(orders.into_iter().skip(skip).take(PAGE_SIZE).collect())
    }

    pub async fn export(&self, email: &str, page: usize) -> Result<ExportPage> {
        let orders = self.gateway_orders(email, page).await?;
        let done = orders.len() < PAGE_SIZE;
        let items = orders
            .iter()
            .map(|order| ExportedOrder {
                order_id: order.id,
                payment_id: order.meta(META_CHARGE_ID).unwrap_or_default().to_string(),
            })
            .collect();
        Ok(ExportPage { items, done })
    }

    pub async fn erase(&self, email: &str, page: usize) -> Result<ErasureReport> {
        self.erase_at(email, page, Utc::now()).await
    }

    async fn erase_at(&self, email: &str, page: usize, now: DateTime<Utc>) -> Result<ErasureReport> {
        let orders = self.gateway_orders(email, page).await?;
        let mut report = ErasureReport {
            done: orders.len() < PAGE_SIZE,
            ..ErasureReport::default()
        };

        for mut order in orders {
            if !self.retention_expired(order.created_at, now) {
                report.items_retained = true;
                report.messages.push(format!(
                    "Order ID {} is less than set retention days. Personal data retained. (USAePay)",
                    order.id
                ));
                continue;
            }
            if order.meta(META_CHARGE_ID).is_none() {
                continue;
            }

            for key in ERASED_KEYS {
                order.delete_meta(key);
            }
            info!(order_id = order.id, "Erased gateway personal data");
            self.orders.save(order).await?;

            report.items_removed = true;
            report
                .messages
                .push("USAePay personal data erased.".to_string());
        }

        Ok(report)
    }

    /// Without a configured window nothing ever expires.
    fn retention_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.retention_days {
            Some(days) if days > 0 => now - created_at > Duration::days(i64::from(days)),
            _ => false,
        }
    }
}
