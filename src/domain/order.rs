use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Payment method id orders carry when they were paid through this gateway.
pub const GATEWAY_ID: &str = "usaepay";

/// Processor reference of the original charge.
pub const META_CHARGE_ID: &str = "_usaepay_charge_id";
/// `yes` once funds were captured, `no` while only authorized.
pub const META_CHARGE_CAPTURED: &str = "_usaepay_charge_captured";
pub const META_AUTHORIZATION_CODE: &str = "_usaepay_authorization_code";
pub const META_CC_LAST4: &str = "_usaepay_cc_last4";
pub const META_CC_TYPE: &str = "_usaepay_cc_type";
/// Reference of the transaction that actually moved funds.
pub const META_PAYMENT_ID: &str = "USAePay Payment ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    OnHold,
    Processing,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}

impl BillingDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
}

/// An order as held by the order store.
///
/// The payment lifecycle reads it and asks the store to persist mutations; it
/// never owns the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    /// Customer-facing order number, sent to the processor as the invoice.
    pub number: String,
    pub total: Decimal,
    pub currency: String,
    pub billing: BillingDetails,
    pub status: OrderStatus,
    pub payment_method: String,
    pub metadata: BTreeMap<String, String>,
    pub transaction_id: Option<String>,
    pub total_refunded: Decimal,
    pub line_items: Vec<LineItem>,
    pub notes: Vec<String>,
    pub customer_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: u64, total: Decimal) -> Self {
        Self {
            id,
            number: id.to_string(),
            total,
            currency: "USD".to_string(),
            billing: BillingDetails::default(),
            status: OrderStatus::Pending,
            payment_method: String::new(),
            metadata: BTreeMap::new(),
            transaction_id: None,
            total_refunded: Decimal::ZERO,
            line_items: Vec::new(),
            notes: Vec::new(),
            customer_ip: None,
            created_at: Utc::now(),
        }
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn update_meta(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn delete_meta(&mut self, key: &str) -> Option<String> {
        self.metadata.remove(key)
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn has_status(&self, statuses: &[OrderStatus]) -> bool {
        statuses.contains(&self.status)
    }

    pub fn paid_with_gateway(&self) -> bool {
        self.payment_method == GATEWAY_ID
    }

    /// Marks the order paid: records the transaction and moves it on to fulfilment.
    pub fn payment_complete(&mut self, transaction_id: &str) {
        self.transaction_id = Some(transaction_id.to_string());
        self.status = OrderStatus::Processing;
    }

    /// Amount still held by the processor for this order.
    pub fn capturable_total(&self) -> Decimal {
        if self.total_refunded > Decimal::ZERO {
            self.total - self.total_refunded
        } else {
            self.total
        }
    }

    /// `Item x qty` pairs joined for the charge description.
    pub fn line_items_summary(&self) -> String {
        self.line_items
            .iter()
            .map(|item| format!("{} x {}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn charge_state(&self) -> ChargeState {
        ChargeState::of(self)
    }
}

/// Charge state derived from order metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeState {
    /// Nothing to capture or void: never charged, or the authorization was voided.
    NoCharge,
    /// Funds held but not transferred; must be captured or voided exactly once.
    Authorized { charge_id: String },
    Captured { charge_id: String },
}

impl ChargeState {
    pub fn of(order: &Order) -> Self {
        let Some(charge_id) = order.meta(META_CHARGE_ID) else {
            return ChargeState::NoCharge;
        };
        let charge_id = charge_id.to_string();
        match order.meta(META_CHARGE_CAPTURED) {
            Some("no") => ChargeState::Authorized { charge_id },
            // Only an explicit `no` marks an outstanding authorization.
            _ => ChargeState::Captured { charge_id },
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, ChargeState::Authorized { .. })
    }
}
