use crate::domain::money::SUPPORTED_CURRENCY;
use crate::domain::order::{BillingDetails, Order, OrderStatus};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the orders file.
#[derive(Debug, Deserialize)]
pub struct OrderRecord {
    pub id: u64,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(deserialize_with = "super::decimal")]
    pub total: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        let mut order = Order::new(record.id, record.total);
        if let Some(number) = record.number {
            order.number = number;
        }
        order.currency = record
            .currency
            .unwrap_or_else(|| SUPPORTED_CURRENCY.to_string());
        order.status = record.status.unwrap_or(OrderStatus::Pending);
        order.billing = BillingDetails {
            first_name: record.first_name,
            last_name: record.last_name,
            address_1: record.street,
            city: record.city,
            state: record.state,
            postcode: record.postcode,
            country: record.country,
            email: record.email,
            ..BillingDetails::default()
        };
        order
    }
}

/// Reads orders from a CSV source.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: super::reader(source),
        }
    }

    /// Lazily deserializes one order per row.
    pub fn orders(self) -> impl Iterator<Item = Result<Order>> {
        self.reader
            .into_deserialize::<OrderRecord>()
            .map(|result| result.map(Order::from).map_err(PaymentError::from))
    }
}
