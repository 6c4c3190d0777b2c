use crate::domain::order::{META_CHARGE_CAPTURED, META_CHARGE_ID, Order, OrderStatus};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Final charge state of one order, as printed by the CLI.
#[derive(Debug, Serialize, PartialEq)]
pub struct OrderReport {
    pub order: u64,
    pub status: OrderStatus,
    pub transaction_id: String,
    pub charge_id: String,
    pub charge_captured: String,
    pub refunded: Decimal,
}

impl From<&Order> for OrderReport {
    fn from(order: &Order) -> Self {
        Self {
            order: order.id,
            status: order.status,
            transaction_id: order.transaction_id.clone().unwrap_or_default(),
            charge_id: order.meta(META_CHARGE_ID).unwrap_or_default().to_string(),
            charge_captured: order
                .meta(META_CHARGE_CAPTURED)
                .unwrap_or_default()
                .to_string(),
            refunded: order.total_refunded,
        }
    }
}

/// Writes order reports as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        for order in orders {
            self.writer.serialize(OrderReport::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
