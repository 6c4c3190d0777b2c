use crate::application::lifecycle::CardSubmission;
use crate::domain::order::OrderStatus;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Checkout submitted a card for the order.
    Charge,
    /// The merchant moved the order to a new status.
    Status,
    Refund,
}

/// One row of the events file. Unused columns may be left empty.
#[derive(Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub order: u64,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub card_expiry: Option<String>,
    #[serde(default)]
    pub card_cvc: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "super::optional_decimal")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Something that happened to an order, in file order.
pub enum OrderEvent {
    Charge {
        order_id: u64,
        card: CardSubmission,
    },
    Status {
        order_id: u64,
        status: OrderStatus,
    },
    Refund {
        order_id: u64,
        amount: Decimal,
        reason: String,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> u64 {
        match self {
            OrderEvent::Charge { order_id, .. }
            | OrderEvent::Status { order_id, .. }
            | OrderEvent::Refund { order_id, .. } => *order_id,
        }
    }
}

impl TryFrom<EventRecord> for OrderEvent {
    type Error = PaymentError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let order_id = record.order;
        match record.kind {
            // Missing card fields are left for checkout validation to reject.
            EventType::Charge => Ok(OrderEvent::Charge {
                order_id,
                card: CardSubmission {
                    number: record.card_number.unwrap_or_default(),
                    expiry: record.card_expiry.unwrap_or_default(),
                    cvc: record.card_cvc.unwrap_or_default(),
                },
            }),
            EventType::Status => {
                let status = record.status.ok_or_else(|| {
                    PaymentError::ValidationError(format!(
                        "Status event for order {order_id} has no status"
                    ))
                })?;
                Ok(OrderEvent::Status { order_id, status })
            }
            EventType::Refund => {
                let amount = record.amount.ok_or_else(|| {
                    PaymentError::ValidationError(format!(
                        "Refund event for order {order_id} has no amount"
                    ))
                })?;
                Ok(OrderEvent::Refund {
                    order_id,
                    amount,
                    reason: record.reason.unwrap_or_default(),
                })
            }
        }
    }
}

/// Reads order events from a CSV source.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: super::reader(source),
        }
    }

    /// Lazily deserializes one event per row. A bad row yields an error and
    /// reading continues with the next one.
    pub fn events(self) -> impl Iterator<Item = Result<OrderEvent>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| result.map_err(PaymentError::from).and_then(OrderEvent::try_from))
    }
}
