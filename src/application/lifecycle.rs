use super::locks::OrderLocks;
use crate::config::GatewayConfig;
use crate::domain::card::{CardDetails, CardNetwork};
use crate::domain::money::Amount;
use crate::domain::order::{
    ChargeState, GATEWAY_ID, META_AUTHORIZATION_CODE, META_CC_LAST4, META_CC_TYPE,
    META_CHARGE_CAPTURED, META_CHARGE_ID, META_PAYMENT_ID, Order, OrderStatus,
};
use crate::domain::payment::{PaymentCommand, PaymentRequest, TransactionResult, Verification};
use crate::domain::ports::{
    NoticeLevel, OrderStatusObserver, SharedGateway, SharedInventory, SharedOrderStore,
    SharedStorefront, StatusChange,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Card fields exactly as checkout submitted them.
#[derive(Clone, Default)]
pub struct CardSubmission {
    pub number: String,
    /// `MM / YY` or `MM / YYYY`.
    pub expiry: String,
    pub cvc: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeReceipt {
    pub order_id: u64,
    pub command: PaymentCommand,
    pub refnum: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundReceipt {
    pub order_id: u64,
    pub amount: Amount,
    pub refnum: String,
}

/// Result of a capture or void triggered by a status change.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// No outstanding authorization; nothing was sent.
    Skipped,
    Completed { refnum: String },
    /// The processor refused or could not be reached. Recorded as an order note.
    Failed { message: String },
}

struct ApprovedCharge {
    command: PaymentCommand,
    card: CardDetails,
    network: CardNetwork,
    result: TransactionResult,
}

/// Drives an order's charge through authorize, capture, void and refund.
///
/// Constructed once at startup with its collaborators. Every transition issues at
/// most one processor call and persists the order once.
pub struct PaymentLifecycle {
    config: Arc<GatewayConfig>,
    gateway: SharedGateway,
    orders: SharedOrderStore,
    storefront: SharedStorefront,
    inventory: SharedInventory,
    locks: OrderLocks,
}

impl PaymentLifecycle {
    pub fn new(
        config: Arc<GatewayConfig>,
        gateway: SharedGateway,
        orders: SharedOrderStore,
        storefront: SharedStorefront,
        inventory: SharedInventory,
    ) -> Self {
        Self {
            config,
            gateway,
            orders,
            storefront,
            inventory,
            locks: OrderLocks::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The per-order locks guarding charge state. Anything else that saves
    /// orders must take the same lock.
    pub fn order_locks(&self) -> OrderLocks {
        self.locks.clone()
    }

    fn log(&self, message: &str) {
        if self.config.logging {
            info!(target: "usaepay", "{message}");
        }
    }

    async fn load(&self, order_id: u64) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))
    }

    /// Charges the card submitted at checkout for the order total.
    ///
    /// Authorizes only or captures immediately depending on the merchant setting.
    /// On failure the shopper gets a notice, the order is marked failed and the
    /// error is returned; no charge metadata is written.
    pub async fn process_payment(
        &self,
        order_id: u64,
        submission: &CardSubmission,
    ) -> Result<ChargeReceipt> {
        let _guard = self.locks.lock(order_id).await;

        let mut order = self.load(order_id).await?;
        self.config.ensure_available(&order.currency)?;
        self.log(&format!(
            "Info: Begin processing payment for order {order_id} for the amount of {}",
            order.total
        ));

        match self.submit_charge(&order, submission).await {
            Ok(charge) => self.record_charge(order, charge).await,
            Err(err) => {
                self.record_checkout_failure(&mut order, &err).await?;
                Err(err)
            }
        }
    }

    async fn submit_charge(
        &self,
        order: &Order,
        submission: &CardSubmission,
    ) -> Result<ApprovedCharge> {
        let card =
            CardDetails::from_checkout(&submission.number, &submission.expiry, &submission.cvc)?;

        let detected = card.network();
        let Some(network) = detected.filter(|network| self.config.accepts(*network)) else {
            let label = detected.map_or("Unknown", |network| network.label());
            self.log(&format!(
                "Card type being used is not one of supported types in plugin settings: {label}"
            ));
            return Err(PaymentError::CardTypeNotAccepted {
                card: label.to_string(),
            });
        };

        let command = if self.config.capture {
            PaymentCommand::Sale
        } else {
            PaymentCommand::AuthOnly
        };
        let request = PaymentRequest::charge(
            command,
            order,
            Amount::new(order.total)?,
            &card,
            self.description(order),
            self.config.customer_receipt,
        );

        let result = self.gateway.execute(&request).await?;
        Ok(ApprovedCharge {
            command,
            card,
            network,
            result,
        })
    }

    fn description(&self, order: &Order) -> String {
        let mut description = format!(
            "{} - Order {}",
            self.config.statement_descriptor, order.number
        )
        .trim()
        .to_string();
        if self.config.line_items && !order.line_items.is_empty() {
            description.push_str(&format!(" ({})", order.line_items_summary()));
        }
        description
    }

    async fn record_charge(&self, mut order: Order, charge: ApprovedCharge) -> Result<ChargeReceipt> {
        let ApprovedCharge {
            command,
            card,
            network,
            result,
        } = charge;
        let refnum = result.refnum.clone();

        order.payment_method = GATEWAY_ID.to_string();
        order.update_meta(META_CHARGE_ID, &refnum);
        order.update_meta(
            META_AUTHORIZATION_CODE,
            result.authcode.clone().unwrap_or_default(),
        );
        order.update_meta(META_CC_LAST4, card.last4());
        order.update_meta(META_CC_TYPE, network.label());
        order.transaction_id = Some(refnum.clone());

        // The charge already went through: a stock failure must not lose it.
        if order.has_status(&[OrderStatus::Pending, OrderStatus::Failed]) {
            if let Err(err) = self.inventory.reduce_stock(&order).await {
                warn!(order_id = order.id, error = %err, "Stock reduction failed after charge");
                order.add_note(format!("Unable to reduce stock levels: {err}"));
            }
        }

        let message = match command {
            PaymentCommand::Sale => {
                order.update_meta(META_CHARGE_CAPTURED, "yes");
                order.update_meta(META_PAYMENT_ID, &refnum);
                order.payment_complete(&refnum);
                with_verification(
                    format!("USAePay charge complete (Charge ID: {refnum})"),
                    &result.verification,
                )
            }
            _ => {
                order.update_meta(META_CHARGE_CAPTURED, "no");
                order.status = OrderStatus::OnHold;
                with_verification(
                    format!(
                        "USAePay charge authorized (Charge ID: {refnum}). Process order to take payment, \
                         or cancel to remove the pre-authorization."
                    ),
                    &result.verification,
                )
            }
        };
        order.add_note(&message);
        self.log(&format!("Success: {message}"));

        let receipt = ChargeReceipt {
            order_id: order.id,
            command,
            refnum,
            status: order.status,
        };
        self.orders.save(order).await?;
        self.storefront.empty_cart().await;
        Ok(receipt)
    }

    async fn record_checkout_failure(&self, order: &mut Order, err: &PaymentError) -> Result<()> {
        let message = format!("Gateway Error: {err}");
        self.storefront
            .add_notice(NoticeLevel::Error, customer_notice(err))
            .await;
        self.log(&message);

        if let PaymentError::TransportError(_) = err {
            warn!(order_id = order.id, error = %err, "Gateway unreachable during checkout");
            order.add_note(&message);
        }

        if let Some(failure) = err.gateway_failure() {
            order.add_note(with_verification(
                format!("USAePay failure reason: {}", failure.message),
                &failure.verification(),
            ));
        }
        order.status = OrderStatus::Failed;
        self.orders.save(order.clone()).await
    }

    /// Reference of the authorization still waiting for capture or void, if this
    /// gateway holds one for the order.
    fn outstanding_authorization(&self, order: &Order) -> Option<String> {
        if !order.paid_with_gateway() {
            return None;
        }
        match order.charge_state() {
            ChargeState::Authorized { charge_id } => Some(
                order
                    .transaction_id
                    .clone()
                    .filter(|id| !id.is_empty())
                    .unwrap_or(charge_id),
            ),
            _ => None,
        }
    }

    /// Captures an outstanding authorization for the order total minus refunds.
    ///
    /// A captured or never-charged order is left untouched. A processor failure is
    /// noted on the order and leaves it authorized, so the capture can be retried.
    pub async fn capture_payment(&self, order_id: u64) -> Result<TransitionOutcome> {
        let _guard = self.locks.lock(order_id).await;

        let mut order = self.load(order_id).await?;
        self.log(&format!(
            "Info: Beginning capture payment for order {order_id} for the amount of {}",
            order.total
        ));

        let Some(refnum) = self.outstanding_authorization(&order) else {
            return Ok(TransitionOutcome::Skipped);
        };

        let request = match Amount::new(order.capturable_total()) {
            Ok(amount) => PaymentRequest::capture(amount, refnum),
            Err(err) => {
                return self
                    .record_transition_failure(order, "Unable to capture charge!", &err)
                    .await;
            }
        };

        match self.gateway.execute(&request).await {
            Ok(result) => {
                let message = format!("USAePay charge complete (Charge ID: {})", result.refnum);
                order.add_note(&message);
                self.log(&format!("Success: {message}"));

                order.update_meta(META_CHARGE_CAPTURED, "yes");
                order.update_meta(META_PAYMENT_ID, &result.refnum);
                order.transaction_id = Some(result.refnum.clone());
                self.orders.save(order).await?;

                Ok(TransitionOutcome::Completed {
                    refnum: result.refnum,
                })
            }
            Err(err) => {
                self.record_transition_failure(order, "Unable to capture charge!", &err)
                    .await
            }
        }
    }

    /// Voids an outstanding authorization. Same guard as [`Self::capture_payment`].
    pub async fn cancel_payment(&self, order_id: u64) -> Result<TransitionOutcome> {
        let _guard = self.locks.lock(order_id).await;

        let mut order = self.load(order_id).await?;
        self.log(&format!(
            "Info: Beginning cancel payment for order {order_id} for the amount of {}",
            order.total
        ));

        let Some(refnum) = self.outstanding_authorization(&order) else {
            return Ok(TransitionOutcome::Skipped);
        };

        match self.gateway.execute(&PaymentRequest::void(refnum)).await {
            Ok(result) => {
                let message = format!("USAePay charge voided (Charge ID: {})", result.refnum);
                order.add_note(&message);
                self.log(&format!("Success: {message}"));

                order.delete_meta(META_CHARGE_CAPTURED);
                order.delete_meta(META_CHARGE_ID);
                self.orders.save(order).await?;

                Ok(TransitionOutcome::Completed {
                    refnum: result.refnum,
                })
            }
            Err(err) => {
                self.record_transition_failure(order, "Unable to refund charge!", &err)
                    .await
            }
        }
    }

    async fn record_transition_failure(
        &self,
        mut order: Order,
        prefix: &str,
        err: &PaymentError,
    ) -> Result<TransitionOutcome> {
        let message = format!("{prefix} {err}");
        order.add_note(&message);
        self.log(&format!("Gateway Error: {message}"));
        self.orders.save(order).await?;
        Ok(TransitionOutcome::Failed {
            message: err.to_string(),
        })
    }

    /// Refunds part or all of a captured charge.
    ///
    /// Unlike capture and void, every failure is returned to the caller.
    pub async fn refund(&self, order_id: u64, amount: Decimal, reason: &str) -> Result<RefundReceipt> {
        let amount = Amount::new(amount)?;

        let _guard = self.locks.lock(order_id).await;

        let mut order = self.load(order_id).await?;
        let Some(refnum) = order.transaction_id.clone().filter(|id| !id.is_empty()) else {
            return Err(PaymentError::ValidationError(format!(
                "Order {order_id} has no transaction to refund"
            )));
        };
        self.log(&format!(
            "Info: Beginning refund for order {order_id} for the amount of {amount}"
        ));

        let request = PaymentRequest::refund(amount, refnum, order.billing.email.clone());
        let result = match self.gateway.execute(&request).await {
            Ok(result) => result,
            Err(err) => {
                self.log(&format!("Gateway Error: {err}"));
                return Err(err);
            }
        };

        let message = format!(
            "Refunded {amount} - Refund ID: {} - Reason: {reason}",
            result.refnum
        );
        order.add_note(&message);
        order.total_refunded += amount.value();
        self.orders.save(order).await?;
        self.log(&format!("Success: {message}"));

        Ok(RefundReceipt {
            order_id,
            amount,
            refnum: result.refnum,
        })
    }
}

/// What the shopper sees when checkout fails. Transport details stay in the
/// log and the order note.
fn customer_notice(err: &PaymentError) -> String {
    match err {
        PaymentError::TransportError(_) => {
            "Gateway Error: There was a problem connecting to the payment gateway.".to_string()
        }
        other => format!("Gateway Error: {other}"),
    }
}

fn with_verification(message: String, verification: &Verification) -> String {
    format!(
        "{message} {} {}",
        verification.avs_message(),
        verification.cvc_message()
    )
    .trim()
    .to_string()
}

#[async_trait]
impl OrderStatusObserver for PaymentLifecycle {
    async fn on_status_changed(&self, change: &StatusChange) {
        let outcome = match change.to {
            OrderStatus::Processing | OrderStatus::Completed => {
                self.capture_payment(change.order_id).await
            }
            OrderStatus::Cancelled | OrderStatus::Refunded => {
                self.cancel_payment(change.order_id).await
            }
            _ => return,
        };

        match outcome {
            Ok(TransitionOutcome::Failed { message }) => {
                warn!(order_id = change.order_id, to = %change.to, %message, "Charge transition failed");
            }
            Ok(_) => {}
            Err(err) => {
                error!(order_id = change.order_id, to = %change.to, error = %err, "Charge transition aborted");
            }
        }
    }
}
