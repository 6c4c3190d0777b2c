//! Application layer orchestrating the payment flow.
//!
//! `PaymentLifecycle` drives charges through authorize, capture, void and refund.
//! `OrderEvents` publishes status changes that trigger capture and void, and
//! `PrivacyService` exports or erases the gateway data kept on orders. Both
//! lifecycle and events serialize per-order writes through `OrderLocks`.

pub mod events;
pub mod lifecycle;
pub mod locks;
pub mod privacy;
