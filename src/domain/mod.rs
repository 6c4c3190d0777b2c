//! Domain layer: orders, card data, processor request/response records and the
//! ports the application layer talks through.

pub mod card;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod signer;
