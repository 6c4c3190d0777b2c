use crate::domain::payment::GatewayFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Card Type Not Accepted")]
    CardTypeNotAccepted { card: String },
    #[error("Transport error: {0}")]
    TransportError(#[from] reqwest::Error),
    #[error("There was an error with the gateway response.")]
    InvalidResponse,
    #[error("{0}")]
    CardDeclined(GatewayFailure),
    #[error("{0}")]
    CardError(GatewayFailure),
    #[error("Order {0} not found")]
    OrderNotFound(u64),
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// The processor payload attached to a decline or card error, if any.
    pub fn gateway_failure(&self) -> Option<&GatewayFailure> {
        match self {
            PaymentError::CardDeclined(failure) | PaymentError::CardError(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
