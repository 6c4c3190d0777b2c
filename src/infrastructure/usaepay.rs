use crate::config::GatewayConfig;
use crate::domain::payment::{GatewayFailure, PaymentRequest, TransactionResult};
use crate::domain::ports::PaymentGateway;
use crate::domain::signer::RequestSigner;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Card networks can take a long time to answer; the timeout is fixed.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// HTTP client for the USAePay transactions endpoint.
///
/// Every request gets a freshly signed credential. When wire logging is on, the
/// complete request and response, card number and CVC included, are written to
/// the `usaepay::wire` log target.
pub struct UsaepayClient {
    http: reqwest::Client,
    endpoint: String,
    signer: RequestSigner,
    wire_logging: bool,
}

impl UsaepayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        let signer = RequestSigner::new(
            config.source_key.clone(),
            SecretString::from(config.pin.expose_secret().to_string()),
        );

        let wire_logging = config.wire_logging();
        if wire_logging {
            warn!(
                "Gateway debug logging is enabled: requests and responses, including card numbers and CVC, \
                 will be written to the log. Disable it as soon as troubleshooting is finished and delete the logs."
            );
        }

        Ok(Self {
            http,
            endpoint: config.endpoint().to_string(),
            signer,
            wire_logging,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &PaymentRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Basic {}", self.signer.sign()))
            .json(request)
            .send()
            .await?;
        Ok(response.text().await?)
    }

    fn log_exchange(&self, request: &PaymentRequest, outcome: &Result<String>) {
        if !self.wire_logging {
            return;
        }
        let request = serde_json::to_string_pretty(request).unwrap_or_default();
        match outcome {
            Ok(body) => debug!(
                target: "usaepay::wire",
                "\nPosting to: \n{}\nRequest: \n{}\nResponse: \n{}",
                self.endpoint,
                request,
                body
            ),
            Err(e) => debug!(
                target: "usaepay::wire",
                "\nPosting to: \n{}\nRequest: \n{}\nTransport error: \n{}",
                self.endpoint,
                request,
                e
            ),
        }
    }
}

#[async_trait]
impl PaymentGateway for UsaepayClient {
    async fn execute(&self, request: &PaymentRequest) -> Result<TransactionResult> {
        let outcome = self.post(request).await;
        self.log_exchange(request, &outcome);
        interpret_response(&outcome?)
    }
}

/// Turns a response body into an approved transaction or a typed failure.
pub fn interpret_response(body: &str) -> Result<TransactionResult> {
    let payload: Value = match serde_json::from_str(body) {
        Ok(payload) if !is_blank(&payload) => payload,
        _ => return Err(PaymentError::InvalidResponse),
    };

    let flagged = payload
        .get("result")
        .and_then(Value::as_str)
        .is_some_and(|result| matches!(result, "Error" | "Declined"));

    if flagged {
        return Err(PaymentError::CardDeclined(GatewayFailure::from_payload(
            payload,
            "error_code",
        )));
    }
    if payload.get("error").is_some_and(|error| !error.is_null()) {
        return Err(PaymentError::CardError(GatewayFailure::from_payload(
            payload,
            "errorcode",
        )));
    }

    serde_json::from_value(payload).map_err(|_| PaymentError::InvalidResponse)
}

fn is_blank(payload: &Value) -> bool {
    match payload {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
