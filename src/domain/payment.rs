use super::card::CardDetails;
use super::money::Amount;
use super::order::Order;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Transaction commands understood by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentCommand {
    #[serde(rename = "cc:sale")]
    Sale,
    #[serde(rename = "cc:authonly")]
    AuthOnly,
    #[serde(rename = "cc:capture")]
    Capture,
    #[serde(rename = "void")]
    Void,
    #[serde(rename = "refund")]
    Refund,
}

impl PaymentCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentCommand::Sale => "cc:sale",
            PaymentCommand::AuthOnly => "cc:authonly",
            PaymentCommand::Capture => "cc:capture",
            PaymentCommand::Void => "void",
            PaymentCommand::Refund => "refund",
        }
    }
}

#[derive(Clone, Serialize, PartialEq)]
pub struct CreditCardPayload {
    pub cardholder: String,
    pub number: String,
    pub expiration: String,
    pub cvc: String,
}

impl fmt::Debug for CreditCardPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = &self.number[self.number.len().saturating_sub(4)..];
        f.debug_struct("CreditCardPayload")
            .field("cardholder", &self.cardholder)
            .field("number", &format_args!("****{last4}"))
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BillingAddressPayload {
    pub firstname: String,
    pub lastname: String,
    pub street: String,
    pub street2: String,
    pub city: String,
    pub state: String,
    pub postalcode: String,
    pub country: String,
    pub phone: String,
    pub company: String,
}

/// JSON body posted to the transactions endpoint.
///
/// Built fresh for every call and never persisted. Only the fields relevant to
/// the command are populated; the rest are omitted from the wire format.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentRequest {
    pub command: PaymentCommand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refnum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_receipt: Option<u8>,
    #[serde(rename = "receipt-custemail", skip_serializing_if = "Option::is_none")]
    pub receipt_custemail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clientip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creditcard: Option<CreditCardPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<BillingAddressPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_duplicate: Option<u8>,
}

impl PaymentRequest {
    fn bare(command: PaymentCommand) -> Self {
        Self {
            command,
            amount: None,
            refnum: None,
            invoice: None,
            orderid: None,
            description: None,
            email: None,
            send_receipt: None,
            receipt_custemail: None,
            clientip: None,
            creditcard: None,
            billing_address: None,
            ignore_duplicate: None,
        }
    }

    /// A `cc:sale` or `cc:authonly` charge carrying the card and billing data.
    pub fn charge(
        command: PaymentCommand,
        order: &Order,
        amount: Amount,
        card: &CardDetails,
        description: String,
        send_receipt: bool,
    ) -> Self {
        let billing = &order.billing;
        Self {
            amount: Some(amount),
            invoice: Some(order.number.clone()),
            orderid: Some(order.id.to_string()),
            description: Some(description),
            email: Some(billing.email.clone()),
            send_receipt: Some(u8::from(send_receipt)),
            receipt_custemail: (!send_receipt).then(|| "none".to_string()),
            clientip: order.customer_ip.clone(),
            creditcard: Some(CreditCardPayload {
                cardholder: billing.full_name(),
                number: card.number.clone(),
                expiration: card.expiration(),
                cvc: card.cvc.clone(),
            }),
            billing_address: Some(BillingAddressPayload {
                firstname: billing.first_name.clone(),
                lastname: billing.last_name.clone(),
                street: billing.address_1.clone(),
                street2: billing.address_2.clone(),
                city: billing.city.clone(),
                state: billing.state.clone(),
                postalcode: billing.postcode.clone(),
                country: billing.country.clone(),
                phone: billing.phone.clone(),
                company: billing.company.clone(),
            }),
            ignore_duplicate: Some(0),
            ..Self::bare(command)
        }
    }

    pub fn capture(amount: Amount, refnum: impl Into<String>) -> Self {
        Self {
            amount: Some(amount),
            refnum: Some(refnum.into()),
            ..Self::bare(PaymentCommand::Capture)
        }
    }

    pub fn void(refnum: impl Into<String>) -> Self {
        Self {
            refnum: Some(refnum.into()),
            ..Self::bare(PaymentCommand::Void)
        }
    }

    pub fn refund(amount: Amount, refnum: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            amount: Some(amount),
            refnum: Some(refnum.into()),
            email: Some(email.into()),
            ..Self::bare(PaymentCommand::Refund)
        }
    }
}

/// One address or card-code verification verdict. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VerificationResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub result_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result: Option<String>,
}

/// AVS and CVC verdicts, present on approvals and often on declines too.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub avs: Option<VerificationResult>,
    #[serde(default)]
    pub cvc: Option<VerificationResult>,
}

impl Verification {
    /// Reads whatever verification detail a raw payload carries.
    pub fn from_payload(payload: &Value) -> Self {
        serde_json::from_value(payload.clone()).unwrap_or_default()
    }

    pub fn avs_message(&self) -> String {
        match self.avs.as_ref() {
            Some(VerificationResult {
                result_code: Some(code),
                result: Some(text),
            }) => format!("\nAVS Response: {code} - {text}"),
            _ => String::new(),
        }
    }

    pub fn cvc_message(&self) -> String {
        match self.cvc.as_ref() {
            Some(VerificationResult {
                result_code,
                result: Some(text),
            }) => match result_code {
                Some(code) => format!("\nCVV2 Response: {code} - {text}"),
                None => format!("\nCVV2 Response: {text}"),
            },
            _ => String::new(),
        }
    }
}

/// An approved transaction as reported by the processor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionResult {
    #[serde(deserialize_with = "required_string")]
    pub refnum: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub authcode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result: Option<String>,
    #[serde(flatten)]
    pub verification: Verification,
}

/// A decline or error reported by the processor.
///
/// Keeps the whole payload so AVS/CVC detail can still be recorded on the order.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFailure {
    pub code: Option<String>,
    pub message: String,
    pub raw: Value,
}

impl GatewayFailure {
    /// Extracts code and message from a failure payload. The processor names the
    /// code field `error_code` on declines and `errorcode` on request errors.
    pub fn from_payload(raw: Value, code_field: &str) -> Self {
        let code = raw.get(code_field).and_then(value_as_string);
        let message = raw
            .get("error")
            .and_then(value_as_string)
            .or_else(|| raw.get("result").and_then(value_as_string))
            .unwrap_or_default();
        Self { code, message, raw }
    }

    pub fn verification(&self) -> Verification {
        Verification::from_payload(&self.raw)
    }
}

impl fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (error {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_string))
}

fn required_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_string(&value).ok_or_else(|| serde::de::Error::custom("refnum must not be empty"))
}
