//! Merchant settings for the gateway.
//!
//! Loaded from a YAML file and overridden by environment variables.

use crate::domain::card::CardNetwork;
use crate::domain::money::SUPPORTED_CURRENCY;
use crate::error::{PaymentError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::path::Path;

pub const LIVE_URL: &str = "https://usaepay.com/api/v2/transactions";
pub const SANDBOX_URL: &str = "https://sandbox.usaepay.com/api/v2/transactions";

/// Processor environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sandbox,
    Live,
}

impl Mode {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Mode::Sandbox => SANDBOX_URL,
            Mode::Live => LIVE_URL,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub enabled: bool,
    /// Send transactions to the sandbox host.
    pub sandbox: bool,
    /// Capture immediately (`cc:sale`) instead of authorizing only.
    pub capture: bool,
    pub source_key: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub pin: SecretString,
    pub allowed_card_types: BTreeSet<CardNetwork>,
    /// Log lifecycle messages.
    pub logging: bool,
    /// Log full gateway requests and responses, card data included. Only takes
    /// effect together with `logging`, and must only be switched on temporarily
    /// while troubleshooting.
    pub debug: bool,
    /// Append `Item x qty` pairs to the charge description.
    pub line_items: bool,
    /// Ask the processor to email its own receipt to the customer.
    pub customer_receipt: bool,
    pub statement_descriptor: String,
    /// Replaces the sandbox/live endpoint, e.g. for an egress proxy.
    pub endpoint: Option<String>,
    /// Days an order keeps its gateway metadata before privacy erasure may remove it.
    pub retention_days: Option<u32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sandbox: true,
            capture: true,
            source_key: String::new(),
            pin: SecretString::from(String::new()),
            allowed_card_types: BTreeSet::from([
                CardNetwork::Visa,
                CardNetwork::Mastercard,
                CardNetwork::Discover,
                CardNetwork::Amex,
            ]),
            logging: false,
            debug: false,
            line_items: false,
            customer_receipt: false,
            statement_descriptor: String::new(),
            endpoint: None,
            retention_days: None,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (`path`, else `USAEPAY_CONFIG`, else `usaepay.yaml` if present)
    /// 3. Defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("USAEPAY_CONFIG").ok();
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env_path.map(Into::into));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None if Path::new("usaepay.yaml").exists() => Self::from_file(Path::new("usaepay.yaml"))?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| PaymentError::ConfigError(format!("Invalid gateway configuration: {e}")))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("USAEPAY_SOURCE_KEY") {
            self.source_key = key;
        }
        if let Ok(pin) = std::env::var("USAEPAY_PIN") {
            self.pin = SecretString::from(pin);
        }
        if let Some(sandbox) = std::env::var("USAEPAY_SANDBOX")
            .ok()
            .as_deref()
            .and_then(parse_flag)
        {
            self.sandbox = sandbox;
        }
        if let Ok(endpoint) = std::env::var("USAEPAY_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
    }

    pub fn mode(&self) -> Mode {
        if self.sandbox { Mode::Sandbox } else { Mode::Live }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.mode().endpoint())
    }

    /// Wire logging needs both switches.
    pub fn wire_logging(&self) -> bool {
        self.logging && self.debug
    }

    pub fn accepts(&self, network: CardNetwork) -> bool {
        self.allowed_card_types.contains(&network)
    }

    /// Checks the gateway can take payments for an order in `currency`.
    pub fn ensure_available(&self, currency: &str) -> Result<()> {
        let pin = self.pin.expose_secret();
        let problem = if !self.enabled {
            "USAePay is disabled"
        } else if self.source_key.is_empty() {
            "Please enter your Source Key"
        } else if pin.is_empty() {
            "Please enter your Pin"
        } else if self.source_key == pin {
            "Your Source Key and Pin match. Please check and re-enter."
        } else if !currency.eq_ignore_ascii_case(SUPPORTED_CURRENCY) {
            "USAePay supports only USD currency."
        } else {
            return Ok(());
        };
        Err(PaymentError::GatewayUnavailable(problem.to_string()))
    }
}
