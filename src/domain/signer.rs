use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// Length of the time-derived seed embedded in every token.
pub const SEED_LEN: usize = 16;

/// Derives the per-request Basic-Auth credential from the merchant source key and PIN.
///
/// Tokens have the form `s2/<seed>/<sha256(source_key + seed + pin)>` and are sent
/// as `base64(source_key:token)`. The seed comes from the clock, so a fresh
/// credential is produced for every request; how long a given seed stays valid is
/// decided by the processor.
#[derive(Debug)]
pub struct RequestSigner {
    source_key: String,
    pin: SecretString,
}

impl RequestSigner {
    pub fn new(source_key: impl Into<String>, pin: SecretString) -> Self {
        Self {
            source_key: source_key.into(),
            pin,
        }
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Credential for a request issued now.
    pub fn sign(&self) -> String {
        self.sign_at(Utc::now().timestamp_micros())
    }

    /// Credential for a request issued at `timestamp`.
    pub fn sign_at(&self, timestamp: i64) -> String {
        let seed = seed_for(timestamp);
        let digest = Sha256::new()
            .chain_update(self.source_key.as_bytes())
            .chain_update(seed.as_bytes())
            .chain_update(self.pin.expose_secret().as_bytes())
            .finalize();
        let token = format!("s2/{seed}/{}", hex::encode(digest));
        STANDARD.encode(format!("{}:{token}", self.source_key))
    }
}

fn seed_for(timestamp: i64) -> String {
    let mut seed = hex::encode(Sha256::digest(timestamp.to_string().as_bytes()));
    seed.truncate(SEED_LEN);
    seed
}
