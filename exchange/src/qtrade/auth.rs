//! Request signing for the qTrade API.
//!
//! The signature is `base64(sha256(details))` where `details` is
//!
//! ```text
//! METHOD \n PATH \n TIMESTAMP \n BODY \n SECRET
//! ```
//!
//! with an empty line standing in for a missing body. The query string is
//! not part of the signed path.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::ExchangeError;

/// An API key pair, read from a `key_id:secret` key file.
#[derive(Clone)]
pub struct Credentials {
    key_id: String,
    secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(key_id: &str, secret: &str) -> Self {
        Self {
            key_id: key_id.to_string(),
            secret: Zeroizing::new(secret.to_string()),
        }
    }

    /// Parse the contents of a key file. Surrounding whitespace is ignored.
    pub fn parse(contents: &str) -> Result<Self, ExchangeError> {
        match contents.trim().split_once(':') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() && !secret.contains(':') => {
                Ok(Self::new(id, secret))
            }
            _ => Err(ExchangeError::Auth(
                "key file must contain exactly `key_id:secret`".into(),
            )),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Base64 signature of one request.
    pub fn sign(&self, method: &str, path: &str, timestamp: i64, body: Option<&str>) -> String {
        let mut details = format!("{method}\n{path}\n{timestamp}\n");
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            details.push_str(body);
        }
        details.push('\n');
        details.push_str(&self.secret);

        let digest = Sha256::digest(Zeroizing::new(details).as_bytes());
        STANDARD.encode(digest)
    }

    /// `Authorization` header value for a signature.
    pub fn authorization(&self, signature: &str) -> String {
        format!("HMAC-SHA256 {}:{signature}", self.key_id)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
