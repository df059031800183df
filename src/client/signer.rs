//! Per-request signature for the `Authorization` header.
//!
//! Epistemic foundation:
//! - K_i: The server recomputes HMAC-SHA1(secret, id + ts + nonce + method + path)
//! - K_i: Token = base64(JSON{appId, timestamp, random, signature})
//! - B_i: MAC/encoding may fail → SigningError, distinct from transport errors

use crate::client::Method;
use crate::models::{ChatbotError, Credentials, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Nonce length required by the server.
pub const NONCE_LEN: usize = 10;

/// Ephemeral signing material for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedRequest {
    #[serde(rename = "appId")]
    pub app_id: String,
    pub timestamp: String,
    #[serde(rename = "random")]
    pub nonce: String,
    pub signature: String,
}

impl SignedRequest {
    /// Encode as the header token.
    pub fn token(&self) -> Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| ChatbotError::Signing(format!("encoding token: {e}")))?;
        Ok(STANDARD.encode(json))
    }
}

/// Signs requests with the client's secret.
#[derive(Debug, Clone)]
pub struct CredentialSigner {
    credentials: Credentials,
}

impl CredentialSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }

    /// Produce a token for `method` + `path` (path includes the query string).
    pub fn sign(&self, method: Method, path: &str) -> Result<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let nonce = generate_nonce();
        self.sign_with(method, path, &timestamp, &nonce)?.token()
    }

    /// Deterministic signing with caller-supplied timestamp and nonce.
    pub fn sign_with(
        &self,
        method: Method,
        path: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<SignedRequest> {
        let message = format!(
            "{}{}{}{}{}",
            self.credentials.client_id(),
            timestamp,
            nonce,
            method.as_str(),
            path
        );

        let mut mac = HmacSha1::new_from_slice(self.credentials.client_secret().as_bytes())
            .map_err(|e| ChatbotError::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(SignedRequest {
            app_id: self.credentials.client_id().to_string(),
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
            signature,
        })
    }
}

/// Random alphanumeric nonce.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
