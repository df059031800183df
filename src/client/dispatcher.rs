//! Command dispatch: one call in, one normalized envelope out.
//!
//! Epistemic foundation:
//! - K_i: Every path is scoped under /api/v1 (and the tenant id for bot clients)
//! - K_i: Every request carries sdklang for server-side diagnostics
//! - B_i: Reply is a JSON object with an integer rc (might not be) → TransportError
//! - I^B: Network failures are surfaced as-is; no automatic retry

use crate::client::asr;
use crate::client::{CredentialSigner, HttpRequest, HttpTransport, Method, RequestBody};
use crate::models::{ChatbotError, ResponseEnvelope, Result, API_BASE_PATH};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Diagnostic query parameter identifying this SDK.
pub const SDKLANG_PARAM: &str = "sdklang=rust";

/// Internal tenant field removed from successful payloads.
pub const TENANT_FIELD: &str = "chatbotID";

/// How requests are authorized.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Per-request HMAC signature
    Signed(CredentialSigner),
    /// Static account-level token
    Bearer(String),
    /// No Authorization header
    Anonymous,
}

/// Builds, sends and normalizes commands against the platform.
pub struct CommandDispatcher {
    transport: Arc<dyn HttpTransport>,
    origin: String,
    scope: Option<String>,
    auth: Auth,
}

impl CommandDispatcher {
    /// Dispatcher for a single chatbot; paths are prefixed with its client id.
    pub fn tenant(
        transport: Arc<dyn HttpTransport>,
        origin: impl Into<String>,
        client_id: &str,
        signer: Option<CredentialSigner>,
    ) -> Result<Self> {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Err(ChatbotError::Validation("client id must not be blank".to_string()));
        }
        Ok(Self {
            transport,
            origin: origin.into(),
            scope: Some(client_id.to_string()),
            auth: signer.map_or(Auth::Anonymous, Auth::Signed),
        })
    }

    /// Account-level dispatcher authorized by a bearer token.
    pub fn admin(
        transport: Arc<dyn HttpTransport>,
        origin: impl Into<String>,
        access_token: &str,
    ) -> Result<Self> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(ChatbotError::Validation("access token must not be blank".to_string()));
        }
        Ok(Self {
            transport,
            origin: origin.into(),
            scope: None,
            auth: Auth::Bearer(token.to_string()),
        })
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Tenant client id, if this dispatcher is scoped to one chatbot.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Server-side path for a relative command path, query merged.
    pub fn request_path(&self, path: &str) -> String {
        let mut full = String::from(API_BASE_PATH);
        if let Some(scope) = &self.scope {
            full.push('/');
            full.push_str(scope);
        }
        full.push_str(&with_sdklang(path));
        full
    }

    /// Parse `method` and execute.
    pub async fn command(
        &self,
        method: &str,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<ResponseEnvelope> {
        let method: Method = method.parse()?;
        self.execute(method, path, payload).await
    }

    /// Execute one command.
    ///
    /// A non-zero rc is returned inside the envelope, not as an error.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<ResponseEnvelope> {
        if !path.is_empty() && !path.starts_with('/') {
            return Err(ChatbotError::Validation(format!(
                "path must start with '/': {path}"
            )));
        }

        let body = request_body(method, path, payload)?;
        let full_path = self.request_path(path);

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if matches!(body, RequestBody::Json(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        match &self.auth {
            Auth::Signed(signer) => {
                headers.push(("Authorization".to_string(), signer.sign(method, &full_path)?));
            }
            Auth::Bearer(token) => {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
            Auth::Anonymous => {}
        }

        debug!(method = %method, path = %full_path, "Dispatching command");

        let request = HttpRequest {
            method,
            url: format!("{}{}", self.origin, full_path),
            headers,
            body,
        };
        let response = self.transport.send(request).await?;

        let raw: Value = serde_json::from_str(&response.body).map_err(|e| {
            ChatbotError::transport(
                method.as_str(),
                path,
                format!("HTTP {} reply is not JSON: {e}", response.status),
            )
        })?;

        let mut envelope = ResponseEnvelope::from_json(raw).map_err(|message| {
            ChatbotError::transport(
                method.as_str(),
                path,
                format!("HTTP {} {message}", response.status),
            )
        })?;

        if envelope.is_success() {
            envelope.strip_field(TENANT_FIELD);
        } else {
            debug!(method = %method, path, rc = envelope.rc(), "Command returned non-zero rc");
        }

        Ok(envelope)
    }
}

/// Append the sdklang parameter, merging with an existing query string.
pub fn with_sdklang(path: &str) -> String {
    if path.trim().is_empty() {
        return format!("/?{SDKLANG_PARAM}");
    }
    if path.contains('?') {
        if path.ends_with('?') || path.ends_with('&') {
            format!("{path}{SDKLANG_PARAM}")
        } else {
            format!("{path}&{SDKLANG_PARAM}")
        }
    } else {
        format!("{path}?{SDKLANG_PARAM}")
    }
}

/// Choose the body for a method; validation happens here, before any I/O.
fn request_body(method: Method, path: &str, payload: Option<&Value>) -> Result<RequestBody> {
    if asr::is_asr_path(path) {
        return asr::plan(payload);
    }

    match method {
        Method::Get => {
            if payload.is_some() {
                debug!(path, "Ignoring payload on GET");
            }
            Ok(RequestBody::None)
        }
        Method::Delete => Ok(payload.map_or(RequestBody::None, |p| RequestBody::Json(p.clone()))),
        Method::Post => Ok(RequestBody::Json(payload.cloned().unwrap_or_else(|| json!({})))),
        Method::Put => payload
            .map(|p| RequestBody::Json(p.clone()))
            .ok_or_else(|| ChatbotError::Validation(format!("PUT {path} requires a payload"))),
    }
}
