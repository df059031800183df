//! Caller-facing client handles.
//!
//! `Chatbot` talks to one chatbot with signed requests; `Chatopera` is the
//! account-level admin client authorized by a bearer token. Both are thin
//! wrappers around a shared `CommandDispatcher`.

use crate::client::{CommandDispatcher, CredentialSigner, HttpTransport, Method, ReqwestTransport};
use crate::dicts::DictManager;
use crate::models::{origin, ChatbotError, Config, Credentials, ResponseEnvelope, Result};
use crate::training::TrainingOrchestrator;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for a single chatbot.
#[derive(Clone)]
pub struct Chatbot {
    dispatcher: Arc<CommandDispatcher>,
}

impl Chatbot {
    /// Create a client. A blank or missing secret yields unauthenticated requests.
    pub fn new(client_id: &str, client_secret: Option<&str>, base_url: &str) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(DEFAULT_TIMEOUT)?);
        Self::with_transport(transport, client_id, client_secret, base_url)
    }

    /// Create a client from resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client_id = config.resolve_client_id()?;
        let transport = Arc::new(ReqwestTransport::new(config.timeout())?);
        let signer = config.resolve_credentials().map(CredentialSigner::new);
        let dispatcher = CommandDispatcher::tenant(transport, config.origin()?, &client_id, signer)?;
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Create a client on top of a caller-supplied transport.
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        client_id: &str,
        client_secret: Option<&str>,
        base_url: &str,
    ) -> Result<Self> {
        let signer = client_secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|secret| CredentialSigner::new(Credentials::new(client_id.trim(), secret)));
        let dispatcher = CommandDispatcher::tenant(transport, origin(base_url)?, client_id, signer)?;
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn client_id(&self) -> &str {
        self.dispatcher.scope().unwrap_or_default()
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    /// Issue a raw command against this chatbot.
    pub async fn command(
        &self,
        method: &str,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<ResponseEnvelope> {
        self.dispatcher.command(method, path, payload).await
    }

    /// Chatbot details.
    pub async fn details(&self) -> Result<ResponseEnvelope> {
        self.dispatcher.execute(Method::Get, "", None).await
    }

    /// Whether the chatbot exists (rc 3 means it does not).
    pub async fn exists(&self) -> Result<bool> {
        let envelope = self.details().await?;
        match envelope.rc() {
            0 => Ok(true),
            3 => Ok(false),
            rc => Err(ChatbotError::DomainStatus {
                method: "GET".to_string(),
                path: "/".to_string(),
                rc,
                message: envelope.message(),
            }),
        }
    }

    /// Training orchestrator sharing this client's dispatcher.
    pub fn training(&self) -> TrainingOrchestrator {
        TrainingOrchestrator::new(Arc::clone(&self.dispatcher))
    }

    /// Custom dictionary manager sharing this client's dispatcher.
    pub fn dicts(&self) -> DictManager {
        DictManager::new(Arc::clone(&self.dispatcher))
    }
}

/// Account-level admin client.
#[derive(Clone)]
pub struct Chatopera {
    dispatcher: Arc<CommandDispatcher>,
}

impl Chatopera {
    pub fn new(access_token: &str, base_url: &str) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(DEFAULT_TIMEOUT)?);
        Self::with_transport(transport, access_token, base_url)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.resolve_access_token()?;
        let transport = Arc::new(ReqwestTransport::new(config.timeout())?);
        let dispatcher = CommandDispatcher::admin(transport, config.origin()?, &token)?;
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        access_token: &str,
        base_url: &str,
    ) -> Result<Self> {
        let dispatcher = CommandDispatcher::admin(transport, origin(base_url)?, access_token)?;
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub async fn command(
        &self,
        method: &str,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<ResponseEnvelope> {
        self.dispatcher.command(method, path, payload).await
    }
}
