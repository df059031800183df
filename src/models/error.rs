//! Error types for the SDK.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (bad input, non-zero rc, malformed snapshot)
//! - I^B materialized: Infrastructure failures (network, signing, timeout)
//! - K_i violated: Internal invariant violations (bugs in this crate)

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the SDK.
#[derive(Debug, Error)]
pub enum ChatbotError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED — Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{method} {path} returned rc {rc}: {message}")]
    DomainStatus {
        method: String,
        path: String,
        rc: i64,
        message: String,
    },

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED — Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("Failed to sign request: {0}")]
    Signing(String),

    #[error("Request {method} {path} failed: {message}")]
    Transport {
        method: String,
        path: String,
        message: String,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Gave up waiting after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED — Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl ChatbotError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error for a given request.
    pub fn transport(
        method: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            method: method.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the request never produced a usable reply.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// True when the request could not even be built.
    pub fn is_signing(&self) -> bool {
        matches!(self, Self::Signing(_))
    }

    /// Domain status code carried by this error, if any.
    pub fn rc(&self) -> Option<i64> {
        match self {
            Self::DomainStatus { rc, .. } => Some(*rc),
            _ => None,
        }
    }
}

/// Result type alias for the SDK.
pub type Result<T> = std::result::Result<T, ChatbotError>;
