//! Cross-domain training status snapshot.
//!
//! K_i: Three independent flags; `0` means synchronized.
//! B_i: The server may omit a flag → construction fails, never half-populated.
//! B_i: `-1` is the server's unset placeholder → rejected like an absent flag.

use crate::models::{ChatbotError, Payload, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Placeholder the server uses for a flag it has not computed.
const UNSET_FLAG: i64 = -1;

/// A training domain whose server-side artifacts must be rebuilt after edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Multi-turn conversation scripts (flag `reparse`)
    Conversation,
    /// Intent recognition model (flag `retrain`)
    Intents,
    /// FAQ search index (flag `reindex`)
    Faq,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Conversation, Domain::Faq, Domain::Intents];

    /// Endpoint that submits a sync job for this domain.
    pub fn sync_path(&self) -> &'static str {
        match self {
            Domain::Conversation => "/conversation/sync/customdicts",
            Domain::Intents => "/clause/devver/train",
            Domain::Faq => "/faq/sync/customdicts",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Conversation => "conversation",
            Domain::Intents => "intents",
            Domain::Faq => "faq",
        };
        f.write_str(name)
    }
}

/// Per-domain convergence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    Synced,
    Pending,
}

/// Status snapshot returned by the build endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    retrain: i64,
    reindex: i64,
    reparse: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    retrain_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reindex_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reparse_msg: Option<String>,
    #[serde(rename = "retrainUpdateAt", skip_serializing_if = "Option::is_none")]
    retrain_updated_at: Option<String>,
    #[serde(rename = "reindexUpdateAt", skip_serializing_if = "Option::is_none")]
    reindex_updated_at: Option<String>,
    #[serde(rename = "reparseUpdateAt", skip_serializing_if = "Option::is_none")]
    reparse_updated_at: Option<String>,
}

/// Wire shape; flags are optional here so absence can be reported precisely.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    retrain: Option<i64>,
    reindex: Option<i64>,
    reparse: Option<i64>,
    retrain_msg: Option<String>,
    reindex_msg: Option<String>,
    reparse_msg: Option<String>,
    retrain_update_at: Option<String>,
    reindex_update_at: Option<String>,
    reparse_update_at: Option<String>,
}

impl Status {
    /// Build a snapshot from the reply payload.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        match payload {
            Payload::Object(map) => Self::from_map(map),
            Payload::Array(_) => Err(ChatbotError::InvalidResource(
                "status snapshot is an array".to_string(),
            )),
            Payload::None => Err(ChatbotError::InvalidResource(
                "status snapshot is empty".to_string(),
            )),
        }
    }

    /// Build a snapshot from a JSON object.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let raw: RawStatus = serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| ChatbotError::InvalidResource(format!("status snapshot: {e}")))?;

        let flags = [
            ("retrain", raw.retrain),
            ("reindex", raw.reindex),
            ("reparse", raw.reparse),
        ];
        let unset: Vec<&str> = flags
            .iter()
            .filter(|(_, v)| *v == Some(UNSET_FLAG))
            .map(|(name, _)| *name)
            .collect();
        if !unset.is_empty() {
            return Err(ChatbotError::InvalidResource(format!(
                "status snapshot has unset {}",
                unset.join(", ")
            )));
        }
        let missing: Vec<&str> = flags
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();

        match (raw.retrain, raw.reindex, raw.reparse) {
            (Some(retrain), Some(reindex), Some(reparse)) => Ok(Self {
                retrain,
                reindex,
                reparse,
                retrain_msg: raw.retrain_msg,
                reindex_msg: raw.reindex_msg,
                reparse_msg: raw.reparse_msg,
                retrain_updated_at: raw.retrain_update_at,
                reindex_updated_at: raw.reindex_update_at,
                reparse_updated_at: raw.reparse_update_at,
            }),
            _ => Err(ChatbotError::InvalidResource(format!(
                "status snapshot missing {}",
                missing.join(", ")
            ))),
        }
    }

    pub fn retrain(&self) -> i64 {
        self.retrain
    }

    pub fn reindex(&self) -> i64 {
        self.reindex
    }

    pub fn reparse(&self) -> i64 {
        self.reparse
    }

    pub fn retrain_msg(&self) -> Option<&str> {
        self.retrain_msg.as_deref()
    }

    pub fn reindex_msg(&self) -> Option<&str> {
        self.reindex_msg.as_deref()
    }

    pub fn reparse_msg(&self) -> Option<&str> {
        self.reparse_msg.as_deref()
    }

    pub fn retrain_updated_at(&self) -> Option<&str> {
        self.retrain_updated_at.as_deref()
    }

    pub fn reindex_updated_at(&self) -> Option<&str> {
        self.reindex_updated_at.as_deref()
    }

    pub fn reparse_updated_at(&self) -> Option<&str> {
        self.reparse_updated_at.as_deref()
    }

    /// Raw flag for a domain.
    pub fn flag(&self, domain: Domain) -> i64 {
        match domain {
            Domain::Conversation => self.reparse,
            Domain::Intents => self.retrain,
            Domain::Faq => self.reindex,
        }
    }

    pub fn state(&self, domain: Domain) -> DomainState {
        if self.flag(domain) == 0 {
            DomainState::Synced
        } else {
            DomainState::Pending
        }
    }

    /// True when every domain is synchronized.
    pub fn all_synced(&self) -> bool {
        Domain::ALL
            .iter()
            .all(|d| self.state(*d) == DomainState::Synced)
    }

    /// Domains with outstanding work.
    pub fn pending(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|d| self.state(*d) == DomainState::Pending)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_full_snapshot() {
        let status = Status::from_map(&object(json!({
            "retrain": 1,
            "reindex": 0,
            "reparse": 0,
            "retrainMsg": "training",
            "retrainUpdateAt": "2024-01-01T00:00:00Z"
        })))
        .unwrap();

        assert_eq!(status.retrain(), 1);
        assert_eq!(status.retrain_msg(), Some("training"));
        assert_eq!(status.retrain_updated_at(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(status.reindex_msg(), None);
        assert_eq!(status.state(Domain::Intents), DomainState::Pending);
        assert_eq!(status.state(Domain::Faq), DomainState::Synced);
        assert!(!status.all_synced());
        assert_eq!(status.pending(), vec![Domain::Intents]);
    }

    #[test]
    fn test_missing_flag_is_invalid() {
        let err = Status::from_map(&object(json!({"retrain": 0, "reindex": 0}))).unwrap_err();
        match err {
            ChatbotError::InvalidResource(msg) => assert!(msg.contains("reparse")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unset_flag_is_invalid() {
        let err = Status::from_map(&object(json!({"retrain": -1, "reindex": 0, "reparse": 0})))
            .unwrap_err();
        match err {
            ChatbotError::InvalidResource(msg) => assert!(msg.contains("retrain")),
            other => panic!("unexpected error: {other:?}"),
        }
        // other non-zero values are ordinary pending flags
        let status =
            Status::from_map(&object(json!({"retrain": 0, "reindex": 2, "reparse": 0}))).unwrap();
        assert_eq!(status.pending(), vec![Domain::Faq]);
    }

    #[test]
    fn test_non_integer_flag_is_invalid() {
        let err = Status::from_map(&object(json!({"retrain": "x", "reindex": 0, "reparse": 0})))
            .unwrap_err();
        assert!(matches!(err, ChatbotError::InvalidResource(_)));
    }

    #[test]
    fn test_payload_shapes() {
        assert!(Status::from_payload(&Payload::None).is_err());
        assert!(Status::from_payload(&Payload::Array(vec![])).is_err());
        let ok = Status::from_payload(&Payload::Object(object(json!({
            "retrain": 0, "reindex": 0, "reparse": 0
        }))))
        .unwrap();
        assert!(ok.all_synced());
    }

    #[test]
    fn test_serializes_wire_names() {
        let status = Status::from_map(&object(json!({
            "retrain": 0, "reindex": 2, "reparse": 0, "reindexUpdateAt": "t"
        })))
        .unwrap();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, json!({"retrain": 0, "reindex": 2, "reparse": 0, "reindexUpdateAt": "t"}));
    }
}
