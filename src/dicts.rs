//! Custom vocabulary dictionaries.
//!
//! K_i: Dictionary codes are interpreted here, not by the dispatcher.
//! K_i: rc 11 on delete means the dictionary is already gone → success.

use crate::client::{CommandDispatcher, Method};
use crate::models::{ChatbotError, DictWord, Result};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

const DICT_NOT_FOUND_ON_DELETE: i64 = 11;
const DICT_NOT_FOUND: i64 = 2;

/// Manages the custom dictionaries of one chatbot.
#[derive(Clone)]
pub struct DictManager {
    dispatcher: Arc<CommandDispatcher>,
}

impl DictManager {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Delete a dictionary. Deleting one that no longer exists counts as deleted.
    pub async fn delete_custom_dict(&self, name: &str) -> Result<bool> {
        let name = dict_name(name)?;
        let envelope = self
            .dispatcher
            .execute(Method::Delete, &format!("/clause/customdicts/{name}"), None)
            .await?;
        match envelope.rc() {
            0 | DICT_NOT_FOUND_ON_DELETE => Ok(true),
            rc => {
                warn!(dict = name, rc, error = %envelope.message(), "Failed to delete custom dict");
                Ok(false)
            }
        }
    }

    /// Create or overwrite a word (and its synonyms) in a vocabulary dictionary.
    pub async fn put_vocab_word(&self, dict: &str, word: &DictWord) -> Result<bool> {
        let dict = dict_name(dict)?;
        let payload = json!({
            "customdict": { "name": dict },
            "dictword": word.to_json(),
        });
        let envelope = self
            .dispatcher
            .execute(Method::Post, "/clause/dictwords", Some(&payload))
            .await?;
        if !envelope.is_success() {
            warn!(dict, word = word.word(), rc = envelope.rc(), error = %envelope.message(), "Failed to put dict word");
        }
        Ok(envelope.is_success())
    }

    /// Dictionary details, or `None` when it does not exist.
    pub async fn get_custom_dict(&self, name: &str) -> Result<Option<Map<String, Value>>> {
        let name = dict_name(name)?;
        let path = format!("/clause/customdict?name={name}");
        let envelope = self.dispatcher.execute(Method::Get, &path, None).await?;
        if envelope.rc() == DICT_NOT_FOUND {
            return Ok(None);
        }
        let envelope = envelope.into_result("GET", &path)?;
        envelope
            .data()
            .as_object()
            .cloned()
            .map(Some)
            .ok_or_else(|| ChatbotError::InvalidResource(format!("dict {name} has no details")))
    }
}

fn dict_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatbotError::Validation("dict name must not be blank".to_string()));
    }
    Ok(name)
}
