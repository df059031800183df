//! Custom vocabulary dictionary entry.

use crate::models::{ChatbotError, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// A standard term with optional synonyms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictWord {
    word: String,
    synonyms: BTreeSet<String>,
}

impl DictWord {
    /// Create an entry; the word is trimmed and must not be blank.
    pub fn new(word: &str) -> Result<Self> {
        let word = word.trim();
        if word.is_empty() {
            return Err(ChatbotError::Validation(
                "dict word must not be blank".to_string(),
            ));
        }
        Ok(Self {
            word: word.to_string(),
            synonyms: BTreeSet::new(),
        })
    }

    /// Create an entry from a `;`-separated synonym list.
    pub fn with_synonyms(word: &str, synonyms: &str) -> Result<Self> {
        let mut entry = Self::new(word)?;
        for synonym in synonyms.split(';') {
            entry.add_synonym(synonym);
        }
        Ok(entry)
    }

    /// Add a synonym. Blank values and the word itself are ignored.
    pub fn add_synonym(&mut self, synonym: &str) {
        let synonym = synonym.trim();
        if !synonym.is_empty() && synonym != self.word {
            self.synonyms.insert(synonym.to_string());
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn synonyms(&self) -> impl Iterator<Item = &str> {
        self.synonyms.iter().map(String::as_str)
    }

    /// Synonyms joined with `;`, or `None` when there are none.
    pub fn synonyms_joined(&self) -> Option<String> {
        if self.synonyms.is_empty() {
            None
        } else {
            Some(self.synonyms.iter().cloned().collect::<Vec<_>>().join(";"))
        }
    }

    pub fn to_json(&self) -> Value {
        let mut object = json!({ "word": self.word });
        if let (Some(joined), Some(map)) = (self.synonyms_joined(), object.as_object_mut()) {
            map.insert("synonyms".to_string(), Value::String(joined));
        }
        object
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let word = map
            .get("word")
            .and_then(Value::as_str)
            .ok_or_else(|| ChatbotError::InvalidResource("dict word requires `word`".to_string()))?;
        match map.get("synonyms").and_then(Value::as_str) {
            Some(synonyms) => Self::with_synonyms(word, synonyms),
            None => Self::new(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_dedups() {
        let word = DictWord::with_synonyms(" 西红柿 ", "番茄; 洋柿子;;西红柿;番茄").unwrap();
        assert_eq!(word.word(), "西红柿");
        assert_eq!(word.synonyms().count(), 2);
        assert_eq!(word.to_json()["word"], "西红柿");
        assert!(word.synonyms_joined().unwrap().contains("番茄"));
    }

    #[test]
    fn test_blank_word_rejected() {
        assert!(matches!(
            DictWord::new("   "),
            Err(ChatbotError::Validation(_))
        ));
    }

    #[test]
    fn test_no_synonyms_omitted_from_json() {
        let word = DictWord::new("apple").unwrap();
        assert_eq!(word.to_json(), json!({"word": "apple"}));
    }
}
