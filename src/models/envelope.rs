//! Normalized server reply.
//!
//! K_i: Every reply carries an integer `rc`; `0` is success.
//! K_i: The payload is a single object, an array, or nothing. Never both shapes.
//! B_i: Every other field may be absent, and absence is kept distinct from zero.

use crate::models::{ChatbotError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reply payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// No payload (absent, null or non-JSON text)
    #[default]
    None,
    /// Single object
    Object(Map<String, Value>),
    /// List of values
    Array(Vec<Value>),
}

impl Payload {
    /// Fold a raw `data` value into a payload.
    ///
    /// Strings that hold encoded JSON are decoded into the matching shape.
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Null => Ok(Self::None),
            Value::Object(map) => Ok(Self::Object(map)),
            Value::Array(items) => Ok(Self::Array(items)),
            Value::String(text) => {
                let trimmed = text.trim_start();
                if trimmed.starts_with('[') || trimmed.starts_with('{') {
                    let decoded: Value = serde_json::from_str(&text)
                        .map_err(|e| format!("data is not valid JSON: {e}"))?;
                    Self::from_value(decoded)
                } else {
                    Ok(Self::None)
                }
            }
            other => Err(format!("unsupported data shape: {other}")),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    fn shape(&self) -> Option<PayloadShape> {
        match self {
            Self::None => None,
            Self::Object(_) => Some(PayloadShape::Object),
            Self::Array(_) => Some(PayloadShape::Array),
        }
    }
}

/// Concrete payload shape an envelope has committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadShape {
    Object,
    Array,
}

impl PayloadShape {
    fn name(shape: Option<Self>) -> &'static str {
        match shape {
            None => "empty",
            Some(Self::Object) => "object",
            Some(Self::Array) => "array",
        }
    }
}

/// Normalized server reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    rc: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    data: Payload,

    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    current_page: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    total_page: Option<i64>,

    /// Set by the first object or array payload; never cleared
    #[serde(skip)]
    shape: Option<PayloadShape>,
}

impl ResponseEnvelope {
    /// Create an envelope carrying only a result code.
    pub fn new(rc: i64) -> Self {
        Self {
            rc,
            msg: None,
            error: None,
            data: Payload::None,
            total: None,
            current_page: None,
            total_page: None,
            shape: None,
        }
    }

    /// Fold a raw JSON reply into an envelope.
    ///
    /// Optional fields are copied only when present.
    pub fn from_json(value: Value) -> std::result::Result<Self, String> {
        let mut object = match value {
            Value::Object(map) => map,
            other => return Err(format!("reply is not a JSON object: {other}")),
        };

        let rc = object
            .get("rc")
            .and_then(Value::as_i64)
            .ok_or_else(|| "reply has no integer rc".to_string())?;

        let mut envelope = Self::new(rc);
        envelope.msg = object.remove("msg").and_then(text_field);
        envelope.error = object.remove("error").and_then(text_field);
        envelope.total = int_field(&object, "total")?;
        envelope.current_page = int_field(&object, "current_page")?;
        envelope.total_page = int_field(&object, "total_page")?;

        if let Some(data) = object.remove("data") {
            envelope
                .set_data(Payload::from_value(data)?)
                .map_err(|e| e.to_string())?;
        }

        Ok(envelope)
    }

    /// Set the payload.
    ///
    /// Once an object or array payload has been set, the envelope is committed
    /// to that shape: writing the other shape, or clearing it, is a
    /// normalization bug and fails with `InvariantViolation`.
    pub fn set_data(&mut self, data: Payload) -> Result<()> {
        let incoming = data.shape();
        match self.shape {
            Some(committed) if incoming != Some(committed) => {
                return Err(ChatbotError::InvariantViolation(format!(
                    "envelope is committed to an {} payload, refusing {}",
                    PayloadShape::name(Some(committed)),
                    PayloadShape::name(incoming)
                )));
            }
            Some(_) => {}
            None => self.shape = incoming,
        }
        self.data = data;
        Ok(())
    }

    /// Remove `key` from the object payload, or from every object in an array payload.
    pub(crate) fn strip_field(&mut self, key: &str) {
        match &mut self.data {
            Payload::Object(map) => {
                map.remove(key);
            }
            Payload::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(map) = item {
                        map.remove(key);
                    }
                }
            }
            Payload::None => {}
        }
    }

    pub fn rc(&self) -> i64 {
        self.rc
    }

    pub fn is_success(&self) -> bool {
        self.rc == 0
    }

    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn into_data(self) -> Payload {
        self.data
    }

    pub fn total(&self) -> Option<i64> {
        self.total
    }

    pub fn current_page(&self) -> Option<i64> {
        self.current_page
    }

    pub fn total_page(&self) -> Option<i64> {
        self.total_page
    }

    /// Best human-readable explanation: `error`, then `msg`.
    pub fn message(&self) -> String {
        self.error
            .as_deref()
            .or(self.msg.as_deref())
            .unwrap_or_default()
            .to_string()
    }

    /// Convert a non-zero rc into a `DomainStatus` error.
    pub fn into_result(self, method: &str, path: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ChatbotError::DomainStatus {
                method: method.to_string(),
                path: path.to_string(),
                rc: self.rc,
                message: self.message(),
            })
        }
    }

    /// Plain JSON form. Absent optional fields are omitted; `data` is always present.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    #[cfg(test)]
    pub(crate) fn with_msg(mut self, msg: &str) -> Self {
        self.msg = Some(msg.to_string());
        self
    }
}

fn text_field(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn int_field(object: &Map<String, Value>, key: &str) -> std::result::Result<Option<i64>, String> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{key} is not an integer: {value}")),
    }
}
