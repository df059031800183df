//! Speech-recognition request planning.
//!
//! The ASR endpoint takes either a multipart file upload or inline base64
//! audio. Which one is decided from the payload before any network call.

use crate::client::RequestBody;
use crate::models::{ChatbotError, Result};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Path prefix of the ASR endpoint family.
pub const ASR_PATH_PREFIX: &str = "/asr/recognize";

/// Default number of candidate transcripts.
pub const DEFAULT_NBEST: i64 = 5;

/// Default for part-of-speech tagging.
pub const DEFAULT_POS: bool = false;

pub fn is_asr_path(path: &str) -> bool {
    path.starts_with(ASR_PATH_PREFIX)
}

/// Choose the request body for an ASR submission.
pub fn plan(payload: Option<&Value>) -> Result<RequestBody> {
    let payload = payload.and_then(Value::as_object).ok_or_else(|| {
        ChatbotError::Validation("ASR requires a JSON object payload".to_string())
    })?;

    let nbest = payload
        .get("nbest")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_NBEST);
    let pos = payload
        .get("pos")
        .and_then(Value::as_bool)
        .unwrap_or(DEFAULT_POS);
    let from_user_id = payload
        .get("fromUserId")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty());

    let filepath = non_blank(payload, "filepath").map(PathBuf::from);
    if let Some(file) = filepath.clone().filter(|f| f.is_file()) {
        let mut fields = vec![
            ("nbest".to_string(), nbest.to_string()),
            ("pos".to_string(), pos.to_string()),
        ];
        if let Some(user) = from_user_id {
            fields.push(("fromUserId".to_string(), user.to_string()));
        }
        return Ok(RequestBody::Multipart { file, fields });
    }

    if payload.get("type").and_then(Value::as_str) == Some("base64") {
        let data = non_blank(payload, "data").ok_or_else(|| {
            ChatbotError::Validation("ASR base64 payload has no data".to_string())
        })?;

        let mut body = json!({
            "type": "base64",
            "data": data,
            "nbest": nbest,
            "pos": pos,
        });
        if let (Some(user), Some(map)) = (from_user_id, body.as_object_mut()) {
            map.insert("fromUserId".to_string(), Value::String(user.to_string()));
        }
        return Ok(RequestBody::Json(body));
    }

    let missing = filepath
        .map(|f| format!(" (file does not exist: {})", f.display()))
        .unwrap_or_default();
    Err(ChatbotError::Validation(format!(
        "ASR payload needs an existing `filepath` or `{{type: \"base64\", data}}`{missing}"
    )))
}

fn non_blank<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_path_detection() {
        assert!(is_asr_path("/asr/recognize"));
        assert!(is_asr_path("/asr/recognize?x=1"));
        assert!(!is_asr_path("/faq/query"));
    }

    #[test]
    fn test_file_upload_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"RIFF").unwrap();
        let payload = json!({"filepath": file.path().to_string_lossy(), "fromUserId": "u1"});

        match plan(Some(&payload)).unwrap() {
            RequestBody::Multipart { file: path, fields } => {
                assert_eq!(path, file.path());
                assert!(fields.contains(&("nbest".to_string(), "5".to_string())));
                assert!(fields.contains(&("pos".to_string(), "false".to_string())));
                assert!(fields.contains(&("fromUserId".to_string(), "u1".to_string())));
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let payload = json!({"filepath": "/definitely/not/here.wav"});
        let err = plan(Some(&payload)).unwrap_err();
        match err {
            ChatbotError::Validation(msg) => assert!(msg.contains("/definitely/not/here.wav")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_base64() {
        let payload = json!({"filepath": "/no/such.wav", "type": "base64", "data": "AAAA"});
        match plan(Some(&payload)).unwrap() {
            RequestBody::Json(body) => {
                assert_eq!(body["type"], "base64");
                assert_eq!(body["data"], "AAAA");
                assert_eq!(body["nbest"], 5);
            }
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_base64_body() {
        let payload = json!({"type": "base64", "data": "AAAA", "nbest": 2, "pos": true});
        let body = plan(Some(&payload)).unwrap();
        assert_eq!(
            body,
            RequestBody::Json(json!({"type": "base64", "data": "AAAA", "nbest": 2, "pos": true}))
        );
    }

    #[test]
    fn test_neither_branch() {
        assert!(matches!(
            plan(Some(&json!({"type": "wav"}))),
            Err(ChatbotError::Validation(_))
        ));
        assert!(matches!(
            plan(Some(&json!({"type": "base64", "data": " "}))),
            Err(ChatbotError::Validation(_))
        ));
        assert!(matches!(plan(None), Err(ChatbotError::Validation(_))));
    }
}
