//! HTTP transport seam.
//!
//! The dispatcher only needs "send this request, give me status + body".
//! `ReqwestTransport` is the production implementation; tests plug in a
//! scripted one.

use crate::models::{ChatbotError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ChatbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ChatbotError::Validation(format!(
                "unsupported method '{s}', only GET, POST, PUT, DELETE are supported"
            ))),
        }
    }
}

/// Request body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    Json(Value),
    /// Multipart upload of one file plus text fields
    Multipart {
        file: PathBuf,
        fields: Vec<(String, String)>,
    },
}

/// Fully built outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw reply.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Performs one HTTP exchange.
///
/// Implementations report connection failures as `ChatbotError::Transport`
/// and must not retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// reqwest-backed transport. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatbotError::transport("-", "-", format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn headers(request: &HttpRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ChatbotError::Validation(format!("header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ChatbotError::Validation(format!("header value for {name}: {e}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn multipart(file: &Path, fields: &[(String, String)]) -> Result<Form> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| ChatbotError::io(format!("reading {}", file.display()), e))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        for (name, value) in fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(Self::headers(&request)?);

        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart { file, fields } => {
                builder.multipart(Self::multipart(file, fields).await?)
            }
        };

        let response = builder.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("timed out: {e}")
            } else {
                e.to_string()
            };
            ChatbotError::transport(request.method.as_str(), &request.url, message)
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ChatbotError::transport(request.method.as_str(), &request.url, e.to_string()))?;

        debug!(status, url = %request.url, bytes = body.len(), "Received reply");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted in-memory transport.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies are matched by the first rule whose method matches and whose
    /// fragment occurs in the URL; each rule holds a queue and repeats its
    /// last reply once drained.
    #[derive(Default)]
    pub struct ScriptedTransport {
        rules: Mutex<Vec<(Method, String, VecDeque<Result<HttpResponse>>)>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, method: Method, fragment: &str, body: Value) -> Self {
            self.push(
                method,
                fragment,
                Ok(HttpResponse {
                    status: 200,
                    body: body.to_string(),
                }),
            )
        }

        pub fn reply_raw(self, method: Method, fragment: &str, status: u16, body: &str) -> Self {
            self.push(
                method,
                fragment,
                Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
            )
        }

        pub fn fail(self, method: Method, fragment: &str, message: &str) -> Self {
            self.push(
                method,
                fragment,
                Err(ChatbotError::transport(method.as_str(), fragment, message)),
            )
        }

        fn push(self, method: Method, fragment: &str, reply: Result<HttpResponse>) -> Self {
            {
                let mut rules = self.rules.lock().unwrap();
                match rules
                    .iter_mut()
                    .find(|(m, f, _)| *m == method && f == fragment)
                {
                    Some((_, _, queue)) => queue.push_back(reply),
                    None => rules.push((method, fragment.to_string(), VecDeque::from([reply]))),
                }
            }
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn count(&self, method: Method, fragment: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.method == method && r.url.contains(fragment))
                .count()
        }
    }

    fn clone_reply(reply: &Result<HttpResponse>) -> Result<HttpResponse> {
        match reply {
            Ok(response) => Ok(response.clone()),
            Err(e) => Err(ChatbotError::transport("-", "-", e.to_string())),
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let mut rules = self.rules.lock().unwrap();
            let rule = rules
                .iter_mut()
                .find(|(m, f, _)| *m == request.method && request.url.contains(f.as_str()));
            match rule {
                Some((_, _, queue)) if queue.len() > 1 => queue
                    .pop_front()
                    .unwrap_or_else(|| Err(ChatbotError::transport("-", "-", "empty script"))),
                Some((_, _, queue)) => queue
                    .front()
                    .map(clone_reply)
                    .unwrap_or_else(|| Err(ChatbotError::transport("-", "-", "empty script"))),
                None => Err(ChatbotError::transport(
                    request.method.as_str(),
                    &request.url,
                    "no scripted reply",
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(" DELETE ".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!(
            "PATCH".parse::<Method>(),
            Err(ChatbotError::Validation(_))
        ));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest {
            method: Method::Get,
            url: "http://x".to_string(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: RequestBody::None,
        };
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.header("authorization"), None);
    }
}
