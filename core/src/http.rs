//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. [`Transport`](crate::Transport)
//! builds `HttpRequest` values and parses `HttpResponse` values; executing the
//! round-trip is delegated to an [`HttpExecutor`](crate::HttpExecutor). This
//! keeps URL resolution, header assembly and status handling deterministic
//! and testable without a network.

use serde_json::Value;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as UTF-8 text, if present and valid.
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body handed to the transport by a service.
///
/// Only `Json` is serialized and tagged with a JSON content type. `Form` and
/// `Bytes` are already encoded and travel with whatever headers the caller set.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(String),
    Bytes(Vec<u8>),
}

/// Parsed response payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    #[default]
    Empty,
}

impl ResponseBody {
    /// The JSON value, when the body parsed as JSON.
    pub fn json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Insert or replace a header, matching the name case-insensitively.
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(entry) => *entry = (name.to_string(), value.to_string()),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut headers = vec![("content-type".to_string(), "text/plain".to_string())];
        set_header(&mut headers, "Content-Type", "application/json");
        assert_eq!(headers.len(), 1);
        assert_eq!(find_header(&headers, "CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn response_body_json_accessor() {
        let body = ResponseBody::Json(serde_json::json!({"ok": true}));
        assert_eq!(body.json().unwrap()["ok"], true);
        assert!(ResponseBody::Text("plain".into()).json().is_none());
        assert!(ResponseBody::Empty.is_empty());
    }
}
