//! Request transport: URL resolution, header assembly, body encoding,
//! response parsing and the uniform failure policy.
//!
//! # Design
//! `build_request` and `parse_response` are pure; `request` glues them to an
//! [`HttpExecutor`]. The authorization header is re-read from durable storage
//! on every request, so a session persisted by [`SessionStore`](crate::SessionStore)
//! (or by another client sharing the same storage) is picked up without any
//! explicit wiring between the two.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::adapters::{value_to_string, RawRecord};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::executor::HttpExecutor;
use crate::http::{find_header, set_header, HttpMethod, HttpRequest, HttpResponse, RequestBody, ResponseBody};
use crate::session::normalize_token_type;
use crate::storage::KeyValueStore;

const FALLBACK_ERROR_MESSAGE: &str = "API request failed";

/// Per-call headers and body.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json(self, value: Value) -> Self {
        self.body(RequestBody::Json(value))
    }
}

#[derive(Clone)]
pub struct Transport {
    base_url: String,
    storage_key: String,
    storage: Arc<dyn KeyValueStore>,
    executor: Arc<dyn HttpExecutor>,
}

impl Transport {
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        executor: Arc<dyn HttpExecutor>,
    ) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            storage_key: config.storage_key().to_string(),
            storage,
            executor,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; relative paths are joined onto the base.
    pub fn build_url(&self, path: &str) -> Result<String, ApiError> {
        if path.is_empty() {
            return Err(ApiError::validation("API path is required"));
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        if path.starts_with('/') {
            Ok(format!("{}{path}", self.base_url))
        } else {
            Ok(format!("{}/{path}", self.base_url))
        }
    }

    /// Authorization header derived from the persisted session blob.
    ///
    /// Any read or parse failure means "no header".
    pub fn stored_auth_header(&self) -> Option<String> {
        let raw = self.storage.get(&self.storage_key).ok()??;
        let parsed: Value = serde_json::from_str(&raw).ok()?;
        let rec = RawRecord::new(&parsed);

        if let Some(token) = rec.first_truthy(&["accessToken"]) {
            let token_type = rec
                .first_truthy(&["tokenType", "token_type"])
                .map(value_to_string)
                .unwrap_or_else(|| "Bearer".to_string());
            return Some(format!(
                "{} {}",
                normalize_token_type(&token_type),
                value_to_string(token)
            ));
        }

        rec.first_truthy(&["token"])
            .map(|token| format!("Bearer {}", value_to_string(token)))
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.build_url(path)?;

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        let body = match options.body {
            Some(RequestBody::Json(value)) => {
                set_header(&mut headers, "Content-Type", "application/json");
                let encoded =
                    serde_json::to_vec(&value).map_err(|e| ApiError::Serialization(e.to_string()))?;
                Some(encoded)
            }
            Some(RequestBody::Form(encoded)) => Some(encoded.into_bytes()),
            Some(RequestBody::Bytes(bytes)) => Some(bytes),
            None => None,
        };
        for (name, value) in &options.headers {
            set_header(&mut headers, name, value);
        }

        let explicit_auth = find_header(&options.headers, "Authorization")
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if let Some(auth) = explicit_auth.or_else(|| self.stored_auth_header()) {
            set_header(&mut headers, "Authorization", &auth);
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Interpret a response: 204/empty → `Empty`, JSON → `Json`, anything
    /// else → `Text`. Non-2xx becomes [`ApiError::Http`].
    pub fn parse_response(response: HttpResponse) -> Result<ResponseBody, ApiError> {
        let payload = parse_body(response.status, response.body);
        if (200..300).contains(&response.status) {
            return Ok(payload);
        }

        let message = error_message(&payload)
            .or_else(|| status_text(response.status).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
        Err(ApiError::Http {
            status: response.status,
            message,
            payload,
        })
    }

    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        let request = self.build_request(method, path, options)?;
        debug!(method = method.as_str(), url = %request.url, "sending request");
        let response = self.executor.execute(request).await?;
        debug!(status = response.status, "received response");
        Self::parse_response(response)
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Get, path, options).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Post, path, options.body(body)).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Put, path, options.body(body)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Patch, path, options.body(body)).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<ResponseBody, ApiError> {
        self.request(HttpMethod::Delete, path, options).await
    }
}

fn parse_body(status: u16, body: String) -> ResponseBody {
    if status == 204 || body.is_empty() {
        return ResponseBody::Empty;
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => ResponseBody::Json(value),
        Err(_) => ResponseBody::Text(body),
    }
}

/// `detail`, then `message`, from a JSON error payload.
fn error_message(payload: &ResponseBody) -> Option<String> {
    let value = payload.json()?;
    let rec = RawRecord::new(value);
    rec.first_truthy(&["detail", "message"]).map(|found| match found {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

fn status_text(status: u16) -> Option<&'static str> {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
}
