//! Domain services: named operations over the [`Transport`](crate::Transport).
//!
//! Every operation validates its required inputs before a request is built,
//! so a `Validation` error always means nothing went over the wire.

pub mod answers;
pub mod auth;
pub mod categories;
pub mod questions;
pub mod stats;
pub mod users;

pub use answers::{AnswerDraft, AnswerService, AnswerUpdate};
pub use auth::{AuthService, LoginForm, RegisterForm, Registration};
pub use categories::CategoryService;
pub use questions::{QuestionDraft, QuestionFilters, QuestionService, QuestionUpdate};
pub use stats::StatsService;
pub use users::{ExpertProfileUpdate, UserService};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::ResponseBody;

/// Characters left alone by `encodeURIComponent`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode an identifier for use as one path segment.
pub(crate) fn segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

pub(crate) fn require(value: &str, what: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::validation(format!("{what} is required")));
    }
    Ok(())
}

/// Query-string builder that skips empty values and repeats list values.
#[derive(Debug, Default)]
pub(crate) struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn param(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value.map(|v| v.to_string()).filter(|v| !v.is_empty()) {
            self.pairs.push((key.to_string(), value));
        }
        self
    }

    pub(crate) fn list(mut self, key: &str, values: &[String]) -> Self {
        for value in values.iter().filter(|v| !v.is_empty()) {
            self.pairs.push((key.to_string(), value.clone()));
        }
        self
    }

    /// `?a=1&b=2`, or the empty string when nothing survived.
    pub(crate) fn encode(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        format!("?{}", serializer.finish())
    }
}

/// Records of a listing that answers with a bare array.
pub(crate) fn array_items(body: &ResponseBody) -> &[Value] {
    body.json()
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Records of a listing that answers with either a bare array or `{items}`.
pub(crate) fn listing_items(body: &ResponseBody) -> &[Value] {
    let Some(value) = body.json() else {
        return &[];
    };
    value
        .as_array()
        .or_else(|| value.get("items").and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub(crate) fn json_or_null(body: &ResponseBody) -> &Value {
    static NULL: Value = Value::Null;
    body.json().unwrap_or(&NULL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_omits_empty_values() {
        let query = Query::new()
            .param("limit", Some(20))
            .param("category", None::<String>)
            .param("difficulty", Some(""))
            .param("status_filter", Some("published"));
        assert_eq!(query.encode(), "?limit=20&status_filter=published");
    }

    #[test]
    fn query_repeats_list_values() {
        let tags = vec!["rust".to_string(), String::new(), "async io".to_string()];
        let query = Query::new().list("tags", &tags);
        assert_eq!(query.encode(), "?tags=rust&tags=async+io");
    }

    #[test]
    fn empty_query_is_empty_string() {
        assert_eq!(Query::new().param("x", None::<u32>).encode(), "");
    }

    #[test]
    fn segment_matches_uri_component_encoding() {
        assert_eq!(segment("abc-123_x.y"), "abc-123_x.y");
        assert_eq!(segment("a b/c?"), "a%20b%2Fc%3F");
        assert_eq!(segment("қ"), "%D2%9B");
    }

    #[test]
    fn require_rejects_empty() {
        assert!(matches!(require("", "Question ID"), Err(ApiError::Validation(_))));
        assert!(require("q1", "Question ID").is_ok());
    }

    #[test]
    fn listing_accepts_array_or_envelope() {
        let array = ResponseBody::Json(json!([{"id": 1}]));
        let envelope = ResponseBody::Json(json!({"items": [{"id": 1}, {"id": 2}]}));
        assert_eq!(listing_items(&array).len(), 1);
        assert_eq!(listing_items(&envelope).len(), 2);
        assert!(listing_items(&ResponseBody::Empty).is_empty());
        assert!(array_items(&envelope).is_empty());
    }
}
