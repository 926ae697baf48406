//! Error types for the SkillGig client.
//!
//! # Design
//! `Http` is the single shape for a non-2xx response: every service surfaces
//! it unchanged, carrying the status code and whatever body the server sent.
//! `Validation` is raised before a request is built, `NotFound` only when every
//! candidate of a fallback lookup answered 404/405.

use thiserror::Error;

use crate::http::ResponseBody;

/// Errors returned by the transport and the domain services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required caller input was missing; no request was issued.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        payload: ResponseBody,
    },

    /// Every candidate endpoint of a by-id lookup returned 404/405.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body did not have the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

/// Errors raised by a [`KeyValueStore`](crate::storage::KeyValueStore).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_its_message() {
        let err = ApiError::Http {
            status: 400,
            message: "Email already registered".to_string(),
            payload: ResponseBody::Empty,
        };
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn non_http_errors_have_no_status() {
        assert_eq!(ApiError::validation("Question ID is required").status(), None);
        assert_eq!(ApiError::NotFound("user".into()).status(), None);
    }
}
