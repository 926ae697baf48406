//! Client-side data-access layer for the SkillGig Q&A platform.
//!
//! # Overview
//! - [`Transport`] resolves URLs, attaches headers (including the stored
//!   authorization), encodes bodies and applies one failure policy to every
//!   response.
//! - [`SessionStore`] owns tokens and the cached user and writes them through
//!   to a [`KeyValueStore`] on every change.
//! - [`adapters`] turn loosely shaped backend JSON into fully defaulted
//!   records.
//! - [`services`] expose the named operations of the REST API on top of the
//!   two.
//!
//! # Design
//! - Host-does-IO at the seam: `Transport::build_request` and
//!   `Transport::parse_response` are pure, and the round-trip itself sits
//!   behind the [`HttpExecutor`] trait. [`ReqwestExecutor`] is the production
//!   implementation; tests script responses instead.
//! - Canonical records are value objects. Callers replace them, never patch
//!   fields in place.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod services;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod testing;

pub use adapters::{Answer, AuthSession, Category, ExpertProfile, PlatformStats, Question, QuestionPage, User};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, StorageError};
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, ResponseBody};
pub use services::{
    AnswerDraft, AnswerUpdate, ExpertProfileUpdate, LoginForm, QuestionDraft, QuestionFilters, QuestionUpdate,
    RegisterForm,
};
pub use session::{CurrentUserSource, Session, SessionStore, TokenSet};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{RequestOptions, Transport};
