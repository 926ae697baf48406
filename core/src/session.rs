//! Authentication session: tokens, cached user, durable write-through.
//!
//! # Design
//! `SessionStore` is constructed explicitly and shared through `Arc`; there
//! is no ambient global. Every mutation persists the whole session
//! synchronously before returning. Writes are never batched, so the storage
//! always reflects the last completed mutation.
//!
//! `hydrate_user` is the only async operation. An atomic in-flight flag makes
//! overlapping calls return `None` immediately instead of issuing a second
//! profile fetch; there is no waiter queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::adapters::{AuthSession, User};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::storage::KeyValueStore;

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Any casing of `bearer` becomes `Bearer`; other schemes pass through.
pub fn normalize_token_type(token_type: &str) -> String {
    if token_type.eq_ignore_ascii_case("bearer") {
        DEFAULT_TOKEN_TYPE.to_string()
    } else {
        token_type.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Epoch milliseconds.
    pub expires_at: Option<i64>,
    pub is_authenticated: bool,
    /// Epoch milliseconds of the last successful user fetch.
    pub hydrated_at: Option<i64>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            access_token: None,
            refresh_token: None,
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            expires_at: None,
            is_authenticated: false,
            hydrated_at: None,
        }
    }
}

impl Session {
    /// `"<TokenType> <accessToken>"` when both are present.
    pub fn auth_header(&self) -> Option<String> {
        let token = self.access_token.as_deref().filter(|t| !t.is_empty())?;
        if self.token_type.is_empty() {
            return None;
        }
        Some(format!("{} {token}", normalize_token_type(&self.token_type)))
    }

    fn has_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Replacement token material after a refresh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenSet {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<i64>,
}

impl TokenSet {
    /// Token material of a login/refresh response, with `expires_in`
    /// resolved against the current time.
    pub fn from_auth(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            token_type: session.token_type.clone(),
            expires_at: resolve_expiry(session.expires_at, session.expires_in),
        }
    }
}

/// Source of the current user's profile for [`SessionStore::hydrate_user`].
#[async_trait]
pub trait CurrentUserSource: Send + Sync {
    async fn fetch_current_user(&self, authorization: &str) -> Result<Option<User>, ApiError>;
}

/// On-disk shape. `token` duplicates `accessToken` for older readers.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersistedSession {
    user: Option<User>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_at: Option<i64>,
    is_authenticated: bool,
    token: Option<String>,
    hydrated_at: Option<i64>,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            token_type: Some(session.token_type.clone()),
            expires_at: session.expires_at,
            is_authenticated: session.is_authenticated,
            token: session.access_token.clone(),
            hydrated_at: session.hydrated_at,
        }
    }
}

impl From<PersistedSession> for Session {
    fn from(persisted: PersistedSession) -> Self {
        let access_token = persisted.access_token.or(persisted.token);
        let has_token = access_token.as_deref().is_some_and(|t| !t.is_empty());
        Self {
            user: persisted.user,
            access_token,
            refresh_token: persisted.refresh_token,
            token_type: persisted
                .token_type
                .filter(|t| !t.is_empty())
                .map(|t| normalize_token_type(&t))
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            expires_at: persisted.expires_at,
            is_authenticated: persisted.is_authenticated && has_token,
            hydrated_at: persisted.hydrated_at,
        }
    }
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    state: Mutex<Session>,
    fetching_user: AtomicBool,
}

impl SessionStore {
    /// Rehydrate from `storage[key]`. Absent, unreadable or malformed data
    /// yields the empty session.
    pub fn load(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let session = read_session(storage.as_ref(), &key);
        Self {
            storage,
            key,
            state: Mutex::new(session),
            fetching_user: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        Self::load(storage, config.storage_key())
    }

    pub fn snapshot(&self) -> Session {
        self.state().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state().access_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    pub fn auth_header(&self) -> Option<String> {
        self.state().auth_header()
    }

    pub fn is_fetching_user(&self) -> bool {
        self.fetching_user.load(Ordering::Acquire)
    }

    /// Adopt the user and tokens of a successful login.
    pub fn login(&self, grant: &AuthSession) {
        self.mutate(|session| {
            let now = now_millis();
            session.user = grant.user.clone();
            session.access_token = grant.access_token.clone();
            session.refresh_token = grant.refresh_token.clone();
            session.token_type =
                normalize_token_type(grant.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE));
            session.expires_at = resolve_expiry(grant.expires_at, grant.expires_in);
            session.is_authenticated = session.has_token();
            if grant.user.is_some() {
                session.hydrated_at = Some(now);
            }
        });
    }

    /// Rotate token material without touching the cached user.
    pub fn set_tokens(&self, tokens: &TokenSet) {
        self.mutate(|session| {
            session.access_token = tokens.access_token.clone();
            session.refresh_token = tokens.refresh_token.clone();
            session.token_type =
                normalize_token_type(tokens.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE));
            session.expires_at = tokens.expires_at;
            session.is_authenticated = session.has_token();
        });
    }

    /// Replace the cached user; authenticated only with both a user and a token.
    pub fn update_user(&self, user: Option<User>) {
        self.mutate(|session| {
            session.is_authenticated = user.is_some() && session.has_token();
            session.user = user;
        });
    }

    /// Fetch and cache the current user.
    ///
    /// Returns `None` without a request when there is no token or another
    /// hydration is in flight, and the cached user when one exists and
    /// `force` is false. Fetch failures are logged and yield `None`; the
    /// session is left untouched.
    pub async fn hydrate_user(&self, source: &dyn CurrentUserSource, force: bool) -> Option<User> {
        let (authorization, cached) = {
            let session = self.state();
            (session.auth_header(), session.user.clone())
        };
        let authorization = authorization?;

        if self.is_fetching_user() {
            return None;
        }
        if let Some(user) = cached.filter(|_| !force) {
            return Some(user);
        }
        if self
            .fetching_user
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _in_flight = InFlight(&self.fetching_user);

        match source.fetch_current_user(&authorization).await {
            Ok(Some(profile)) => {
                self.mutate(|session| {
                    session.user = Some(profile.clone());
                    session.is_authenticated = session.has_token();
                    session.hydrated_at = Some(now_millis());
                });
                Some(profile)
            }
            Ok(None) => None,
            Err(err) => {
                error!(error = %err, "auth hydrate failed");
                None
            }
        }
    }

    /// Reset to the empty session and overwrite the stored blob with it.
    pub fn logout(&self) {
        self.mutate(|session| *session = Session::default());
    }

    /// Write the current session to storage.
    pub fn persist(&self) {
        let session = self.state();
        self.write_through(&session);
    }

    fn state(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, apply: impl FnOnce(&mut Session)) {
        let mut session = self.state();
        apply(&mut session);
        self.write_through(&session);
    }

    fn write_through(&self, session: &Session) {
        let encoded = match serde_json::to_string(&PersistedSession::from(session)) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "failed to encode session");
                return;
            }
        };
        if let Err(err) = self.storage.set(&self.key, &encoded) {
            warn!(error = %err, key = %self.key, "failed to persist session");
        }
    }
}

/// Clears the in-flight flag however the fetch ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn read_session(storage: &dyn KeyValueStore, key: &str) -> Session {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Session::default(),
        Err(err) => {
            warn!(error = %err, key, "failed to read stored session");
            return Session::default();
        }
    };
    match serde_json::from_str::<PersistedSession>(&raw) {
        Ok(persisted) => persisted.into(),
        Err(err) => {
            warn!(error = %err, key, "ignoring malformed stored session");
            Session::default()
        }
    }
}

fn resolve_expiry(expires_at: Option<i64>, expires_in: Option<i64>) -> Option<i64> {
    expires_at.or_else(|| {
        expires_in
            .filter(|seconds| *seconds != 0)
            .map(|seconds| now_millis() + seconds * 1000)
    })
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
