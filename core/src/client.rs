//! `ApiClient`: one transport, one session store and every domain service.
//!
//! # Design
//! Nothing here is global. The caller builds an `ApiClient` from a config, a
//! storage backend and an executor, and clones out whatever it needs. The
//! transport and the session store share the same storage key, so tokens
//! written by `sign_in` authorize every later service call.

use std::sync::Arc;

use crate::adapters::{is_truthy, User};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::services::{
    AnswerService, AuthService, CategoryService, LoginForm, QuestionService, StatsService, UserService,
};
use crate::session::{Session, SessionStore, TokenSet};
use crate::storage::KeyValueStore;
use crate::transport::Transport;

#[derive(Clone)]
pub struct ApiClient {
    transport: Transport,
    session: Arc<SessionStore>,
    auth: AuthService,
    users: UserService,
    questions: QuestionService,
    answers: AnswerService,
    categories: CategoryService,
    stats: StatsService,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, storage: Arc<dyn KeyValueStore>, executor: Arc<dyn HttpExecutor>) -> Self {
        let transport = Transport::new(config, storage.clone(), executor);
        let session = Arc::new(SessionStore::from_config(config, storage));
        Self {
            auth: AuthService::new(transport.clone()),
            users: UserService::new(transport.clone()),
            questions: QuestionService::new(transport.clone()),
            answers: AnswerService::new(transport.clone()),
            categories: CategoryService::new(transport.clone()),
            stats: StatsService::new(transport.clone()),
            transport,
            session,
        }
    }

    /// Client backed by a default `reqwest` executor.
    pub fn with_reqwest(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        Self::new(config, storage, Arc::new(ReqwestExecutor::new()))
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn questions(&self) -> &QuestionService {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerService {
        &self.answers
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    /// Log in and adopt the grant. When the token response carries no user,
    /// the profile is fetched with the new token.
    pub async fn sign_in(&self, form: &LoginForm) -> Result<Session, ApiError> {
        let grant = self.auth.login(form).await?;
        self.session.login(&grant);

        let has_user = ["user", "profile"]
            .iter()
            .any(|key| grant.raw.get(key).is_some_and(is_truthy));
        if !has_user {
            self.session.hydrate_user(&self.users, true).await;
        }
        Ok(self.session.snapshot())
    }

    /// Exchange the stored refresh token for new token material. The cached
    /// user is kept.
    pub async fn refresh_session(&self) -> Result<Session, ApiError> {
        let refresh_token = self
            .session
            .snapshot()
            .refresh_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::validation("Refresh token is required"))?;
        let grant = self.auth.refresh(&refresh_token).await?;
        self.session.set_tokens(&TokenSet::from_auth(&grant));
        Ok(self.session.snapshot())
    }

    pub async fn hydrate_user(&self, force: bool) -> Option<User> {
        self.session.hydrate_user(&self.users, force).await
    }

    pub fn sign_out(&self) {
        self.session.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::storage::MemoryStore;
    use crate::testing::ScriptedExecutor;

    fn client(responses: Vec<HttpResponse>) -> (ApiClient, Arc<ScriptedExecutor>, Arc<MemoryStore>) {
        let executor = ScriptedExecutor::new(responses);
        let storage = Arc::new(MemoryStore::new());
        let client = ApiClient::new(&ClientConfig::new("http://api.test/v1"), storage.clone(), executor.clone());
        (client, executor, storage)
    }

    #[tokio::test]
    async fn sign_in_authorizes_later_calls() {
        let (client, executor, _) = client(vec![
            HttpResponse::new(
                200,
                r#"{"access_token":"tok","refresh_token":"ref","token_type":"bearer","expires_in":60,"user":{"id":"u1","email":"a@b.kz"}}"#,
            ),
            HttpResponse::new(200, "[]"),
        ]);
        let session = client.sign_in(&LoginForm::with_email("a@b.kz", "pw")).await.unwrap();
        assert!(session.is_authenticated);
        assert_eq!(session.user.unwrap().email, "a@b.kz");

        client.answers().fetch_my_answers().await.unwrap();
        let requests = executor.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].header("authorization"), None);
        assert_eq!(requests[1].header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn sign_in_without_user_hydrates_profile() {
        let (client, executor, _) = client(vec![
            HttpResponse::new(200, r#"{"access_token":"tok"}"#),
            HttpResponse::new(200, r#"{"id":"u7","email":"srv@x.kz","role":"expert"}"#),
        ]);
        let session = client.sign_in(&LoginForm::with_username("aru", "pw")).await.unwrap();
        let user = session.user.unwrap();
        assert_eq!(user.id.as_deref(), Some("u7"));
        assert_eq!(user.role, "expert");
        assert!(session.hydrated_at.is_some());
        assert_eq!(executor.requests()[1].url, "http://api.test/v1/users/me");
        assert_eq!(executor.requests()[1].header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn refresh_rotates_tokens_and_keeps_user() {
        let (client, executor, _) = client(vec![
            HttpResponse::new(200, r#"{"access_token":"old","refresh_token":"r1","user":{"id":"u1"}}"#),
            HttpResponse::new(200, r#"{"access_token":"new","refresh_token":"r2","expires_in":60}"#),
        ]);
        client.sign_in(&LoginForm::with_username("aru", "pw")).await.unwrap();
        let session = client.refresh_session().await.unwrap();

        assert_eq!(session.access_token.as_deref(), Some("new"));
        assert_eq!(session.refresh_token.as_deref(), Some("r2"));
        assert!(session.expires_at.is_some());
        assert_eq!(session.user.unwrap().id.as_deref(), Some("u1"));
        assert_eq!(executor.requests()[1].body_text(), Some(r#"{"refresh_token":"r1"}"#));
    }

    #[tokio::test]
    async fn refresh_without_token_is_validation_error() {
        let (client, executor, _) = client(vec![]);
        assert!(matches!(client.refresh_session().await, Err(ApiError::Validation(_))));
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn sign_out_clears_stored_header() {
        let (client, _, _) = client(vec![HttpResponse::new(200, r#"{"access_token":"tok","user":{"id":"u1"}}"#)]);
        client.sign_in(&LoginForm::with_username("aru", "pw")).await.unwrap();
        assert_eq!(client.transport().stored_auth_header().as_deref(), Some("Bearer tok"));
        client.sign_out();
        assert_eq!(client.transport().stored_auth_header(), None);
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_session_empty() {
        let (client, _, storage) = client(vec![HttpResponse::new(400, r#"{"detail":"Inactive user"}"#)]);
        let err = client.sign_in(&LoginForm::with_username("aru", "pw")).await.unwrap_err();
        assert_eq!(err.to_string(), "Inactive user");
        assert_eq!(client.session().snapshot(), Session::default());
        assert!(storage.get("skillgig_auth").unwrap().is_none());
    }
}
