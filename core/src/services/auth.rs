//! Registration, password login and token refresh.

use serde_json::{json, Map, Value};
use url::form_urlencoded;

use super::{json_or_null, require};
use crate::adapters::{normalize_auth_response, normalize_user, AuthSession, User, UserFallback, DEFAULT_ROLE};
use crate::error::ApiError;
use crate::http::{RequestBody, ResponseBody};
use crate::transport::{RequestOptions, Transport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const DEFAULT_GRANT_TYPE: &str = "password";

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub user: Option<User>,
    pub raw: ResponseBody,
}

/// OAuth2 password-grant form. `username` wins over `email` as identifier.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
    pub scope: Option<String>,
    pub grant_type: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: None,
            username: None,
            password: String::new(),
            scope: None,
            grant_type: DEFAULT_GRANT_TYPE.to_string(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl LoginForm {
    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: password.into(),
            ..Self::default()
        }
    }

    fn identifier(&self) -> Option<&str> {
        non_empty(self.username.as_deref()).or_else(|| non_empty(self.email.as_deref()))
    }

    fn encode(&self, identifier: &str) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("username", identifier);
        form.append_pair("password", &self.password);
        form.append_pair("grant_type", &self.grant_type);
        for (key, value) in [
            ("scope", &self.scope),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            if let Some(value) = non_empty(value.as_deref()) {
                form.append_pair(key, value);
            }
        }
        form.finish()
    }
}

#[derive(Clone)]
pub struct AuthService {
    transport: Transport,
}

impl AuthService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<Registration, ApiError> {
        require(&form.email, "Email")?;
        require(&form.password, "Password")?;

        let role = non_empty(form.role.as_deref()).unwrap_or(DEFAULT_ROLE);
        let mut body = Map::new();
        body.insert("email".into(), json!(form.email));
        body.insert("password".into(), json!(form.password));
        body.insert("role".into(), json!(role));
        if let Some(username) = non_empty(form.username.as_deref()) {
            body.insert("username".into(), json!(username));
        }

        let raw = self
            .transport
            .post("/auth/register", RequestBody::Json(Value::Object(body)), RequestOptions::new())
            .await?;

        let fallback = UserFallback {
            email: Some(form.email.clone()),
            username: form.username.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            role: Some(role.to_string()),
            ..UserFallback::default()
        };
        let user = normalize_user(json_or_null(&raw).get("user"), Some(&fallback));
        Ok(Registration { user, raw })
    }

    pub async fn login(&self, form: &LoginForm) -> Result<AuthSession, ApiError> {
        let identifier = form
            .identifier()
            .ok_or_else(|| ApiError::validation("Email or username is required"))?;
        require(&form.password, "Password")?;

        let body = form.encode(identifier);
        let response = self
            .transport
            .post(
                "/auth/login",
                RequestBody::Form(body),
                RequestOptions::new().header("Content-Type", FORM_CONTENT_TYPE),
            )
            .await?;

        let fallback = UserFallback {
            email: form.email.clone(),
            username: form.username.clone(),
            ..UserFallback::default()
        };
        Ok(normalize_auth_response(json_or_null(&response), Some(&fallback)))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, ApiError> {
        require(refresh_token, "Refresh token")?;
        let response = self
            .transport
            .post(
                "/auth/refresh",
                RequestBody::Json(json!({ "refresh_token": refresh_token })),
                RequestOptions::new(),
            )
            .await?;
        Ok(normalize_auth_response(json_or_null(&response), None))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
