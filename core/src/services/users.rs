//! Current user, expert profiles and user lookup.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{array_items, json_or_null, require, segment};
use crate::adapters::{is_truthy, normalize_expert_profile, normalize_user_with_profile, ExpertProfile, User};
use crate::error::ApiError;
use crate::http::RequestBody;
use crate::session::CurrentUserSource;
use crate::transport::{RequestOptions, Transport};

/// Body of `PUT /users/me/profile`; always sent in full.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpertProfileUpdate {
    pub full_name: String,
    pub bio: String,
    pub primary_role: String,
    pub skills: Vec<String>,
    pub github_url: String,
    pub linkedin_url: String,
    pub portfolio_url: String,
    pub experience_years: i64,
}

#[derive(Clone)]
pub struct UserService {
    transport: Transport,
}

impl UserService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// `GET /users/me`. An explicit `authorization` overrides the stored one.
    pub async fn fetch_current_user(&self, authorization: Option<&str>) -> Result<Option<User>, ApiError> {
        let mut options = RequestOptions::new();
        if let Some(authorization) = authorization {
            options = options.header("Authorization", authorization);
        }
        let body = self.transport.get("/users/me", options).await?;
        Ok(normalize_user_with_profile(json_or_null(&body)))
    }

    /// Returns the profile the server echoed back, or the one that was sent
    /// when the response carried no body.
    pub async fn update_expert_profile(
        &self,
        update: &ExpertProfileUpdate,
    ) -> Result<Option<ExpertProfile>, ApiError> {
        let sent = serde_json::to_value(update).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let body = self
            .transport
            .put("/users/me/profile", RequestBody::Json(sent.clone()), RequestOptions::new())
            .await?;
        let echoed = body.json().filter(|value| is_truthy(value)).unwrap_or(&sent);
        Ok(normalize_expert_profile(echoed))
    }

    pub async fn fetch_experts(&self) -> Result<Vec<User>, ApiError> {
        let body = self.transport.get("/users/experts", RequestOptions::new()).await?;
        Ok(array_items(&body)
            .iter()
            .filter_map(normalize_user_with_profile)
            .collect())
    }

    /// Tries `/users/profile/{id}` then `/users/{id}`. Only 404/405 moves on
    /// to the next candidate; any other failure is returned as is.
    pub async fn fetch_user_by_id(&self, user_id: &str) -> Result<Option<User>, ApiError> {
        require(user_id, "User ID")?;
        let id = segment(user_id);
        let candidates = [format!("/users/profile/{id}"), format!("/users/{id}")];

        for path in &candidates {
            match self.transport.get(path, RequestOptions::new()).await {
                Ok(body) => return Ok(normalize_user_with_profile(json_or_null(&body))),
                Err(err) if matches!(err.status(), Some(404 | 405)) => {
                    debug!(path = %path, status = ?err.status(), "user lookup candidate missed");
                }
                Err(err) => return Err(err),
            }
        }
        Err(ApiError::NotFound(format!("user {user_id}")))
    }
}

#[async_trait]
impl CurrentUserSource for UserService {
    async fn fetch_current_user(&self, authorization: &str) -> Result<Option<User>, ApiError> {
        UserService::fetch_current_user(self, Some(authorization)).await
    }
}
