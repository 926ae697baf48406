//! User, expert profile and auth-response adapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{is_truthy, parse_skills, to_number, value_to_string, RawRecord};

/// Role assumed when neither the payload nor the fallback names one.
pub const DEFAULT_ROLE: &str = "client";

/// Canonical identity record.
///
/// `is_active`, `created_at` and `expert_profile` are only filled by the
/// profile endpoints; plain auth payloads leave them empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: Option<String>,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub role: String,
    pub avatar: Option<String>,
    pub answers_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert_profile: Option<ExpertProfile>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: None,
            email: String::new(),
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            name: String::new(),
            role: DEFAULT_ROLE.to_string(),
            avatar: None,
            answers_count: 0,
            is_active: None,
            created_at: None,
            expert_profile: None,
        }
    }
}

/// Values the caller already knows (e.g. the submitted registration form),
/// consulted after every alias in the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFallback {
    pub id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
    pub answers_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpertProfile {
    pub full_name: Option<String>,
    pub bio: String,
    pub primary_role: String,
    pub skills: Vec<String>,
    pub github_url: String,
    pub linkedin_url: String,
    pub portfolio_url: String,
    pub experience_years: i64,
    pub average_rating: f64,
    pub resolved_questions: i64,
}

/// Token material and user extracted from a login/refresh response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    /// Lifetime in seconds, as sent by the server.
    pub expires_in: Option<i64>,
    /// Absolute expiry in epoch milliseconds; takes precedence over `expires_in`.
    pub expires_at: Option<i64>,
    pub user: Option<User>,
    pub raw: Value,
}

pub fn normalize_user(raw: Option<&Value>, fallback: Option<&UserFallback>) -> Option<User> {
    let raw = raw.filter(|value| is_truthy(value));
    if raw.is_none() && fallback.is_none() {
        return None;
    }

    let null = Value::Null;
    let source = RawRecord::new(raw.unwrap_or(&null));
    let default_fallback = UserFallback::default();
    let fallback = fallback.unwrap_or(&default_fallback);

    let first_name = source
        .string(&["first_name", "firstName"])
        .or_else(|| fallback.first_name.clone())
        .unwrap_or_default();
    let last_name = source
        .string(&["last_name", "lastName"])
        .or_else(|| fallback.last_name.clone())
        .unwrap_or_default();
    let name = source.string(&["name"]).unwrap_or_else(|| {
        let joined = [first_name.as_str(), last_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            fallback.name.clone().unwrap_or_default()
        } else {
            joined
        }
    });

    let answers_count = match source.first(&["answers_count", "answersCount"]) {
        Some(value) => to_number(Some(value), 0.0) as i64,
        None => fallback.answers_count.unwrap_or(0),
    };

    Some(User {
        id: source.string(&["id", "user_id"]).or_else(|| fallback.id.clone()),
        email: source
            .string(&["email"])
            .or_else(|| fallback.email.clone())
            .unwrap_or_default(),
        username: source
            .string(&["username", "login"])
            .or_else(|| fallback.username.clone())
            .unwrap_or_default(),
        first_name,
        last_name,
        name,
        role: source
            .string(&["role"])
            .or_else(|| fallback.role.clone())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        avatar: source.string(&["avatar", "image"]).or_else(|| fallback.avatar.clone()),
        answers_count,
        ..User::default()
    })
}

/// Profile endpoints: the user record plus activity flags and expert profile.
pub fn normalize_user_with_profile(payload: &Value) -> Option<User> {
    if !is_truthy(payload) {
        return None;
    }
    let mut user = normalize_user(Some(payload), None)?;
    let rec = RawRecord::new(payload);

    user.answers_count = rec.count_or(&["answers_count", "answersCount"], user.answers_count);
    user.is_active = rec.first(&["is_active", "isActive"]).map(is_truthy);
    user.created_at = rec.string(&["created_at", "createdAt"]);
    user.expert_profile = rec
        .first(&["expert_profile", "expertProfile"])
        .and_then(normalize_expert_profile);
    Some(user)
}

pub fn normalize_expert_profile(raw: &Value) -> Option<ExpertProfile> {
    if !is_truthy(raw) {
        return None;
    }
    let rec = RawRecord::new(raw);
    Some(ExpertProfile {
        full_name: rec.string(&["full_name", "fullName"]),
        bio: rec.text_or(&["bio"], ""),
        primary_role: rec.text_or(&["primary_role", "primaryRole"], ""),
        skills: parse_skills(rec.first(&["skills"])),
        github_url: rec.text_or(&["github_url", "githubUrl"], ""),
        linkedin_url: rec.text_or(&["linkedin_url", "linkedinUrl"], ""),
        portfolio_url: rec.text_or(&["portfolio_url", "portfolioUrl"], ""),
        experience_years: rec.count_or(&["experience_years", "experienceYears"], 0),
        average_rating: rec.number_or(&["average_rating", "averageRating"], 0.0),
        resolved_questions: rec.count_or(&["resolved_questions", "resolvedQuestions"], 0),
    })
}

pub fn normalize_auth_response(payload: &Value, fallback_user: Option<&UserFallback>) -> AuthSession {
    let rec = RawRecord::new(payload);
    let access_token = rec
        .first(&["access_token", "token", "accessToken"])
        .map(value_to_string);
    let token_type = rec
        .string(&["token_type", "tokenType"])
        .or_else(|| access_token.as_ref().map(|_| "Bearer".to_string()));

    AuthSession {
        refresh_token: rec.string(&["refresh_token", "refreshToken"]),
        token_type,
        expires_in: rec
            .first(&["expires_in", "expiresIn"])
            .map(|value| to_number(Some(value), 0.0) as i64),
        expires_at: None,
        user: normalize_user(rec.first(&["user", "profile"]), fallback_user),
        access_token,
        raw: payload.clone(),
    }
}
