//! In-memory SkillGig API used by integration tests and local development.
//!
//! Everything lives in one `RwLock`-guarded [`Store`]; nothing is persisted.
//! Responses are snake_case JSON, errors are `{"detail": ...}`. Bearer tokens
//! are opaque random strings mapped to user ids.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const API_PREFIX: &str = "/api/v1";
pub const ACCESS_TOKEN_TTL_SECS: i64 = 30 * 60;
const DEFAULT_LIST_LIMIT: usize = 20;
const ANONYMOUS: &str = "Anonymous";

const CATEGORY_SEED: [(&str, &str, &str); 8] = [
    ("web-development", "Web Development", "🌐"),
    ("mobile-development", "Mobile Development", "📱"),
    ("ui-ux-design", "UI/UX Design", "🎨"),
    ("backend-database", "Backend/Database", "💾"),
    ("ai-ml", "AI/ML", "🤖"),
    ("devops", "DevOps", "🔧"),
    ("game-development", "Game Development", "🎮"),
    ("security-blockchain", "Security/Blockchain", "🔐"),
];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpertProfile {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub primary_role: Option<String>,
    pub skills: Vec<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub experience_years: i64,
    pub average_rating: f64,
    pub resolved_questions: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserOut {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expert_profile: Option<ExpertProfile>,
    pub answers_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub username: Option<String>,
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: UserOut,
}

/// OAuth2 password-grant form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub grant_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserOut,
}

/// Unset fields leave the stored value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub primary_role: Option<String>,
    pub skills: Option<Vec<String>>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub experience_years: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCreate {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default, alias = "code_example")]
    pub code_example: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, alias = "code_link")]
    pub code_link: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "code_example")]
    pub code_example: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub tags: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
    #[serde(alias = "code_link")]
    pub code_link: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionOut {
    pub id: String,
    pub title: String,
    pub description: String,
    pub code_example: Option<String>,
    pub category: String,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub links: Vec<String>,
    pub code_link: Option<String>,
    pub deadline: Option<String>,
    pub status: String,
    pub client_id: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_role: Option<String>,
    pub client_profile: Option<ExpertProfile>,
    pub answers_count: usize,
    pub is_solved: bool,
    pub accepted_answer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionList {
    pub total: usize,
    pub items: Vec<QuestionOut>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCreate {
    #[serde(alias = "answer_text")]
    pub answer_text: String,
    #[serde(default, alias = "code_example")]
    pub code_example: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerUpdate {
    #[serde(alias = "answer_text")]
    pub answer_text: Option<String>,
    #[serde(alias = "code_example")]
    pub code_example: Option<String>,
    pub links: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInput {
    #[serde(alias = "is_correct")]
    pub is_correct: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerOut {
    pub id: String,
    pub question_id: String,
    pub question_title: Option<String>,
    pub author_id: String,
    pub author_answers_count: usize,
    pub author_email: Option<String>,
    pub author_role: Option<String>,
    pub author_profile: Option<ExpertProfile>,
    pub answer_text: String,
    pub code_example: Option<String>,
    pub links: Vec<String>,
    pub expert_name: String,
    pub expert_rating: f64,
    pub is_accepted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub total_questions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_questions: usize,
    pub total_experts: usize,
    pub success_rate: f64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error response rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    detail: String,
}

impl HttpError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    fn forbidden(detail: &str) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    fn bad_request(detail: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    fn unauthorized(detail: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = Result<T, HttpError>;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct UserRecord {
    id: String,
    email: String,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    role: String,
    password: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    expert_profile: Option<ExpertProfile>,
}

#[derive(Clone, Debug)]
struct QuestionRecord {
    id: String,
    title: String,
    description: String,
    code_example: Option<String>,
    category: String,
    difficulty: Option<String>,
    tags: Vec<String>,
    links: Vec<String>,
    deadline: Option<String>,
    status: String,
    client_id: String,
    accepted_answer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
struct AnswerRecord {
    id: String,
    question_id: String,
    author_id: String,
    answer_text: String,
    code_example: Option<String>,
    links: Vec<String>,
    expert_name: String,
    expert_rating: f64,
    is_accepted: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Store {
    users: HashMap<String, UserRecord>,
    /// Insertion order is creation order.
    questions: Vec<QuestionRecord>,
    answers: Vec<AnswerRecord>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Store>>;

impl Store {
    fn authenticate(&self, headers: &HeaderMap) -> ApiResult<String> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .ok_or_else(|| HttpError::unauthorized("Not authenticated"))?;
        let user_id = self
            .access_tokens
            .get(token)
            .ok_or_else(|| HttpError::unauthorized("Could not validate credentials"))?;
        match self.users.get(user_id) {
            Some(user) if user.is_active => Ok(user.id.clone()),
            Some(_) => Err(HttpError::bad_request("Inactive user")),
            None => Err(HttpError::unauthorized("User not found")),
        }
    }

    fn find_by_identifier(&self, identifier: &str) -> Option<&UserRecord> {
        let lowered = identifier.to_lowercase();
        self.users
            .values()
            .find(|user| user.email == lowered || user.username.as_deref() == Some(identifier))
    }

    fn issue_tokens(&mut self, user_id: &str) -> (String, String) {
        let access = format!("access-{}", Uuid::new_v4());
        let refresh = format!("refresh-{}", Uuid::new_v4());
        self.access_tokens.insert(access.clone(), user_id.to_string());
        self.refresh_tokens.insert(refresh.clone(), user_id.to_string());
        (access, refresh)
    }

    fn token_response(&mut self, user_id: &str) -> ApiResult<TokenResponse> {
        let (access_token, refresh_token) = self.issue_tokens(user_id);
        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_TTL_SECS,
            user: self.user_out(user_id)?,
        })
    }

    fn user(&self, user_id: &str) -> ApiResult<&UserRecord> {
        self.users.get(user_id).ok_or_else(|| HttpError::not_found("User"))
    }

    fn question_index(&self, question_id: &str) -> ApiResult<usize> {
        self.questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| HttpError::not_found("Question"))
    }

    fn answer_index(&self, question_id: &str, answer_id: &str) -> ApiResult<usize> {
        self.answers
            .iter()
            .position(|a| a.id == answer_id && a.question_id == question_id)
            .ok_or_else(|| HttpError::not_found("Answer"))
    }

    fn answers_by(&self, user_id: &str) -> usize {
        self.answers.iter().filter(|a| a.author_id == user_id).count()
    }

    fn user_out(&self, user_id: &str) -> ApiResult<UserOut> {
        let user = self.user(user_id)?;
        Ok(UserOut {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
            expert_profile: user.expert_profile.clone(),
            answers_count: self.answers_by(user_id),
        })
    }

    fn question_out(&self, question: &QuestionRecord) -> QuestionOut {
        let client = self.users.get(&question.client_id);
        QuestionOut {
            id: question.id.clone(),
            title: question.title.clone(),
            description: question.description.clone(),
            code_example: question.code_example.clone(),
            category: question.category.clone(),
            difficulty: question.difficulty.clone(),
            tags: question.tags.clone(),
            links: question.links.clone(),
            code_link: question.links.first().cloned(),
            deadline: question.deadline.clone(),
            status: question.status.clone(),
            client_id: question.client_id.clone(),
            client_name: display_name(client),
            client_email: client.map(|c| c.email.clone()),
            client_role: client.map(|c| c.role.clone()),
            client_profile: client.and_then(|c| c.expert_profile.clone()),
            answers_count: self.answers.iter().filter(|a| a.question_id == question.id).count(),
            is_solved: matches!(question.status.as_str(), "resolved" | "closed")
                || question.accepted_answer_id.is_some(),
            accepted_answer_id: question.accepted_answer_id.clone(),
            created_at: question.created_at,
            updated_at: question.updated_at,
        }
    }

    fn answer_out(&self, answer: &AnswerRecord) -> AnswerOut {
        let author = self.users.get(&answer.author_id);
        AnswerOut {
            id: answer.id.clone(),
            question_id: answer.question_id.clone(),
            question_title: self
                .questions
                .iter()
                .find(|q| q.id == answer.question_id)
                .map(|q| q.title.clone()),
            author_id: answer.author_id.clone(),
            author_answers_count: self.answers_by(&answer.author_id),
            author_email: author.map(|a| a.email.clone()),
            author_role: author.map(|a| a.role.clone()),
            author_profile: author.and_then(|a| a.expert_profile.clone()),
            answer_text: answer.answer_text.clone(),
            code_example: answer.code_example.clone(),
            links: answer.links.clone(),
            expert_name: answer.expert_name.clone(),
            expert_rating: answer.expert_rating,
            is_accepted: answer.is_accepted,
            created_at: answer.created_at,
        }
    }

    fn adjust_resolved(&mut self, user_id: &str, delta: i64) {
        if let Some(user) = self.users.get_mut(user_id) {
            let profile = user.expert_profile.get_or_insert_with(ExpertProfile::default);
            profile.resolved_questions = (profile.resolved_questions + delta).max(0);
        }
    }

    /// Re-point the question at another accepted answer, or reopen it.
    fn reassign_acceptance(&mut self, question_index: usize) {
        let question_id = self.questions[question_index].id.clone();
        let replacement = self
            .answers
            .iter()
            .find(|a| a.question_id == question_id && a.is_accepted)
            .map(|a| a.id.clone());
        let question = &mut self.questions[question_index];
        match replacement {
            Some(id) => {
                question.accepted_answer_id = Some(id);
                question.status = "resolved".to_string();
            }
            None => {
                question.accepted_answer_id = None;
                question.status = "published".to_string();
            }
        }
    }
}

fn display_name(user: Option<&UserRecord>) -> String {
    let Some(user) = user else {
        return ANONYMOUS.to_string();
    };
    let full_name = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        return full_name;
    }
    user.username
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| user.email.clone())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn with_code_link(mut links: Vec<String>, code_link: Option<String>) -> Vec<String> {
    if let Some(link) = code_link.filter(|link| !link.is_empty()) {
        if !links.contains(&link) {
            links.insert(0, link);
        }
    }
    links
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/users/me", get(current_user))
        .route("/users/me/profile", put(update_profile))
        .route("/users/me/questions", get(my_questions))
        .route("/users/me/answers", get(my_answers))
        .route("/users/experts", get(list_experts))
        // Only the short lookup path is served; clients asking for
        // `/users/profile/{id}` get a 404 and must fall back.
        .route("/users/{id}", get(get_user))
        .route("/categories", get(list_categories))
        .route("/questions/", get(list_questions).post(create_question))
        .route(
            "/questions/{id}",
            get(get_question).put(update_question).delete(delete_question),
        )
        .route("/questions/{id}/answers", get(list_answers).post(create_answer))
        .route(
            "/questions/{id}/answers/{answer_id}",
            put(update_answer).delete(delete_answer),
        )
        .route("/questions/{id}/answers/{answer_id}/verify", post(verify_answer))
        .route("/stats", get(platform_stats));
    Router::new().nest(API_PREFIX, api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn register(
    State(db): State<Db>,
    Json(input): Json<RegisterInput>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    if input.email.is_empty() || input.password.is_empty() {
        return Err(HttpError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "email and password are required",
        ));
    }
    let mut store = db.write().await;
    let email = input.email.to_lowercase();
    let taken = store.users.values().any(|user| {
        user.email == email || (input.username.is_some() && user.username == input.username)
    });
    if taken {
        return Err(HttpError::bad_request("User with this email or username already exists"));
    }

    let role = input.role.filter(|r| !r.is_empty()).unwrap_or_else(|| "client".to_string());
    let full_name = [input.first_name.as_deref(), input.last_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let expert_profile = (role == "expert" && !full_name.is_empty()).then(|| ExpertProfile {
        full_name: Some(full_name),
        primary_role: Some("expert".to_string()),
        ..ExpertProfile::default()
    });

    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        email,
        username: input.username,
        first_name: input.first_name,
        last_name: input.last_name,
        role,
        password: input.password,
        is_active: true,
        created_at: Utc::now(),
        expert_profile,
    };
    let id = user.id.clone();
    debug!(user_id = %id, email = %user.email, "registered user");
    store.users.insert(id.clone(), user);

    Ok((StatusCode::CREATED, Json(RegisterResponse { user: store.user_out(&id)? })))
}

async fn login(State(db): State<Db>, Form(form): Form<LoginForm>) -> ApiResult<Json<TokenResponse>> {
    if form.grant_type.as_deref().is_some_and(|grant| grant != "password") {
        return Err(HttpError::bad_request("Unsupported grant type"));
    }
    let mut store = db.write().await;
    let user = store
        .find_by_identifier(&form.username)
        .filter(|user| user.password == form.password)
        .ok_or_else(|| HttpError::bad_request("Incorrect username or password"))?;
    if !user.is_active {
        return Err(HttpError::bad_request("Inactive user"));
    }
    let user_id = user.id.clone();
    Ok(Json(store.token_response(&user_id)?))
}

async fn refresh(State(db): State<Db>, Json(input): Json<RefreshInput>) -> ApiResult<Json<TokenResponse>> {
    let mut store = db.write().await;
    let user_id = store
        .refresh_tokens
        .remove(&input.refresh_token)
        .ok_or_else(|| HttpError::unauthorized("Invalid refresh token"))?;
    Ok(Json(store.token_response(&user_id)?))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn current_user(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<UserOut>> {
    let store = db.read().await;
    let user_id = store.authenticate(&headers)?;
    Ok(Json(store.user_out(&user_id)?))
}

async fn update_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<ExpertProfile>> {
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    let user = store
        .users
        .get_mut(&user_id)
        .ok_or_else(|| HttpError::not_found("User"))?;
    let profile = user.expert_profile.get_or_insert_with(ExpertProfile::default);

    if update.full_name.is_some() {
        profile.full_name = update.full_name;
    }
    if update.bio.is_some() {
        profile.bio = update.bio;
    }
    if update.primary_role.is_some() {
        profile.primary_role = update.primary_role;
    }
    if let Some(skills) = update.skills {
        profile.skills = clean_list(skills);
    }
    if update.github_url.is_some() {
        profile.github_url = update.github_url;
    }
    if update.linkedin_url.is_some() {
        profile.linkedin_url = update.linkedin_url;
    }
    if update.portfolio_url.is_some() {
        profile.portfolio_url = update.portfolio_url;
    }
    if let Some(years) = update.experience_years {
        profile.experience_years = years;
    }
    Ok(Json(profile.clone()))
}

async fn list_experts(State(db): State<Db>) -> ApiResult<Json<Vec<UserOut>>> {
    let store = db.read().await;
    let mut ids: Vec<&UserRecord> = store
        .users
        .values()
        .filter(|u| u.is_active && (u.role == "expert" || u.expert_profile.is_some()))
        .collect();
    ids.sort_by_key(|u| u.created_at);
    let experts = ids
        .into_iter()
        .map(|u| store.user_out(&u.id))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(experts))
}

async fn get_user(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<UserOut>> {
    let store = db.read().await;
    Ok(Json(store.user_out(&id)?))
}

async fn my_questions(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<QuestionOut>>> {
    let store = db.read().await;
    let user_id = store.authenticate(&headers)?;
    let questions = store
        .questions
        .iter()
        .rev()
        .filter(|q| q.client_id == user_id)
        .map(|q| store.question_out(q))
        .collect();
    Ok(Json(questions))
}

async fn my_answers(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<AnswerOut>>> {
    let store = db.read().await;
    let user_id = store.authenticate(&headers)?;
    let answers = store
        .answers
        .iter()
        .rev()
        .filter(|a| a.author_id == user_id)
        .map(|a| store.answer_out(a))
        .collect();
    Ok(Json(answers))
}

// ---------------------------------------------------------------------------
// Catalogue and stats
// ---------------------------------------------------------------------------

async fn list_categories(State(db): State<Db>) -> Json<Vec<Category>> {
    let store = db.read().await;
    let categories = CATEGORY_SEED
        .iter()
        .map(|(id, name, icon)| Category {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            description: String::new(),
            total_questions: store.questions.iter().filter(|q| q.category == *name).count(),
        })
        .collect();
    Json(categories)
}

async fn platform_stats(State(db): State<Db>) -> Json<PlatformStats> {
    let store = db.read().await;
    let total = store.questions.len();
    let resolved = store.questions.iter().filter(|q| q.status == "resolved").count();
    let success_rate = if total == 0 {
        0.0
    } else {
        ((resolved as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
    };
    Json(PlatformStats {
        total_questions: total,
        total_experts: store.users.len(),
        success_rate,
    })
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

async fn list_questions(
    State(db): State<Db>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<QuestionList> {
    let mut limit = DEFAULT_LIST_LIMIT;
    let mut offset = 0;
    let mut category = None;
    let mut difficulty = None;
    let mut status = Some("published".to_string());
    let mut tags = Vec::new();
    for (key, value) in params {
        match key.as_str() {
            "limit" => limit = value.parse().unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 100),
            "offset" => offset = value.parse().unwrap_or(0),
            "category" => category = Some(value),
            "difficulty" => difficulty = Some(value),
            "status_filter" => status = Some(value),
            "tags" if !value.is_empty() => tags.push(value.to_lowercase()),
            _ => {}
        }
    }

    let store = db.read().await;
    let matching: Vec<&QuestionRecord> = store
        .questions
        .iter()
        .rev()
        .filter(|q| category.as_ref().map_or(true, |c| c.is_empty() || &q.category == c))
        .filter(|q| {
            difficulty
                .as_ref()
                .map_or(true, |d| d.is_empty() || q.difficulty.as_ref() == Some(d))
        })
        .filter(|q| match status.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("") | Some("all") => true,
            Some("published") => matches!(q.status.as_str(), "published" | "resolved"),
            Some(_) => Some(q.status.as_str()) == status.as_deref(),
        })
        .filter(|q| {
            tags.iter()
                .all(|tag| q.tags.iter().any(|existing| existing.to_lowercase() == *tag))
        })
        .collect();

    Json(QuestionList {
        total: matching.len(),
        items: matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|q| store.question_out(q))
            .collect(),
    })
}

async fn create_question(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<QuestionCreate>,
) -> ApiResult<(StatusCode, Json<QuestionOut>)> {
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    let question = QuestionRecord {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        description: input.description,
        code_example: input.code_example,
        category: input.category,
        difficulty: input.difficulty,
        tags: clean_list(input.tags),
        links: with_code_link(clean_list(input.links), input.code_link),
        deadline: input.deadline,
        status: input
            .status
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "published".to_string()),
        client_id: user_id,
        accepted_answer_id: None,
        created_at: Utc::now(),
        updated_at: None,
    };
    debug!(question_id = %question.id, "created question");
    let out = store.question_out(&question);
    store.questions.push(question);
    Ok((StatusCode::CREATED, Json(out)))
}

async fn get_question(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<QuestionOut>> {
    let store = db.read().await;
    let index = store.question_index(&id)?;
    Ok(Json(store.question_out(&store.questions[index])))
}

async fn update_question(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<QuestionUpdate>,
) -> ApiResult<Json<QuestionOut>> {
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    let index = store.question_index(&id)?;
    let question = &mut store.questions[index];
    if question.client_id != user_id {
        return Err(HttpError::forbidden("You can only update your own questions"));
    }

    if let Some(title) = update.title {
        question.title = title;
    }
    if let Some(description) = update.description {
        question.description = description;
    }
    if update.code_example.is_some() {
        question.code_example = update.code_example;
    }
    if let Some(category) = update.category {
        question.category = category;
    }
    if update.difficulty.is_some() {
        question.difficulty = update.difficulty;
    }
    if let Some(tags) = update.tags {
        question.tags = clean_list(tags);
    }
    if let Some(links) = update.links {
        question.links = clean_list(links);
    }
    question.links = with_code_link(std::mem::take(&mut question.links), update.code_link);
    if update.deadline.is_some() {
        question.deadline = update.deadline;
    }
    if let Some(status) = update.status {
        question.status = status;
    }
    question.updated_at = Some(Utc::now());

    let question = store.questions[index].clone();
    Ok(Json(store.question_out(&question)))
}

async fn delete_question(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    let index = store.question_index(&id)?;
    if store.questions[index].client_id != user_id {
        return Err(HttpError::forbidden("You can only delete your own questions"));
    }

    let accepted_authors: Vec<String> = store
        .answers
        .iter()
        .filter(|a| a.question_id == id && a.is_accepted)
        .map(|a| a.author_id.clone())
        .collect();
    for author in accepted_authors {
        store.adjust_resolved(&author, -1);
    }
    store.answers.retain(|a| a.question_id != id);
    store.questions.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

async fn list_answers(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<Vec<AnswerOut>>> {
    let store = db.read().await;
    store.question_index(&id)?;
    let answers = store
        .answers
        .iter()
        .filter(|a| a.question_id == id)
        .map(|a| store.answer_out(a))
        .collect();
    Ok(Json(answers))
}

async fn create_answer(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<AnswerCreate>,
) -> ApiResult<(StatusCode, Json<AnswerOut>)> {
    if input.answer_text.is_empty() {
        return Err(HttpError::new(StatusCode::UNPROCESSABLE_ENTITY, "answer_text must not be empty"));
    }
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    store.question_index(&id)?;
    let author = store.user(&user_id)?;

    let answer = AnswerRecord {
        id: Uuid::new_v4().to_string(),
        question_id: id,
        author_id: user_id.clone(),
        answer_text: input.answer_text,
        code_example: input.code_example,
        links: clean_list(input.links),
        expert_name: display_name(Some(author)),
        expert_rating: author.expert_profile.as_ref().map_or(0.0, |p| p.average_rating),
        is_accepted: false,
        created_at: Utc::now(),
    };
    store.answers.push(answer.clone());
    Ok((StatusCode::CREATED, Json(store.answer_out(&answer))))
}

async fn update_answer(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, answer_id)): Path<(String, String)>,
    Json(update): Json<AnswerUpdate>,
) -> ApiResult<Json<AnswerOut>> {
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    let index = store.answer_index(&id, &answer_id)?;
    let answer = &mut store.answers[index];
    if answer.author_id != user_id {
        return Err(HttpError::forbidden("You can only update your own answers"));
    }
    if let Some(text) = update.answer_text {
        answer.answer_text = text;
    }
    if update.code_example.is_some() {
        answer.code_example = update.code_example;
    }
    if let Some(links) = update.links {
        answer.links = clean_list(links);
    }
    let answer = answer.clone();
    Ok(Json(store.answer_out(&answer)))
}

async fn delete_answer(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, answer_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    let index = store.answer_index(&id, &answer_id)?;
    let answer = store.answers[index].clone();
    if answer.author_id != user_id {
        return Err(HttpError::forbidden("You can only delete your own answers"));
    }

    if answer.is_accepted {
        store.adjust_resolved(&answer.author_id, -1);
    }
    store.answers.remove(index);
    if let Ok(question_index) = store.question_index(&id) {
        if store.questions[question_index].accepted_answer_id.as_deref() == Some(answer.id.as_str()) {
            store.reassign_acceptance(question_index);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn verify_answer(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, answer_id)): Path<(String, String)>,
    Json(input): Json<VerifyInput>,
) -> ApiResult<Json<AnswerOut>> {
    let mut store = db.write().await;
    let user_id = store.authenticate(&headers)?;
    let question_index = store.question_index(&id)?;
    if store.questions[question_index].client_id != user_id {
        return Err(HttpError::forbidden("Only the question owner can verify answers"));
    }
    let index = store.answer_index(&id, &answer_id)?;
    let author_id = store.answers[index].author_id.clone();
    let was_accepted = store.answers[index].is_accepted;

    if input.is_correct {
        let superseded: Vec<usize> = store
            .answers
            .iter()
            .enumerate()
            .filter(|(i, a)| *i != index && a.question_id == id && a.author_id == author_id && a.is_accepted)
            .map(|(i, _)| i)
            .collect();
        for i in superseded {
            store.answers[i].is_accepted = false;
            store.adjust_resolved(&author_id, -1);
        }
        if !was_accepted {
            store.answers[index].is_accepted = true;
            store.adjust_resolved(&author_id, 1);
        }
        let question = &mut store.questions[question_index];
        question.accepted_answer_id = Some(answer_id);
        question.status = "resolved".to_string();
    } else {
        if was_accepted {
            store.adjust_resolved(&author_id, -1);
        }
        store.answers[index].is_accepted = false;
        if store.questions[question_index].accepted_answer_id.as_deref() == Some(answer_id.as_str()) {
            store.reassign_acceptance(question_index);
        }
    }

    let answer = store.answers[index].clone();
    Ok(Json(store.answer_out(&answer)))
}
