use axum::http::{self, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, AnswerOut, Category, PlatformStats, QuestionList, QuestionOut, TokenResponse, UserOut};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn send(app: &Router, request: Request<String>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>) -> http::request::Builder {
    let builder = Request::builder().method(method).uri(format!("/api/v1{uri}"));
    match token {
        Some(token) => builder.header(http::header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    request(method, uri, token)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<String> {
    request(method, uri, token).body(String::new()).unwrap()
}

fn login_request(username: &str, password: &str) -> Request<String> {
    request("POST", "/auth/login", None)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(format!("username={username}&password={password}&grant_type=password"))
        .unwrap()
}

/// Register `username` and return a fresh access token.
async fn signed_up(app: &Router, username: &str, role: &str) -> TokenResponse {
    let body = format!(
        r#"{{"email":"{username}@skillgig.kz","password":"pw","role":"{role}","username":"{username}","first_name":"{username}"}}"#
    );
    let resp = send(app, json_request("POST", "/auth/register", None, &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(app, login_request(username, "pw")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

async fn detail(resp: Response) -> String {
    let body: Value = body_json(resp).await;
    body["detail"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn register_then_login_issues_bearer_tokens() {
    let app = app();
    let tokens = signed_up(&app, "aru", "client").await;
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.expires_in, 1800);
    assert_eq!(tokens.user.email, "aru@skillgig.kz");
    assert_eq!(tokens.user.role, "client");

    let resp = send(&app, login_request("aru%40skillgig.kz", "pw")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = app();
    signed_up(&app, "aru", "client").await;
    let resp = send(
        &app,
        json_request("POST", "/auth/register", None, r#"{"email":"ARU@skillgig.kz","password":"x"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "User with this email or username already exists");
}

#[tokio::test]
async fn wrong_password_is_400() {
    let app = app();
    signed_up(&app, "aru", "client").await;
    let resp = send(&app, login_request("aru", "nope")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "Incorrect username or password");
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let app = app();
    let tokens = signed_up(&app, "aru", "client").await;
    let body = format!(r#"{{"refresh_token":"{}"}}"#, tokens.refresh_token);

    let resp = send(&app, json_request("POST", "/auth/refresh", None, &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated: TokenResponse = body_json(resp).await;
    assert_ne!(rotated.access_token, tokens.access_token);

    let resp = send(&app, json_request("POST", "/auth/refresh", None, &body)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- users ---

#[tokio::test]
async fn me_requires_bearer_token() {
    let app = app();
    let resp = send(&app, empty_request("GET", "/users/me", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = send(&app, empty_request("GET", "/users/me", Some("forged"))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let tokens = signed_up(&app, "aru", "client").await;
    let resp = send(&app, empty_request("GET", "/users/me", Some(&tokens.access_token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: UserOut = body_json(resp).await;
    assert_eq!(me.id, tokens.user.id);
}

#[tokio::test]
async fn profile_update_makes_user_an_expert() {
    let app = app();
    let tokens = signed_up(&app, "erlan", "client").await;
    let resp = send(
        &app,
        json_request(
            "PUT",
            "/users/me/profile",
            Some(&tokens.access_token),
            r#"{"full_name":"Erlan B","skills":["rust"," vue "],"experience_years":6}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = body_json(resp).await;
    assert_eq!(profile["skills"], serde_json::json!(["rust", "vue"]));

    let resp = send(&app, empty_request("GET", "/users/experts", None)).await;
    let experts: Vec<UserOut> = body_json(resp).await;
    assert_eq!(experts.len(), 1);
    assert_eq!(experts[0].expert_profile.as_ref().unwrap().experience_years, 6);
}

#[tokio::test]
async fn only_short_user_lookup_path_is_served() {
    let app = app();
    let tokens = signed_up(&app, "aru", "client").await;
    let id = tokens.user.id;

    let resp = send(&app, empty_request("GET", &format!("/users/profile/{id}"), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, empty_request("GET", &format!("/users/{id}"), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let user: UserOut = body_json(resp).await;
    assert_eq!(user.username.as_deref(), Some("aru"));

    let resp = send(&app, empty_request("GET", "/users/ghost", None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "User not found");
}

// --- catalogue ---

#[tokio::test]
async fn categories_are_seeded() {
    let app = app();
    let resp = send(&app, empty_request("GET", "/categories", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let categories: Vec<Category> = body_json(resp).await;
    assert_eq!(categories.len(), 8);
    assert_eq!(categories[0].id, "web-development");
    assert!(categories.iter().all(|c| c.total_questions == 0));
}

// --- questions ---

#[tokio::test]
async fn listing_filters_by_status_and_tags() {
    let app = app();
    let tokens = signed_up(&app, "aru", "client").await;
    let token = Some(tokens.access_token.as_str());
    for body in [
        r#"{"title":"A","description":"d","category":"DevOps","tags":["Docker","ci"]}"#,
        r#"{"title":"B","description":"d","category":"DevOps","tags":["docker"],"status":"draft"}"#,
        r#"{"title":"C","description":"d","category":"AI/ML","tags":["torch"]}"#,
    ] {
        let resp = send(&app, json_request("POST", "/questions/", token, body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&app, empty_request("GET", "/questions/", None)).await;
    let page: QuestionList = body_json(resp).await;
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].title, "C");

    let resp = send(&app, empty_request("GET", "/questions/?status_filter=all&tags=docker", None)).await;
    let page: QuestionList = body_json(resp).await;
    assert_eq!(page.total, 2);

    let resp = send(&app, empty_request("GET", "/questions/?tags=docker&tags=ci", None)).await;
    let page: QuestionList = body_json(resp).await;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "A");

    let resp = send(&app, empty_request("GET", "/questions/?limit=1&offset=1", None)).await;
    let page: QuestionList = body_json(resp).await;
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "A");
}

#[tokio::test]
async fn question_requires_auth_and_ownership() {
    let app = app();
    let body = r#"{"title":"T","description":"D","category":"DevOps"}"#;
    let resp = send(&app, json_request("POST", "/questions/", None, body)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let owner = signed_up(&app, "owner", "client").await;
    let other = signed_up(&app, "other", "client").await;
    let resp = send(&app, json_request("POST", "/questions/", Some(&owner.access_token), body)).await;
    let question: QuestionOut = body_json(resp).await;

    let uri = format!("/questions/{}", question.id);
    let resp = send(&app, json_request("PUT", &uri, Some(&other.access_token), r#"{"title":"X"}"#)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send(&app, empty_request("DELETE", &uri, Some(&other.access_token))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn question_and_answer_lifecycle() {
    let app = app();
    let client = signed_up(&app, "client", "client").await;
    let expert = signed_up(&app, "expert", "expert").await;

    // create
    let resp = send(
        &app,
        json_request(
            "POST",
            "/questions/",
            Some(&client.access_token),
            r#"{"title":"Borrowing","description":"Why?","category":"Backend/Database","codeLink":"https://play.rust-lang.org"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let question: QuestionOut = body_json(resp).await;
    assert_eq!(question.status, "published");
    assert_eq!(question.code_link.as_deref(), Some("https://play.rust-lang.org"));
    assert_eq!(question.client_name, "client");
    let qid = question.id;

    // update
    let resp = send(
        &app,
        json_request("PUT", &format!("/questions/{qid}"), Some(&client.access_token), r#"{"tags":["rust"]}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: QuestionOut = body_json(resp).await;
    assert_eq!(updated.tags, ["rust"]);
    assert!(updated.updated_at.is_some());

    // answer
    let resp = send(
        &app,
        json_request(
            "POST",
            &format!("/questions/{qid}/answers"),
            Some(&expert.access_token),
            r#"{"answerText":"Use a reference","links":[]}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let answer: AnswerOut = body_json(resp).await;
    assert_eq!(answer.question_title.as_deref(), Some("Borrowing"));
    assert_eq!(answer.expert_name, "expert");
    let aid = answer.id;

    // only the owner verifies
    let verify_uri = format!("/questions/{qid}/answers/{aid}/verify");
    let resp = send(&app, json_request("POST", &verify_uri, Some(&expert.access_token), r#"{"isCorrect":true}"#)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send(&app, json_request("POST", &verify_uri, Some(&client.access_token), r#"{"isCorrect":true}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let verified: AnswerOut = body_json(resp).await;
    assert!(verified.is_accepted);
    assert_eq!(verified.author_profile.unwrap().resolved_questions, 1);

    let resp = send(&app, empty_request("GET", &format!("/questions/{qid}"), None)).await;
    let solved: QuestionOut = body_json(resp).await;
    assert!(solved.is_solved);
    assert_eq!(solved.status, "resolved");
    assert_eq!(solved.accepted_answer_id.as_deref(), Some(aid.as_str()));
    assert_eq!(solved.answers_count, 1);

    let resp = send(&app, empty_request("GET", "/stats", None)).await;
    let stats: PlatformStats = body_json(resp).await;
    assert_eq!(stats.total_questions, 1);
    assert_eq!(stats.total_experts, 2);
    assert_eq!(stats.success_rate, 100.0);

    // withdrawing the mark reopens the question
    let resp = send(&app, json_request("POST", &verify_uri, Some(&client.access_token), r#"{"is_correct":false}"#)).await;
    let withdrawn: AnswerOut = body_json(resp).await;
    assert!(!withdrawn.is_accepted);
    let resp = send(&app, empty_request("GET", &format!("/questions/{qid}"), None)).await;
    let reopened: QuestionOut = body_json(resp).await;
    assert_eq!(reopened.status, "published");
    assert!(!reopened.is_solved);

    // my answers / my questions
    let resp = send(&app, empty_request("GET", "/users/me/answers", Some(&expert.access_token))).await;
    let mine: Vec<AnswerOut> = body_json(resp).await;
    assert_eq!(mine.len(), 1);
    let resp = send(&app, empty_request("GET", "/users/me/questions", Some(&expert.access_token))).await;
    let mine: Vec<QuestionOut> = body_json(resp).await;
    assert!(mine.is_empty());

    // delete answer, then question
    let resp = send(&app, empty_request("DELETE", &format!("/questions/{qid}/answers/{aid}"), Some(&expert.access_token))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
    let resp = send(&app, empty_request("DELETE", &format!("/questions/{qid}"), Some(&client.access_token))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, empty_request("GET", &format!("/questions/{qid}"), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Question not found");
}

#[tokio::test]
async fn empty_answer_text_is_unprocessable() {
    let app = app();
    let tokens = signed_up(&app, "aru", "client").await;
    let resp = send(
        &app,
        json_request(
            "POST",
            "/questions/",
            Some(&tokens.access_token),
            r#"{"title":"T","description":"D","category":"DevOps"}"#,
        ),
    )
    .await;
    let question: QuestionOut = body_json(resp).await;
    let resp = send(
        &app,
        json_request(
            "POST",
            &format!("/questions/{}/answers", question.id),
            Some(&tokens.access_token),
            r#"{"answerText":""}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
