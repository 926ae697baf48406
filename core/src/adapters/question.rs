//! Question adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::{normalize_expert_profile, ExpertProfile};
use super::{generate_id, is_truthy, normalize_date_value, now_iso, value_to_string, RawRecord};

pub const UNTITLED_QUESTION: &str = "Untitled";
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";
pub const DEFAULT_CATEGORY: &str = "General";

const CODE_MARKER: &str = "code example:";
const CODE_MARKER_CANONICAL: &str = "Code example:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
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
    pub accepted_answer_id: Option<String>,
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_email: String,
    pub client_role: String,
    pub client_profile: Option<ExpertProfile>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub answers_count: i64,
    pub is_solved: bool,
}

/// One page of a question listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionPage {
    pub total: i64,
    pub items: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDescription {
    pub clean_description: String,
    pub code_example: Option<String>,
}

/// Separate an inline `Code example:` section from a question description.
///
/// An explicit code example always wins and leaves the description alone.
/// Otherwise the text is split on the first case-insensitive marker; later
/// markers stay part of the code, rewritten to the canonical spelling.
pub fn split_description_and_code_example(
    description: &str,
    explicit_code_example: Option<&str>,
) -> SplitDescription {
    if let Some(code) = explicit_code_example.filter(|code| !code.is_empty()) {
        return SplitDescription {
            clean_description: description.to_string(),
            code_example: Some(code.to_string()),
        };
    }

    let mut parts = split_on_marker(description).into_iter();
    let before = match parts.next() {
        Some(before) if before.len() < description.len() => before,
        _ => {
            return SplitDescription {
                clean_description: description.to_string(),
                code_example: None,
            }
        }
    };

    let code = parts.collect::<Vec<_>>().join(CODE_MARKER_CANONICAL);
    let code = code.trim();
    let clean = before.trim_end();

    SplitDescription {
        clean_description: if clean.is_empty() {
            description.to_string()
        } else {
            clean.to_string()
        },
        code_example: (!code.is_empty()).then(|| code.to_string()),
    }
}

/// Split on every case-insensitive marker, eating whitespace after each one.
fn split_on_marker(text: &str) -> Vec<&str> {
    let lowered = text.to_ascii_lowercase();
    let mut parts = Vec::new();
    let mut start = 0;
    while let Some(found) = lowered[start..].find(CODE_MARKER) {
        let marker_at = start + found;
        parts.push(&text[start..marker_at]);
        let after_marker = marker_at + CODE_MARKER.len();
        let rest = &text[after_marker..];
        start = after_marker + (rest.len() - rest.trim_start().len());
    }
    parts.push(&text[start..]);
    parts
}

pub fn normalize_question(item: &Value) -> Option<Question> {
    if !is_truthy(item) {
        return None;
    }
    let rec = RawRecord::new(item);

    let raw_description = rec.text_or(&["description"], "");
    let explicit_code = rec
        .first(&["code_example", "codeExample"])
        .filter(|value| is_truthy(value))
        .map(value_to_string);
    let split = split_description_and_code_example(&raw_description, explicit_code.as_deref());

    let first_link = rec
        .first(&["links"])
        .and_then(Value::as_array)
        .and_then(|links| links.first())
        .filter(|link| !link.is_null())
        .map(value_to_string);

    let raw_status = rec.string(&["status"]);
    let status_solved = matches!(raw_status.as_deref(), Some("resolved") | Some("closed"));
    let accepted_answer = rec.first(&["accepted_answer_id", "acceptedAnswerId"]);

    Some(Question {
        id: rec
            .string(&["id", "question_id"])
            .unwrap_or_else(generate_id),
        title: rec.text_or(&["title"], UNTITLED_QUESTION),
        description: split.clean_description,
        code_example: split.code_example,
        category: rec.text_or(&["category"], DEFAULT_CATEGORY),
        difficulty: rec.string(&["difficulty"]),
        tags: rec.strings(&["tags"]),
        links: rec.strings(&["links"]),
        code_link: rec.string(&["code_link", "codeLink"]).or(first_link),
        deadline: rec.first(&["deadline"]).and_then(normalize_date_value),
        status: raw_status.unwrap_or_else(|| "draft".to_string()),
        accepted_answer_id: accepted_answer.map(value_to_string),
        client_id: rec.string(&["client_id", "clientId", "user_id"]),
        client_name: rec.text_or(&["client_name", "clientName", "clientId"], ANONYMOUS_AUTHOR),
        client_email: rec.text_or(&["client_email", "clientEmail"], ""),
        client_role: rec.text_or(&["client_role", "clientRole"], ""),
        client_profile: rec
            .first(&["client_profile", "clientProfile"])
            .and_then(normalize_expert_profile),
        created_at: rec
            .first(&["created_at", "createdAt"])
            .and_then(normalize_date_value)
            .unwrap_or_else(now_iso),
        updated_at: rec.first(&["updated_at", "updatedAt"]).and_then(normalize_date_value),
        answers_count: rec.count_or(&["answers_count", "answersCount"], 0),
        is_solved: status_solved || accepted_answer.is_some_and(is_truthy),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_inline_code_example() {
        let split = split_description_and_code_example("Explain recursion. Code example: def f(): pass", None);
        assert_eq!(split.clean_description, "Explain recursion.");
        assert_eq!(split.code_example.as_deref(), Some("def f(): pass"));
    }

    #[test]
    fn marker_is_case_insensitive() {
        let split = split_description_and_code_example("Why?\n\nCODE EXAMPLE:\n  let x = 1;", None);
        assert_eq!(split.clean_description, "Why?");
        assert_eq!(split.code_example.as_deref(), Some("let x = 1;"));
    }

    #[test]
    fn later_markers_stay_in_code() {
        let split = split_description_and_code_example("a code example: one code example:   two", None);
        assert_eq!(split.clean_description, "a");
        assert_eq!(split.code_example.as_deref(), Some("one Code example:two"));
    }

    #[test]
    fn explicit_code_example_wins() {
        let split = split_description_and_code_example("Text Code example: inline", Some("explicit"));
        assert_eq!(split.clean_description, "Text Code example: inline");
        assert_eq!(split.code_example.as_deref(), Some("explicit"));
    }

    #[test]
    fn no_marker_keeps_description() {
        let split = split_description_and_code_example("Plain text", None);
        assert_eq!(split.clean_description, "Plain text");
        assert_eq!(split.code_example, None);
    }

    #[test]
    fn marker_only_keeps_original_description() {
        let split = split_description_and_code_example("Code example: x()", None);
        assert_eq!(split.clean_description, "Code example: x()");
        assert_eq!(split.code_example.as_deref(), Some("x()"));
    }

    #[test]
    fn empty_question_is_fully_defaulted() {
        let q = normalize_question(&json!({})).unwrap();
        assert!(!q.id.is_empty());
        assert_eq!(q.title, UNTITLED_QUESTION);
        assert_eq!(q.description, "");
        assert_eq!(q.code_example, None);
        assert_eq!(q.category, DEFAULT_CATEGORY);
        assert!(q.tags.is_empty());
        assert!(q.links.is_empty());
        assert_eq!(q.status, "draft");
        assert_eq!(q.client_name, ANONYMOUS_AUTHOR);
        assert_eq!(q.client_email, "");
        assert!(q.client_profile.is_none());
        assert!(q.created_at.ends_with('Z'));
        assert_eq!(q.updated_at, None);
        assert_eq!(q.answers_count, 0);
        assert!(!q.is_solved);
    }

    #[test]
    fn null_question_is_none() {
        assert!(normalize_question(&json!(null)).is_none());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = normalize_question(&json!({"title": "a"})).unwrap();
        let b = normalize_question(&json!({"title": "a"})).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn solved_from_status_or_accepted_answer() {
        let resolved = normalize_question(&json!({"status": "resolved"})).unwrap();
        assert!(resolved.is_solved);
        let closed = normalize_question(&json!({"status": "closed"})).unwrap();
        assert!(closed.is_solved);
        let draft = normalize_question(&json!({"status": "draft", "acceptedAnswerId": null})).unwrap();
        assert!(!draft.is_solved);
        let accepted = normalize_question(&json!({"status": "published", "accepted_answer_id": "a1"})).unwrap();
        assert!(accepted.is_solved);
        assert_eq!(accepted.accepted_answer_id.as_deref(), Some("a1"));
    }

    #[test]
    fn snake_case_payload_is_mapped() {
        let q = normalize_question(&json!({
            "id": 17,
            "title": "Borrow checker",
            "description": "Why does this fail? Code example: let r = &mut v;",
            "category": "Rust",
            "tags": ["rust", "lifetimes"],
            "links": ["https://play.rust-lang.org/x"],
            "deadline": "2024-06-01T12:00:00",
            "client_id": "c1",
            "client_name": "Dana",
            "client_profile": {"skills": "[\"rust\"]"},
            "created_at": "2024-05-01T08:00:00+00:00",
            "answers_count": "2"
        }))
        .unwrap();
        assert_eq!(q.id, "17");
        assert_eq!(q.description, "Why does this fail?");
        assert_eq!(q.code_example.as_deref(), Some("let r = &mut v;"));
        assert_eq!(q.code_link.as_deref(), Some("https://play.rust-lang.org/x"));
        assert_eq!(q.deadline.as_deref(), Some("2024-06-01T12:00:00.000Z"));
        assert_eq!(q.created_at, "2024-05-01T08:00:00.000Z");
        assert_eq!(q.client_name, "Dana");
        assert_eq!(q.client_profile.unwrap().skills, vec!["rust"]);
        assert_eq!(q.answers_count, 2);
    }

    #[test]
    fn client_name_falls_back_to_camel_client_id() {
        let q = normalize_question(&json!({"clientId": "c9"})).unwrap();
        assert_eq!(q.client_id.as_deref(), Some("c9"));
        assert_eq!(q.client_name, "c9");
    }

    #[test]
    fn invalid_created_at_becomes_now() {
        let q = normalize_question(&json!({"created_at": "garbage"})).unwrap();
        assert!(q.created_at.ends_with('Z'));
        assert_ne!(q.created_at, "garbage");
    }
}
