//! Answer adapter.
//!
//! Answers come back camelCase more often than questions do, so several
//! fields try the camelCase alias first.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::question::ANONYMOUS_AUTHOR;
use super::user::{normalize_expert_profile, ExpertProfile};
use super::{generate_id, is_truthy, normalize_date_value, now_iso, to_number, RawRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    pub question_id: Option<String>,
    pub question_title: Option<String>,
    pub author_id: Option<String>,
    pub author_answers_count: Option<i64>,
    pub author_email: String,
    pub author_role: String,
    pub author_profile: Option<ExpertProfile>,
    pub answer_text: String,
    pub code_example: Option<String>,
    pub links: Vec<String>,
    pub expert_name: String,
    pub expert_rating: f64,
    pub is_accepted: bool,
    pub created_at: String,
}

pub fn normalize_answer(item: &Value) -> Option<Answer> {
    if !is_truthy(item) {
        return None;
    }
    let rec = RawRecord::new(item);

    Some(Answer {
        id: rec.string(&["id", "answer_id"]).unwrap_or_else(generate_id),
        question_id: rec.string(&["questionId", "question_id"]),
        question_title: rec.string(&["questionTitle", "question_title"]),
        author_id: rec.string(&["authorId", "author_id"]),
        author_answers_count: rec
            .first(&["author_answers_count", "authorAnswersCount"])
            .map(|value| to_number(Some(value), 0.0) as i64),
        author_email: rec.text_or(&["authorEmail", "author_email"], ""),
        author_role: rec.text_or(&["authorRole", "author_role"], ""),
        author_profile: rec
            .first(&["authorProfile", "author_profile"])
            .and_then(normalize_expert_profile),
        answer_text: rec.text_or(&["answerText", "answer_text"], ""),
        code_example: rec.string(&["codeExample", "code_example"]),
        links: rec.strings(&["links"]),
        expert_name: rec.text_or(&["expertName", "expert_name"], ANONYMOUS_AUTHOR),
        expert_rating: rec.number_or(&["expertRating", "expert_rating"], 0.0),
        is_accepted: rec.truthy(&["isAccepted", "is_accepted"]),
        created_at: rec
            .first(&["created_at", "createdAt"])
            .and_then(normalize_date_value)
            .unwrap_or_else(now_iso),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_answer_is_fully_defaulted() {
        let answer = normalize_answer(&json!({})).unwrap();
        assert!(!answer.id.is_empty());
        assert_eq!(answer.question_id, None);
        assert_eq!(answer.author_answers_count, None);
        assert_eq!(answer.author_email, "");
        assert_eq!(answer.answer_text, "");
        assert!(answer.links.is_empty());
        assert_eq!(answer.expert_name, ANONYMOUS_AUTHOR);
        assert_eq!(answer.expert_rating, 0.0);
        assert!(!answer.is_accepted);
        assert!(answer.created_at.ends_with('Z'));
    }

    #[test]
    fn camel_case_wins_over_snake_case() {
        let answer = normalize_answer(&json!({
            "questionId": "camel",
            "question_id": "snake",
            "answer_text": "Use an Rc",
            "is_accepted": true,
            "expertRating": "4.8",
            "author_answers_count": 11,
            "author_profile": {"primary_role": "backend"},
            "created_at": "2024-01-02T03:04:05"
        }))
        .unwrap();
        assert_eq!(answer.question_id.as_deref(), Some("camel"));
        assert_eq!(answer.answer_text, "Use an Rc");
        assert!(answer.is_accepted);
        assert_eq!(answer.expert_rating, 4.8);
        assert_eq!(answer.author_answers_count, Some(11));
        assert_eq!(answer.author_profile.unwrap().primary_role, "backend");
        assert_eq!(answer.created_at, "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn unparsable_rating_never_produces_nan() {
        let answer = normalize_answer(&json!({"expertRating": "excellent"})).unwrap();
        assert_eq!(answer.expert_rating, 0.0);
    }

    #[test]
    fn non_array_links_become_empty() {
        let answer = normalize_answer(&json!({"links": "https://x"})).unwrap();
        assert!(answer.links.is_empty());
    }
}
