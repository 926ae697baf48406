//! Answers to a question, moderation and the caller's own answers.

use serde::Serialize;
use serde_json::json;

use super::questions::{json_body, question_path};
use super::{array_items, json_or_null, require, segment};
use crate::adapters::{normalize_answer, Answer};
use crate::error::ApiError;
use crate::http::{RequestBody, ResponseBody};
use crate::transport::{RequestOptions, Transport};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDraft {
    pub answer_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct AnswerService {
    transport: Transport,
}

impl AnswerService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn fetch_question_answers(&self, question_id: &str) -> Result<Vec<Answer>, ApiError> {
        require(question_id, "Question ID")?;
        let body = self
            .transport
            .get(&answers_path(question_id), RequestOptions::new())
            .await?;
        Ok(array_items(&body).iter().filter_map(normalize_answer).collect())
    }

    pub async fn create_answer(&self, question_id: &str, draft: &AnswerDraft) -> Result<Option<Answer>, ApiError> {
        require(question_id, "Question ID")?;
        require(&draft.answer_text, "Answer text")?;
        let body = self
            .transport
            .post(&answers_path(question_id), json_body(draft)?, RequestOptions::new())
            .await?;
        Ok(normalize_answer(json_or_null(&body)))
    }

    pub async fn update_answer(
        &self,
        question_id: &str,
        answer_id: &str,
        update: &AnswerUpdate,
    ) -> Result<Option<Answer>, ApiError> {
        require_pair(question_id, answer_id)?;
        let body = self
            .transport
            .put(&answer_path(question_id, answer_id), json_body(update)?, RequestOptions::new())
            .await?;
        Ok(normalize_answer(json_or_null(&body)))
    }

    pub async fn delete_answer(&self, question_id: &str, answer_id: &str) -> Result<ResponseBody, ApiError> {
        require_pair(question_id, answer_id)?;
        self.transport
            .delete(&answer_path(question_id, answer_id), RequestOptions::new())
            .await
    }

    /// Mark an answer correct (accepting it) or withdraw the mark.
    pub async fn verify_answer(
        &self,
        question_id: &str,
        answer_id: &str,
        is_correct: bool,
    ) -> Result<Option<Answer>, ApiError> {
        require_pair(question_id, answer_id)?;
        let path = format!("{}/verify", answer_path(question_id, answer_id));
        let body = self
            .transport
            .post(&path, RequestBody::Json(json!({ "isCorrect": is_correct })), RequestOptions::new())
            .await?;
        Ok(normalize_answer(json_or_null(&body)))
    }

    pub async fn fetch_my_answers(&self) -> Result<Vec<Answer>, ApiError> {
        let body = self.transport.get("/users/me/answers", RequestOptions::new()).await?;
        Ok(array_items(&body).iter().filter_map(normalize_answer).collect())
    }
}

fn require_pair(question_id: &str, answer_id: &str) -> Result<(), ApiError> {
    if question_id.is_empty() || answer_id.is_empty() {
        return Err(ApiError::validation("Question ID and Answer ID are required"));
    }
    Ok(())
}

fn answers_path(question_id: &str) -> String {
    format!("{}/answers", question_path(question_id))
}

fn answer_path(question_id: &str, answer_id: &str) -> String {
    format!("{}/{}", answers_path(question_id), segment(answer_id))
}
