//! Question listing and CRUD.

use serde::Serialize;

use super::{array_items, json_or_null, listing_items, require, segment, Query};
use crate::adapters::{normalize_question, to_number, Question, QuestionPage};
use crate::error::ApiError;
use crate::http::{RequestBody, ResponseBody};
use crate::transport::{RequestOptions, Transport};

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const RECENT_LIMIT: u32 = 5;
pub const DEFAULT_STATUS: &str = "published";

/// Listing filters. Empty values are left out of the query string; `status`
/// is sent as `status_filter` and `tags` as repeated parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFilters {
    pub limit: u32,
    pub offset: u32,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub status: Option<String>,
}

impl Default for QuestionFilters {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            category: None,
            difficulty: None,
            tags: Vec::new(),
            status: Some(DEFAULT_STATUS.to_string()),
        }
    }
}

impl QuestionFilters {
    fn query(&self) -> Query {
        Query::new()
            .param("limit", Some(self.limit))
            .param("offset", Some(self.offset))
            .param("category", self.category.as_deref())
            .param("difficulty", self.difficulty.as_deref())
            .param("status_filter", self.status.as_deref())
            .list("tags", &self.tags)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct QuestionService {
    transport: Transport,
}

impl QuestionService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Latest questions with the given status (`published` when `None`).
    pub async fn fetch_recent_questions(
        &self,
        limit: Option<u32>,
        status: Option<&str>,
    ) -> Result<Vec<Question>, ApiError> {
        let query = Query::new()
            .param("limit", Some(limit.unwrap_or(RECENT_LIMIT)))
            .param("status_filter", Some(status.unwrap_or(DEFAULT_STATUS)));
        let body = self.list(&query).await?;
        Ok(listing_items(&body).iter().filter_map(normalize_question).collect())
    }

    pub async fn fetch_questions(&self, filters: &QuestionFilters) -> Result<QuestionPage, ApiError> {
        let body = self.list(&filters.query()).await?;
        let items: Vec<Question> = listing_items(&body).iter().filter_map(normalize_question).collect();
        let raw_items = listing_items(&body).len();
        let total = match json_or_null(&body).get("total").filter(|total| !total.is_null()) {
            Some(total) => to_number(Some(total), raw_items as f64) as i64,
            None => raw_items as i64,
        };
        Ok(QuestionPage { total, items })
    }

    pub async fn fetch_question_by_id(&self, question_id: &str) -> Result<Option<Question>, ApiError> {
        require(question_id, "Question ID")?;
        let body = self
            .transport
            .get(&question_path(question_id), RequestOptions::new())
            .await?;
        Ok(normalize_question(json_or_null(&body)))
    }

    pub async fn create_question(&self, draft: &QuestionDraft) -> Result<Option<Question>, ApiError> {
        if draft.title.is_empty() || draft.description.is_empty() || draft.category.is_empty() {
            return Err(ApiError::validation("Title, description and category are required"));
        }
        let body = self
            .transport
            .post("/questions/", json_body(draft)?, RequestOptions::new())
            .await?;
        Ok(normalize_question(json_or_null(&body)))
    }

    pub async fn update_question(
        &self,
        question_id: &str,
        update: &QuestionUpdate,
    ) -> Result<Option<Question>, ApiError> {
        require(question_id, "Question ID")?;
        let body = self
            .transport
            .put(&question_path(question_id), json_body(update)?, RequestOptions::new())
            .await?;
        Ok(normalize_question(json_or_null(&body)))
    }

    /// Returns whatever the server sent back, usually `Empty` (204).
    pub async fn delete_question(&self, question_id: &str) -> Result<ResponseBody, ApiError> {
        require(question_id, "Question ID")?;
        self.transport
            .delete(&question_path(question_id), RequestOptions::new())
            .await
    }

    pub async fn fetch_my_questions(&self) -> Result<Vec<Question>, ApiError> {
        let body = self.transport.get("/users/me/questions", RequestOptions::new()).await?;
        Ok(array_items(&body).iter().filter_map(normalize_question).collect())
    }

    async fn list(&self, query: &Query) -> Result<ResponseBody, ApiError> {
        self.transport
            .get(&format!("/questions/{}", query.encode()), RequestOptions::new())
            .await
    }
}

pub(crate) fn question_path(question_id: &str) -> String {
    format!("/questions/{}", segment(question_id))
}

pub(crate) fn json_body<T: Serialize>(value: &T) -> Result<RequestBody, ApiError> {
    serde_json::to_value(value)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::Serialization(e.to_string()))
}
