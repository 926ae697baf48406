//! Category adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{generate_id, is_truthy, RawRecord};

pub const DEFAULT_CATEGORY_ICON: &str = "📁";
pub const DEFAULT_CATEGORY_NAME: &str = "Category";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub total_questions: i64,
}

/// A bare string becomes `{ id: s, name: s }` with the default icon.
pub fn normalize_category(raw: &Value) -> Option<Category> {
    if !is_truthy(raw) {
        return None;
    }
    if let Value::String(label) = raw {
        return Some(Category {
            id: label.clone(),
            name: label.clone(),
            icon: DEFAULT_CATEGORY_ICON.to_string(),
            description: String::new(),
            total_questions: 0,
        });
    }

    let rec = RawRecord::new(raw);
    Some(Category {
        id: rec.string(&["id", "slug", "name"]).unwrap_or_else(generate_id),
        name: rec.text_or(&["name", "label", "title"], DEFAULT_CATEGORY_NAME),
        icon: rec.text_or(&["icon", "emoji"], DEFAULT_CATEGORY_ICON),
        description: rec.text_or(&["description"], ""),
        total_questions: rec.count_or(&["totalQuestions", "total_questions", "questions_count"], 0),
    })
}
