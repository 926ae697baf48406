//! Platform statistics adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_questions: f64,
    pub total_experts: f64,
    pub success_rate: f64,
}

/// Unlike the other adapters this one is never `None`: an empty or
/// malformed payload is all zeros.
pub fn normalize_stats(raw: &Value) -> PlatformStats {
    let rec = RawRecord::new(raw);
    PlatformStats {
        total_questions: rec.number_or(&["totalQuestions", "total_questions", "questions"], 0.0),
        total_experts: rec.number_or(&["totalExperts", "total_experts", "experts", "users"], 0.0),
        success_rate: rec.number_or(&["successRate", "success_rate", "success"], 0.0),
    }
}
