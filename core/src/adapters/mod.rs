//! Shape-normalizing adapters from raw backend JSON to canonical records.
//!
//! # Design
//! Every adapter is a total function over `serde_json::Value`: `None` for a
//! null/falsy input, otherwise a record with every field defaulted. Field
//! lookup goes through [`RawRecord`], which tries an ordered list of aliases
//! and takes the first one that is present and not `null`. Precedence is
//! per entity and deliberately not unified; the same logical field may list
//! its aliases in a different order on different records.

pub mod answer;
pub mod category;
pub mod question;
pub mod stats;
pub mod user;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use answer::{normalize_answer, Answer};
pub use category::{normalize_category, Category, DEFAULT_CATEGORY_ICON, DEFAULT_CATEGORY_NAME};
pub use question::{
    normalize_question, split_description_and_code_example, Question, QuestionPage, SplitDescription,
    ANONYMOUS_AUTHOR, DEFAULT_CATEGORY, UNTITLED_QUESTION,
};
pub use stats::{normalize_stats, PlatformStats};
pub use user::{
    normalize_auth_response, normalize_expert_profile, normalize_user, normalize_user_with_profile,
    AuthSession, ExpertProfile, User, UserFallback, DEFAULT_ROLE,
};

/// Read-only view over a raw JSON object with alias-ordered accessors.
///
/// A non-object value behaves like an empty object, so every accessor falls
/// through to its default.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> RawRecord<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self {
            fields: value.as_object(),
        }
    }

    /// First alias whose value is present and not `null`.
    pub fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        let fields = self.fields?;
        keys.iter()
            .filter_map(|key| fields.get(*key))
            .find(|value| !value.is_null())
    }

    /// First alias whose value is truthy (skips `""`, `0`, `false` too).
    pub fn first_truthy(&self, keys: &[&str]) -> Option<&'a Value> {
        let fields = self.fields?;
        keys.iter()
            .filter_map(|key| fields.get(*key))
            .find(|value| is_truthy(value))
    }

    /// First non-null alias rendered as a string.
    pub fn string(&self, keys: &[&str]) -> Option<String> {
        self.first(keys).map(value_to_string)
    }

    pub fn text_or(&self, keys: &[&str], default: &str) -> String {
        self.string(keys).unwrap_or_else(|| default.to_string())
    }

    pub fn number_or(&self, keys: &[&str], fallback: f64) -> f64 {
        to_number(self.first(keys), fallback)
    }

    pub fn count_or(&self, keys: &[&str], fallback: i64) -> i64 {
        to_number(self.first(keys), fallback as f64) as i64
    }

    pub fn strings(&self, keys: &[&str]) -> Vec<String> {
        string_list(self.first(keys))
    }

    pub fn truthy(&self, keys: &[&str]) -> bool {
        self.first(keys).is_some_and(is_truthy)
    }
}

/// Render a scalar the way it would be interpolated into text.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truthiness of a loosely-typed value: `null`, `false`, `0`, `""` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce a loosely-typed value to a finite number.
///
/// Missing, `null`, unparsable and non-finite values all resolve to
/// `fallback`; `NaN` never escapes.
pub fn to_number(value: Option<&Value>, fallback: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(fallback)
}

/// Normalize a date-ish value to an ISO-8601 UTC string with milliseconds.
///
/// Numbers are epoch milliseconds. Strings without a timezone designator are
/// read as UTC by appending `Z`. Anything unparsable yields `None`.
pub fn normalize_date_value(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::String(s) => parse_date_str(s),
        _ => None,
    };
    parsed.map(format_datetime)
}

/// Canonical text form of an already-typed timestamp.
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn now_iso() -> String {
    format_datetime(Utc::now())
}

fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    let candidate = if has_timezone(s) {
        s.to_string()
    } else {
        format!("{s}Z")
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `Z`/`z` suffix or a trailing `+HH:MM` / `-HHMM` offset.
fn has_timezone(s: &str) -> bool {
    if s.ends_with(|c| c == 'z' || c == 'Z') {
        return true;
    }
    let bytes = s.as_bytes();
    let offset_at = |len: usize| -> bool {
        if bytes.len() < len {
            return false;
        }
        let tail = &bytes[bytes.len() - len..];
        let digits_ok = |range: &[u8]| range.iter().all(u8::is_ascii_digit);
        matches!(tail[0], b'+' | b'-')
            && digits_ok(&tail[1..3])
            && if len == 6 {
                tail[3] == b':' && digits_ok(&tail[4..6])
            } else {
                digits_ok(&tail[3..5])
            }
    };
    offset_at(6) || offset_at(5)
}

/// Array elements as strings, dropping `null`/`false`/empty entries.
/// Non-array input yields an empty list.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| is_truthy(item))
            .map(value_to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Skills arrive as an array, a JSON-encoded array string, or a
/// comma-separated string. Entries are trimmed and empties dropped; order
/// and duplicates are preserved.
pub fn parse_skills(value: Option<&Value>) -> Vec<String> {
    let entries = match value {
        Some(Value::Array(_)) => string_list(value),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ Value::Array(_)) => string_list(Some(&parsed)),
            _ => raw.split(',').map(str::to_string).collect(),
        },
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Locally-unique identifier for records the backend sent without one.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
