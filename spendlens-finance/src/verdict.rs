//! Strict decoding of the oracle's classification output.
//!
//! The model is asked for a JSON array but may wrap it in markdown fences or
//! in a `{"results": [...]}` object, and individual fields come back loosely
//! typed. Everything is normalized here so the merge step sees typed values.

use std::collections::HashSet;

use serde_json::Value;
use spendlens_core::FALLBACK_CATEGORY;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerdictError {
    #[error("oracle output is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("oracle output is not a list of verdicts (got {0})")]
    Shape(&'static str),
}

/// The oracle's proposal for one transaction, before the verification gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub id: i64,
    pub category: String,
    pub tags: Vec<String>,
    /// Clamped to [0, 1]
    pub confidence: f64,
    pub requires_human_verification: bool,
}

pub fn strip_fences(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decode_confidence(v: Option<&Value>) -> f64 {
    let raw = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|c| c.is_finite()).map(|c| c.clamp(0.0, 1.0)).unwrap_or(0.0)
}

/// Absent, `null`, `false`, `0` and the usual "no" spellings clear the flag.
/// Any other value sets it, so an unreadable flag still sends the row to review.
fn decode_review_flag(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "no" | "n" | "0"
        ),
        Some(_) => true,
    }
}

/// `behavioral_tags` wins over `tags` when present. Non-lists decode to no tags.
fn decode_tags(obj: &serde_json::Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(items)) = obj.get("behavioral_tags").or_else(|| obj.get("tags")) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

fn decode_one(v: &Value) -> Option<Verdict> {
    let obj = v.as_object()?;
    let id = obj.get("id").and_then(decode_id)?;

    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string();

    Some(Verdict {
        id,
        category,
        tags: decode_tags(obj),
        confidence: decode_confidence(obj.get("confidence")),
        requires_human_verification: decode_review_flag(obj.get("requires_human_verification")),
    })
}

/// Decode a whole oracle reply. Elements without a usable id are dropped;
/// for duplicate ids the first occurrence wins.
pub fn decode_verdicts(raw: &str) -> Result<Vec<Verdict>, VerdictError> {
    let value: Value = serde_json::from_str(strip_fences(raw))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("results") {
            Some(Value::Array(items)) => items,
            _ => return Err(VerdictError::Shape("object")),
        },
        other => return Err(VerdictError::Shape(kind(&other))),
    };

    let mut seen = HashSet::new();
    let mut verdicts = Vec::with_capacity(items.len());
    for item in &items {
        match decode_one(item) {
            Some(v) if seen.insert(v.id) => verdicts.push(v),
            Some(v) => tracing::debug!(id = v.id, "duplicate verdict ignored"),
            None => tracing::debug!(element = %item, "verdict without usable id dropped"),
        }
    }
    Ok(verdicts)
}
