//! Verification verdicts and parsing of free-text verifier responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reason recorded when a verifier response carries no usable verdict.
pub const UNPARSEABLE_REASON: &str = "unparseable verification response";

/// Pass/fail judgment on generated feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub pass: bool,
    pub reason: String,
}

impl Verdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            pass: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            pass: false,
            reason: reason.into(),
        }
    }

    pub fn unparseable() -> Self {
        Self::fail(UNPARSEABLE_REASON)
    }
}

/// Parse a verifier response into a verdict. Never fails.
///
/// Takes the span from the first `{` to the last `}` and reads it as a JSON
/// object with case-insensitive keys. `verdict: "YES"` (any case) or
/// `pass: true` passes; any other verdict value fails. A response with no
/// object, invalid JSON, or neither key resolves to [`Verdict::unparseable`].
pub fn parse_verdict(raw: &str) -> Verdict {
    let Some(span) = outermost_object(raw) else {
        return Verdict::unparseable();
    };
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(span) else {
        return Verdict::unparseable();
    };
    let fields = lowercase_keys(map);

    let pass = match (fields.get("verdict"), fields.get("pass")) {
        (Some(Value::String(verdict)), _) => verdict.trim().eq_ignore_ascii_case("yes"),
        (Some(Value::Bool(flag)), _) | (None, Some(Value::Bool(flag))) => *flag,
        (Some(_), _) => false,
        (None, _) => return Verdict::unparseable(),
    };
    let reason = match fields.get("reason") {
        Some(Value::String(reason)) => reason.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Verdict { pass, reason }
}

fn outermost_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn lowercase_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect()
}
