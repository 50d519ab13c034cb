//! Learning-plan document and its tolerant parser.
//!
//! Plan text comes from a non-deterministic generator. Parsing accepts a bare
//! JSON array of weeks, or an object carrying the array under `weeks`/`plan`,
//! optionally wrapped in prose or code fences. Anything else degrades to a
//! single week whose only task is the raw text.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::{Draft, Validator};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan_document.schema.json");

/// Label of the synthesized week when plan text is not structured.
pub const FALLBACK_WEEK: &str = "전체 기간";
/// Focus of the synthesized week when plan text is not structured.
pub const FALLBACK_FOCUS: &str = "학습 계획";

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap());

static PLAN_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(PLAN_SCHEMA).expect("plan schema should be valid json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("plan schema should compile")
});

/// One week of the learning plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekEntry {
    pub week: String,
    #[serde(default)]
    pub focus: String,
    pub tasks: Vec<String>,
}

/// Ordered weekly learning plan. Serializes as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanDocument {
    pub weeks: Vec<WeekEntry>,
}

impl PlanDocument {
    /// Single-week plan wrapping unstructured text as its only task.
    pub fn fallback(raw: &str) -> Self {
        Self {
            weeks: vec![WeekEntry {
                week: FALLBACK_WEEK.to_string(),
                focus: FALLBACK_FOCUS.to_string(),
                tasks: vec![raw.to_string()],
            }],
        }
    }
}

/// Parse plan text strictly, reporting why it is not a structured plan.
///
/// Callers degrade a failure to [`PlanDocument::fallback`].
pub fn try_parse_plan(raw: &str) -> Result<PlanDocument> {
    let body = strip_fences(raw);
    let value = embedded_json(body)?;
    let weeks = weeks_value(value)?;

    let messages: Vec<String> = PLAN_VALIDATOR
        .iter_errors(&weeks)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("plan schema validation failed:\n- {}", messages.join("\n- "));
    }

    let weeks: Vec<WeekEntry> = serde_json::from_value(weeks).context("decode plan weeks")?;
    Ok(PlanDocument { weeks })
}

fn strip_fences(raw: &str) -> &str {
    FENCE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// First JSON value found between an opening bracket and its last closer.
///
/// Array and object spans are tried independently, earliest first, so a
/// bracketed prose header like `[학습 로드맵]` does not hide an object after it.
fn embedded_json(text: &str) -> Result<Value> {
    let mut spans: Vec<(usize, &str)> = [('[', ']'), ('{', '}')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (end > start).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);

    let mut last_err = None;
    for (_, span) in spans {
        match serde_json::from_str::<Value>(span) {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(err).context("parse plan json"),
        None => bail!("no json value in plan text"),
    }
}

fn weeks_value(value: Value) -> Result<Value> {
    match value {
        Value::Array(_) => Ok(value),
        Value::Object(map) => map
            .into_iter()
            .find(|(key, val)| {
                let key = key.to_ascii_lowercase();
                (key == "weeks" || key == "plan") && val.is_array()
            })
            .map(|(_, val)| val)
            .ok_or_else(|| anyhow!("plan object has no weeks array")),
        other => bail!("plan json is not an array or object: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_plan(raw: &str) -> PlanDocument {
        try_parse_plan(raw).unwrap_or_else(|_| PlanDocument::fallback(raw))
    }

    #[test]
    fn non_json_plan_falls_back_to_single_week() {
        let raw = "1주차: Rust 기초\n2주차: 비동기 프로그래밍";
        let plan = parse_plan(raw);
        assert_eq!(plan.weeks.len(), 1);
        assert_eq!(plan.weeks[0].tasks, vec![raw.to_string()]);
        assert_eq!(plan.weeks[0].week, FALLBACK_WEEK);
        assert_eq!(plan.weeks[0].focus, FALLBACK_FOCUS);
    }

    #[test]
    fn bare_array_parses_in_order() {
        let raw = r#"[
            {"week": "1주차", "focus": "SQL", "tasks": ["조인 복습", "인덱스 실습"]},
            {"week": "2주차", "focus": "Docker", "tasks": ["컨테이너 배포"]}
        ]"#;
        let plan = try_parse_plan(raw).expect("parse");
        assert_eq!(plan.weeks.len(), 2);
        assert_eq!(plan.weeks[0].week, "1주차");
        assert_eq!(plan.weeks[0].tasks, vec!["조인 복습", "인덱스 실습"]);
        assert_eq!(plan.weeks[1].focus, "Docker");
    }

    #[test]
    fn fenced_object_with_weeks_key_parses() {
        let raw = "학습 계획입니다.\n```json\n{\"Weeks\": [{\"week\": \"1\", \"focus\": \"CS\", \"tasks\": [\"운영체제\"]}]}\n```\n감사합니다.";
        let plan = try_parse_plan(raw).expect("parse");
        assert_eq!(plan.weeks.len(), 1);
        assert_eq!(plan.weeks[0].tasks, vec!["운영체제"]);
    }

    #[test]
    fn bracketed_header_before_object_is_skipped() {
        let raw = "[학습 로드맵]\n{\"weeks\": [{\"week\":\"1주차\",\"focus\":\"SQL\",\"tasks\":[\"조인\"]}]}";
        let plan = try_parse_plan(raw).expect("parse");
        assert_eq!(plan.weeks.len(), 1);
        assert_eq!(plan.weeks[0].focus, "SQL");
        assert_eq!(plan.weeks[0].tasks, vec!["조인"]);
    }

    #[test]
    fn bare_array_wins_over_inner_objects() {
        let raw = r#"계획: [{"week": "1주차", "tasks": ["a"]}, {"week": "2주차", "tasks": ["b"]}]"#;
        let plan = try_parse_plan(raw).expect("parse");
        assert_eq!(plan.weeks.len(), 2);
    }

    #[test]
    fn plan_key_is_accepted_and_focus_defaults_empty() {
        let raw = r#"{"plan": [{"week": "W1", "tasks": []}]}"#;
        let plan = try_parse_plan(raw).expect("parse");
        assert_eq!(plan.weeks[0].focus, "");
        assert!(plan.weeks[0].tasks.is_empty());
    }

    #[test]
    fn empty_array_is_rejected() {
        let err = try_parse_plan("[]").unwrap_err();
        assert!(err.to_string().contains("schema validation failed"));
        assert_eq!(parse_plan("[]"), PlanDocument::fallback("[]"));
    }

    #[test]
    fn schema_violation_falls_back() {
        let raw = r#"[{"week": 1, "tasks": "not a list"}]"#;
        assert!(try_parse_plan(raw).is_err());
        assert_eq!(parse_plan(raw), PlanDocument::fallback(raw));
    }

    #[test]
    fn object_without_weeks_falls_back() {
        let raw = r#"{"summary": "no plan here"}"#;
        let err = try_parse_plan(raw).unwrap_err();
        assert!(err.to_string().contains("no weeks array"));
    }

    #[test]
    fn truncated_json_falls_back() {
        let raw = r#"[{"week": "1주차", "tasks": ["a""#;
        assert_eq!(parse_plan(raw).weeks[0].tasks, vec![raw.to_string()]);
    }

    #[test]
    fn plan_document_serializes_as_array() {
        let plan = PlanDocument::fallback("raw");
        let json = serde_json::to_value(&plan).expect("serialize");
        assert!(json.is_array());
        assert_eq!(json[0]["tasks"][0], "raw");
    }
}
