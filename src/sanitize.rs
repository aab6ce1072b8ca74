//! Turns loosely structured model output into readable text or typed records.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::Parsed;

pub const PLACEHOLDER: &str = "Analysis completed.";

/// Keys whose values make up the readable text, in priority order.
const TEXT_KEYS: &[&str] = &["summary", "detailed_analysis", "analysis", "explanation", "description"];

static FENCE_JSON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```json\s*").unwrap());
static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\s*").unwrap());
static OBJECT_BODY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static ARRAY_BODY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static QUOTED_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*":"#).unwrap());
static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[:,{}\[\]"]"#).unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub fn strip_fences(raw: &str) -> String {
    let s = FENCE_JSON.replace_all(raw, "");
    FENCE.replace_all(&s, "").into_owned()
}

/// JSON object parse after fence stripping. Anything that isn't an object fitting `T` stays raw.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Parsed<T> {
    let parsed = serde_json::from_str::<Value>(strip_fences(raw).trim()).and_then(|v| match v {
        Value::Object(_) => serde_json::from_value::<T>(v),
        other => Err(serde::de::Error::custom(format!("expected a JSON object, got {other}"))),
    });
    match parsed {
        Ok(v) => Parsed::Parsed(v),
        Err(e) => {
            tracing::debug!(error = %e, "structured parse failed");
            Parsed::Unparsed(raw.to_string())
        }
    }
}

/// Field deserializers for model records: a `null` or wrong-typed field reads as absent
/// instead of rejecting the whole record.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar_text(v: Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(Value::deserialize(d)?))
    }

    /// A list of strings. Object items keep their scalar values joined by ": ";
    /// a bare string counts as a one-item list.
    pub fn texts<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let items = match Value::deserialize(d)? {
            Value::Array(items) => items,
            Value::String(s) => vec![Value::String(s)],
            _ => return Ok(Vec::new()),
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => {
                    let parts: Vec<String> = map.into_iter().filter_map(|(_, v)| scalar_text(v)).collect();
                    (!parts.is_empty()).then(|| parts.join(": "))
                }
                other => scalar_text(other),
            })
            .collect())
    }

    pub fn values<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Value>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items,
            _ => Vec::new(),
        })
    }
}

pub fn sanitize(raw: &str) -> String {
    let text = strip_fences(raw);
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => {
            let mut parts: Vec<String> = TEXT_KEYS
                .iter()
                .filter_map(|k| map.get(*k))
                .filter(|v| is_populated(v))
                .map(render)
                .collect();

            if let Some(Value::Array(items)) = map.get("key_evidence_points") {
                if !items.is_empty() {
                    let evidence = items.iter().map(render).collect::<Vec<_>>().join(", ");
                    parts.push(format!("Evidence: {evidence}"));
                }
            }
            if let Some(v) = map.get("credibility_assessment").filter(|v| is_populated(v)) {
                parts.push(format!("Credibility: {}", render(v)));
            }

            if parts.is_empty() { raw.to_string() } else { parts.join(". ") }
        }
        _ => strip_structure(&text),
    }
}

fn strip_structure(text: &str) -> String {
    let s = OBJECT_BODY.replace_all(text, "");
    let s = ARRAY_BODY.replace_all(&s, "");
    let s = QUOTED_KEY.replace_all(&s, "");
    let s = PUNCTUATION.replace_all(&s, " ");
    let s = WHITESPACE.replace_all(&s, " ");
    let s = s.trim();
    if s.is_empty() { PLACEHOLDER.to_string() } else { s.to_string() }
}

fn is_populated(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

fn render(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn summary_only_is_returned_verbatim() {
        assert_eq!(sanitize(r#"{"summary": "Claims hold up."}"#), "Claims hold up.");
    }

    #[test]
    fn joins_known_keys_evidence_and_credibility() {
        let raw = "```json\n{\"verdict\":\"InsufficientInfo\",\"detailed_analysis\":\"Contradicts evidence\",\
                   \"key_evidence_points\":[\"Peer-reviewed studies\",\"WHO guidelines\"],\
                   \"credibility_assessment\":\"Low\"}\n```";
        assert_eq!(
            sanitize(raw),
            "Contradicts evidence. Evidence: Peer-reviewed studies, WHO guidelines. Credibility: Low"
        );
    }

    #[test]
    fn object_without_known_keys_returns_input() {
        let raw = r#"{"verdict":"Supported"}"#;
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn malformed_json_is_stripped_to_prose() {
        let raw = r#"The claim is false: {"verdict": "Contradicted"} see ["a", "b"] done"#;
        assert_eq!(sanitize(raw), "The claim is false see done");
    }

    #[test]
    fn empty_after_stripping_yields_placeholder() {
        assert_eq!(sanitize(r#"["a", "b"]"#), PLACEHOLDER);
        assert_eq!(sanitize(""), PLACEHOLDER);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Rec { claims: Vec<String> }

    #[test]
    fn parse_structured_tags_results() {
        let ok = parse_structured::<Rec>("```json\n{\"claims\": [\"a\"]}\n```");
        assert_eq!(ok, Parsed::Parsed(Rec { claims: vec!["a".into()] }));
        let bad = parse_structured::<Rec>("not json");
        assert_eq!(bad, Parsed::Unparsed("not json".into()));
        // valid JSON, but not a record
        let list = parse_structured::<Rec>(r#"["a", "b"]"#);
        assert_eq!(list, Parsed::Unparsed(r#"["a", "b"]"#.into()));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient::text")]
        label: Option<String>,
        #[serde(default, deserialize_with = "lenient::texts")]
        points: Vec<String>,
    }

    #[test]
    fn null_and_mistyped_fields_read_as_absent() {
        let Parsed::Parsed(rec) = parse_structured::<Loose>(r#"{"label": null, "points": null}"#) else {
            panic!("record with null fields must parse");
        };
        assert_eq!(rec, Loose { label: None, points: vec![] });

        let Parsed::Parsed(rec) = parse_structured::<Loose>(r#"{"label": {"x": 1}, "points": 7}"#) else {
            panic!("record with mistyped fields must parse");
        };
        assert_eq!(rec, Loose { label: None, points: vec![] });

        let Parsed::Parsed(rec) = parse_structured::<Loose>(r#"{"points": [{"point": "Photos", "source": "NASA"}, 3, null]}"#) else {
            panic!("record with object items must parse");
        };
        assert_eq!(rec.points, vec!["Photos: NASA".to_string(), "3".to_string()]);
        assert_eq!(rec.label, None);
    }
}
