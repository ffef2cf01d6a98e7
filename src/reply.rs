//! Lenient parsing of chat-model replies.

use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCE_OPEN_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```json\s*").expect("fence json regex"));
static FENCE_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```\s*").expect("fence regex"));
static FENCE_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*$").expect("fence end regex"));

pub fn cleanup_model_text(text: &str) -> String {
    let s = text.trim();
    let s = FENCE_OPEN_JSON_RE.replace(s, "");
    let s = FENCE_OPEN_RE.replace(&s, "");
    let s = FENCE_CLOSE_RE.replace(&s, "");
    s.trim().to_string()
}

/// Parse the whole reply as JSON, else the slice between the first `{` and
/// the last `}`.
pub fn extract_json_object(text: &str) -> anyhow::Result<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Ok(v);
    }
    let start = text.find('{');
    let end = text.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if end > start {
            return serde_json::from_str::<Value>(&text[start..=end])
                .map_err(|e| anyhow!("parse-failed: {e}"));
        }
    }
    Err(anyhow!("parse-failed"))
}

/// Value after the first `:` of the first line starting with `label`
/// (case-insensitive), e.g. `EN Title: Real estate video`.
pub fn labelled_value(text: &str, label: &str) -> String {
    let label = label.to_lowercase();
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .find(|l| l.to_lowercase().starts_with(&label))
        .and_then(|l| l.split_once(':'))
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}

pub fn string_at(value: &Value, path: &[&str]) -> String {
    lookup(value, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Array of strings at `path`; non-string items become empty strings so the
/// indices stay aligned.
pub fn strings_at(value: &Value, path: &[&str]) -> Vec<String> {
    lookup(value, path)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{cleanup_model_text, extract_json_object, labelled_value, string_at, strings_at};

    #[test]
    fn strips_fences() {
        assert_eq!(cleanup_model_text("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(cleanup_model_text("  ```\n{}\n```  "), "{}");
        assert_eq!(cleanup_model_text("{\"a\":\"b\"}"), "{\"a\":\"b\"}");
    }

    #[test]
    fn parses_embedded_object() {
        let v = extract_json_object("Sure! {\"en\": {\"title\": \"Hi\"}} hope it helps")
            .expect("embedded json");
        assert_eq!(string_at(&v, &["en", "title"]), "Hi");
        assert!(extract_json_object("no json here").is_err());
        assert!(extract_json_object("} backwards {").is_err());
    }

    #[test]
    fn labelled_lines() {
        let text = "EN Title: Drone video: aerial\n\nen description: Tours 360\nPT title:  Vídeo ";
        assert_eq!(labelled_value(text, "en title"), "Drone video: aerial");
        assert_eq!(labelled_value(text, "en description"), "Tours 360");
        assert_eq!(labelled_value(text, "pt title"), "Vídeo");
        assert_eq!(labelled_value(text, "pt description"), "");
    }

    #[test]
    fn lenient_accessors() {
        let v = json!({"en": {"body": ["a", 3, "c"], "title": 5}});
        assert_eq!(strings_at(&v, &["en", "body"]), vec!["a", "", "c"]);
        assert_eq!(string_at(&v, &["en", "title"]), "");
        assert!(strings_at(&v, &["pt", "body"]).is_empty());
    }
}
