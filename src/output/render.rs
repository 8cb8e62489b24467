//! Placeholder substitution for generated files.
//!
//! Templates reference bound values as `{{ key }}` or `{{ a.b }}`. A reference
//! to a key missing from the binding is an error rather than an empty string.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("template references unknown key '{0}'")]
    UnknownKey(String),

    #[error("key '{0}' is bound to a structured value")]
    NotScalar(String),
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("valid regex"))
}

pub fn render(template: &str, binding: &Value) -> Result<String, RenderError> {
    let mut error = None;
    let rendered = placeholder().replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match lookup(binding, key).map(scalar) {
            Some(Some(text)) => text,
            Some(None) => {
                error.get_or_insert(RenderError::NotScalar(key.to_string()));
                String::new()
            }
            None => {
                error.get_or_insert(RenderError::UnknownKey(key.to_string()));
                String::new()
            }
        }
    });
    match error {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

fn lookup<'a>(binding: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(binding, |value, segment| value.as_object()?.get(segment))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitutes_scalars() {
        let out = render(
            "FROM {{ image }}:{{tag}}\nEXPOSE {{ port }}",
            &json!({"image": "temurin", "tag": "17-jre", "port": 8080}),
        )
        .unwrap();
        assert_eq!(out, "FROM temurin:17-jre\nEXPOSE 8080");
    }

    #[test]
    fn test_dotted_lookup() {
        let out = render("{{ build.name }}", &json!({"build": {"name": "builder"}})).unwrap();
        assert_eq!(out, "builder");
    }

    #[test]
    fn test_unknown_key_is_error() {
        let err = render("{{ missing }}", &json!({})).unwrap_err();
        assert_eq!(err, RenderError::UnknownKey("missing".to_string()));
    }

    #[test]
    fn test_structured_value_is_error() {
        let err = render("{{ env }}", &json!({"env": ["A"]})).unwrap_err();
        assert_eq!(err, RenderError::NotScalar("env".to_string()));
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        let text = "RUN echo ${HOME} {not a placeholder}";
        assert_eq!(render(text, &json!({})).unwrap(), text);
    }
}
