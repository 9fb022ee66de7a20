//! Uniform access to request parameters.
//!
//! GET query strings and POST JSON bodies are both normalised into a
//! [`Params`] map so that the policy validator and the business rules read
//! fields the same way regardless of the verb.

use serde_json::{Map, Value};

/// Request parameters keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Wrap an already-parsed JSON object.
    pub fn from_object(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from decoded query pairs. A repeated key keeps its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self(map)
    }

    /// Trimmed string form of a field, `None` when absent or blank.
    ///
    /// Numbers and booleans are rendered with their JSON text so that a
    /// client sending `"active": false` or `"id": 42` is read consistently.
    pub fn text(&self, key: &str) -> Option<String> {
        let rendered = match self.0.get(key)? {
            Value::String(s) => s.trim().to_owned(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };
        (!rendered.is_empty()).then_some(rendered)
    }

    /// Boolean form of a field. Accepts `true/1/yes/on` (case-insensitive).
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_i64().is_some_and(|v| v != 0)),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(matches!(
                        s.to_ascii_lowercase().as_str(),
                        "true" | "1" | "yes" | "on"
                    ))
                }
            }
            _ => None,
        }
    }

    /// Whether the field is present with a non-blank value.
    pub fn has(&self, key: &str) -> bool {
        self.text(key).is_some()
    }

    /// Insert or replace a raw value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Borrow the underlying JSON object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying JSON object.
    pub fn into_object(self) -> Map<String, Value> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(v: Value) -> Params {
        match v {
            Value::Object(m) => Params::from_object(m),
            _ => unreachable!(),
        }
    }

    #[test]
    fn text_trims_and_drops_blank() {
        let p = params(json!({"a": "  6F ", "b": "   ", "c": null, "d": 7, "e": [1]}));
        assert_eq!(p.text("a").as_deref(), Some("6F"));
        assert_eq!(p.text("b"), None);
        assert_eq!(p.text("c"), None);
        assert_eq!(p.text("d").as_deref(), Some("7"));
        assert_eq!(p.text("e"), None);
        assert_eq!(p.text("missing"), None);
    }

    #[test]
    fn flag_accepts_common_spellings() {
        let p = params(json!({"a": "1", "b": "false", "c": true, "d": 0, "e": "ON", "f": ""}));
        assert_eq!(p.flag("a"), Some(true));
        assert_eq!(p.flag("b"), Some(false));
        assert_eq!(p.flag("c"), Some(true));
        assert_eq!(p.flag("d"), Some(false));
        assert_eq!(p.flag("e"), Some(true));
        assert_eq!(p.flag("f"), None);
    }

    #[test]
    fn pairs_keep_last_value() {
        let p = Params::from_pairs([("floor", "6F"), ("floor", "7F")]);
        assert_eq!(p.text("floor").as_deref(), Some("7F"));
    }
}
