//! The per-invocation request handed to a command handler.

use serde::Serialize;
use serde_json::{Map, Value};

/// Parsed option values plus the positional arguments left after parsing.
///
/// Option builders seed defaults (`req.set("count_blank_lines", true)`), flag
/// actions overwrite or append to them, and the dispatcher fills in
/// [`args`](Request::args) before handing the request to the handler. A
/// request is never reused across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Request {
    options: Map<String, Value>,
    args: Vec<String>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.options.remove(key)
    }

    /// Returns true only if the option is set to boolean `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.options.get(key), Some(Value::Bool(true)))
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Returns the string members of a list option (empty if unset).
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.options
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Appends to a list option, creating it (or replacing a scalar) as needed.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let slot = self
            .options
            .entry(key.into())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.push(value.into()),
            other => *other = Value::Array(vec![value.into()]),
        }
        self
    }

    /// Empties a list option, leaving it present.
    pub fn clear(&mut self, key: impl Into<String>) -> &mut Self {
        self.options.insert(key.into(), Value::Array(Vec::new()));
        self
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Positional arguments, in the order the user gave them.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_read() {
        let mut req = Request::new();
        req.set("count_blank_lines", true).set("name", "src");

        assert!(req.flag("count_blank_lines"));
        assert_eq!(req.text("name"), Some("src"));
        assert!(!req.flag("name"));
        assert!(!req.flag("missing"));
        assert!(req.contains("name"));
    }

    #[test]
    fn test_list_push_and_clear() {
        let mut req = Request::new();
        req.push("exclude_dirs", ".*");
        req.push("exclude_dirs", "target");
        assert_eq!(req.list("exclude_dirs"), vec![".*", "target"]);

        req.clear("exclude_dirs");
        assert!(req.list("exclude_dirs").is_empty());
        assert!(req.contains("exclude_dirs"));
    }

    #[test]
    fn test_push_replaces_scalar() {
        let mut req = Request::new();
        req.set("names", "a");
        req.push("names", "b");
        assert_eq!(req.get("names"), Some(&json!(["b"])));
    }

    #[test]
    fn test_serializes() {
        let mut req = Request::new();
        req.set("verbose", false);
        req.set_args(vec!["src/".into()]);

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"options": {"verbose": false}, "args": ["src/"]})
        );
    }
}
