//! GraphQL side of the dual-source collection engine.

pub mod collector;
pub mod discussion;
pub mod project;
pub mod query_tree;
pub mod wrapper;

pub use collector::{DiscussionPager, GraphQlCollector, GraphQlPager};
pub use query_tree::{GraphQlQueryTree, SecondaryRootKind};
pub use wrapper::GraphQlWrapper;

use serde::{Deserialize, Serialize};

/// Request payload of a GraphQL call.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlPayload {
    pub query: String,
}

/// Response envelope of a GraphQL call.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<serde_json::Value>,
    pub errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorEntry {
    pub message: String,
}

/// Walk `path` through nested JSON objects, returning None when any step
/// is missing or null.
pub fn json_path<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// String at `path`, or None.
pub fn json_path_str<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    json_path(value, path).and_then(serde_json::Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_path_walks_and_rejects_nulls() {
        let doc = json!({"a": {"b": {"c": 1, "n": null}}});
        assert_eq!(json_path(&doc, &["a", "b", "c"]), Some(&json!(1)));
        assert_eq!(json_path(&doc, &["a", "b", "n"]), None);
        assert_eq!(json_path(&doc, &["a", "missing"]), None);
        assert_eq!(json_path_str(&json!({"s": "x"}), &["s"]), Some("x"));
    }
}
