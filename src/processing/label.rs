//! Repository label processing.

use anyhow::Result;
use serde_json::Value;

use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one labels connection document (`{"nodes": [...]}`).
pub fn process_labels(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    for label_data in data.get("nodes").and_then(Value::as_array).cloned().unwrap_or_default() {
        if label_data.is_null() {
            continue;
        }
        let label = Node::new(NodeKind::Label).with(&label_data);
        storage.add_node(&label)?;
        let has_label =
            Relationship::new(RelationshipKind::ProjectHasLabel, project_id, label.key());
        storage.add_relationship(&has_label)?;
    }
    Ok(())
}
