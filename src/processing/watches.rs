//! Watcher processing.

use anyhow::Result;
use serde_json::Value;

use super::add_user;
use crate::graph::{Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one watchers connection document (`{"nodes": [...]}`).
pub fn process_watchers(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    for watcher in data.get("nodes").and_then(Value::as_array).cloned().unwrap_or_default() {
        if watcher.is_null() {
            continue;
        }
        let user_key = add_user(storage, &watcher)?;
        let watches = Relationship::new(RelationshipKind::WatchesProject, user_key, project_id);
        storage.add_relationship(&watches)?;
    }
    Ok(())
}
