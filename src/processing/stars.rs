//! Stargazer processing.

use anyhow::Result;
use serde_json::Value;

use super::add_user;
use crate::graph::{Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one stargazers connection document (`{"nodes": [...]}`).
pub fn process_stargazers(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    for stargazer in data.get("nodes").and_then(Value::as_array).cloned().unwrap_or_default() {
        if stargazer.is_null() {
            continue;
        }
        let user_key = add_user(storage, &stargazer)?;
        let stars = Relationship::new(RelationshipKind::StarsProject, user_key, project_id);
        storage.add_relationship(&stars)?;
    }
    Ok(())
}
