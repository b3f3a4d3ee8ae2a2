//! Release processing: the node, its project edge, the tagged commit
//! and the publishing user.

use anyhow::Result;
use serde_json::Value;

use super::{actor_or_default, add_user};
use crate::github::graphql::json_path_str;
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one releases connection document (`{"nodes": [...]}`).
pub fn process_releases(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    for release_data in data.get("nodes").and_then(Value::as_array).cloned().unwrap_or_default()
    {
        if release_data.is_null() {
            continue;
        }
        let release = Node::new(NodeKind::Release).with(&release_data);
        storage.add_node(&release)?;

        let has_release =
            Relationship::new(RelationshipKind::ProjectHasRelease, project_id, release.key());
        storage.add_relationship(&has_release)?;

        if let Some(tag_commit) = json_path_str(&release_data, &["tagCommit", "oid"]) {
            if !tag_commit.is_empty() {
                let tags =
                    Relationship::new(RelationshipKind::ReleaseTagsCommit, release.key(), tag_commit);
                storage.add_relationship(&tags)?;
            }
        }

        let author = actor_or_default(release_data.get("author"));
        let author_key = add_user(storage, &author)?;
        let creates = Relationship::new(RelationshipKind::CreatesRelease, author_key, release.key())
            .with(&release_data);
        storage.add_relationship(&creates)?;
    }
    Ok(())
}
