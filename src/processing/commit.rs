//! Commit processing.
//!
//! Commit content (hash, message, merge flag, month bucket, parent
//! edges) comes from the clone; author, committer and commit comments
//! arrive later from the REST metadata pass against the same commit
//! keys.

use anyhow::Result;
use serde_json::{Value, json};

use super::{actor_or_default, add_user};
use crate::clone::CommitSummary;
use crate::graph::data_type::month_floor;
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one commit object from the clone.
pub fn process_commit_content(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    commit: &CommitSummary,
) -> Result<()> {
    let commit_node = Node::new(NodeKind::Commit).with(&json!({
        "hash": commit.hash,
        "message": commit.message,
        "merge": commit.parent_hashes.len() > 1,
    }));
    storage.add_node(&commit_node)?;

    let bucket_id = storage.commit_time_bucket_id(&commit.committed_at);
    let (year, month) = year_month(&commit.committed_at);
    let bucket = Node::new(NodeKind::ProjectCommitMonth).with(&json!({
        "id": bucket_id,
        "year": year,
        "month": month,
    }));
    storage.add_node(&bucket)?;

    let in_month = Relationship::new(RelationshipKind::CommitInMonth, commit_node.key(), bucket.key());
    storage.add_relationship(&in_month)?;

    let mut has_month =
        Relationship::new(RelationshipKind::ProjectHasCommitMonth, project_id, bucket.key());
    has_month.set("date_month", &json!(month_floor(&commit.committed_at)));
    storage.add_relationship(&has_month)?;

    for parent in &commit.parent_hashes {
        let parent_of = Relationship::new(RelationshipKind::ParentOf, parent, commit.hash.clone());
        storage.add_relationship(&parent_of)?;
    }
    Ok(())
}

/// Process one commit metadata document from the REST pass.
pub fn process_commit_meta(storage: &mut PreprocessorStorage, data: &Value) -> Result<()> {
    let Some(commit_hash) = data.get("hash").and_then(Value::as_str) else {
        return Ok(());
    };

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let author_of =
        Relationship::new(RelationshipKind::AuthorOfCommit, author_key, commit_hash).with(data);
    storage.add_relationship(&author_of)?;

    let committer = actor_or_default(data.get("committer"));
    let committer_key = add_user(storage, &committer)?;
    let committer_of =
        Relationship::new(RelationshipKind::CommitterOfCommit, committer_key, commit_hash)
            .with(data);
    storage.add_relationship(&committer_of)?;

    for comment in data
        .get("commitComments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
    {
        let commenter = actor_or_default(comment.get("user"));
        let commenter_key = add_user(storage, &commenter)?;
        let comments_on =
            Relationship::new(RelationshipKind::CommentsOnCommit, commenter_key, commit_hash)
                .with(&comment);
        storage.add_relationship(&comments_on)?;
    }
    Ok(())
}

/// (year, month) of a `YYYY-MM-DD...` timestamp, or (-1, -1).
pub(crate) fn year_month(timestamp: &str) -> (i64, i64) {
    let year = timestamp.get(0..4).and_then(|s| s.parse().ok()).unwrap_or(-1);
    let month = timestamp.get(5..7).and_then(|s| s.parse().ok()).unwrap_or(-1);
    (year, month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_extraction() {
        assert_eq!(year_month("2023-04-05T06:07:08Z"), (2023, 4));
        assert_eq!(year_month("bad"), (-1, -1));
    }
}
