//! Branch processing: derived branch identity, head commit and
//! reachability edges.

use anyhow::Result;
use serde_json::json;

use crate::clone::BranchCommits;
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

pub fn process_branch(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    branch: &BranchCommits,
) -> Result<()> {
    let branch_id = storage.branch_id(project_id, &branch.name);
    let branch_node = Node::new(NodeKind::Branch).with(&json!({
        "id": branch_id,
        "name": branch.name,
    }));
    storage.add_node(&branch_node)?;

    let has_branch = Relationship::new(RelationshipKind::ProjectHasBranch, project_id, branch_node.key());
    storage.add_relationship(&has_branch)?;

    let head = Relationship::new(
        RelationshipKind::BranchHeadCommit,
        branch_node.key(),
        branch.head_commit_sha.clone(),
    );
    storage.add_relationship(&head)?;

    for commit_sha in &branch.commit_shas {
        let contains = Relationship::new(
            RelationshipKind::BranchContainsCommit,
            branch_node.key(),
            commit_sha.clone(),
        );
        storage.add_relationship(&contains)?;
    }
    Ok(())
}
