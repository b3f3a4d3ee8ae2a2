//! File action processing.
//!
//! Before and after File nodes are identified by a hash over their
//! content attributes, so identical content deduplicates across
//! repositories. The FileAction itself gets a fresh UUID per change.

use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use crate::clone::FileChange;
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

pub fn process_file_action(storage: &mut PreprocessorStorage, change: &FileChange) -> Result<()> {
    let mut file_before = Node::new(NodeKind::File).with(&json!({
        "mimeType": change.mime_type_before,
        "path": change.path_before,
        "fileSha": change.file_sha_before,
        "fileSize": change.file_size_before,
    }));
    file_before.derive_key_from_content();
    storage.add_node(&file_before)?;

    let mut file_after = Node::new(NodeKind::File).with(&json!({
        "mimeType": change.mime_type_after,
        "path": change.path_after,
        "fileSha": change.file_sha_after,
        "fileSize": change.file_size_after,
    }));
    file_after.derive_key_from_content();
    storage.add_node(&file_after)?;

    let file_action = Node::new(NodeKind::FileAction).with(&json!({
        "fileActionId": Uuid::new_v4().to_string(),
        "changeType": change.change_type,
        "copiedFile": change.copied_file,
        "renamedFile": change.renamed_file,
        "newFile": change.new_file,
        "deletedFile": change.deleted_file,
        "diff": change.diff,
        "addedLines": change.added_lines,
        "deletedLines": change.deleted_lines,
    }));
    storage.add_node(&file_action)?;

    // A new file has no before state, a deleted one no after state.
    if !change.new_file {
        let before = Relationship::new(
            RelationshipKind::FileBeforeAction,
            file_action.key(),
            file_before.key(),
        );
        storage.add_relationship(&before)?;
    }
    if !change.deleted_file {
        let after = Relationship::new(
            RelationshipKind::FileAfterAction,
            file_action.key(),
            file_after.key(),
        );
        storage.add_relationship(&after)?;
    }

    let performs = Relationship::new(
        RelationshipKind::PerformsFileAction,
        change.child_commit_sha.clone(),
        file_action.key(),
    );
    storage.add_relationship(&performs)?;
    Ok(())
}
