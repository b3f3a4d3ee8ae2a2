//! Pull-request file processing.
//!
//! A PullRequestFile is identified by a hash over its content attributes
//! together with the owning pull request's id, so the same path changed
//! by two pull requests stays two nodes.

use anyhow::Result;
use serde_json::Value;

use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one file action captured by the REST patch pass, which tags
/// each document with its pull request's node id.
pub fn process_pull_request_file(storage: &mut PreprocessorStorage, data: &Value) -> Result<()> {
    let Some(pull_request_id) = data.get("pullRequestId").and_then(Value::as_str) else {
        return Ok(());
    };
    add_pull_request_file(storage, &pull_request_id.to_string(), data)
}

/// Create the PullRequestFile node and its PROPOSES_CHANGE edge.
pub(crate) fn add_pull_request_file(
    storage: &mut PreprocessorStorage,
    pull_request_key: &str,
    data: &Value,
) -> Result<()> {
    let mut file = Node::new(NodeKind::PullRequestFile).with(data);
    file.set("pullRequestId", &Value::String(pull_request_key.to_string()));
    file.derive_key_from_content();
    storage.add_node(&file)?;

    let proposes = Relationship::new(
        RelationshipKind::PullRequestProposesFileChange,
        pull_request_key,
        file.key(),
    );
    storage.add_relationship(&proposes)?;
    Ok(())
}
