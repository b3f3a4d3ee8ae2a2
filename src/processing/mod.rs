//! Hierarchical processors turning response documents into graph
//! operations.
//!
//! One module per subject. A root processor walks a response document,
//! emits `add_node`/`add_relationship` calls against the preprocessor
//! storage and hands child processors the parent node key so they can
//! attach relationships without any object graph.

pub mod branch;
pub mod commit;
pub mod commit_file;
pub mod dependency;
pub mod discussion;
pub mod issue;
pub mod label;
pub mod project;
pub mod pull_request;
pub mod pull_request_file;
pub mod release;
pub mod stars;
pub mod watches;
pub mod workflow;

use anyhow::Result;
use serde_json::Value;

use crate::graph::{Node, NodeKind, Relationship, RelationshipKind, default_user_document};
use crate::storage::PreprocessorStorage;

/// An actor document, or the sentinel user when the actor was deleted or
/// never present.
pub(crate) fn actor_or_default(raw: Option<&Value>) -> Value {
    match raw {
        Some(actor) if actor.is_object() && !actor.as_object().is_some_and(|o| o.is_empty()) => {
            actor.clone()
        }
        _ => default_user_document(),
    }
}

/// Create the User node for an actor document and return its key.
pub(crate) fn add_user(storage: &mut PreprocessorStorage, actor: &Value) -> Result<String> {
    let user = Node::new(NodeKind::User).with(actor);
    storage.add_node(&user)?;
    Ok(user.key())
}

/// Which parent a milestone REQUIRES edge points at.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MilestoneTarget {
    Issue,
    PullRequest,
}

/// Shared milestone handling for issues and pull requests: the node,
/// its creator, the project edge and the REQUIRES edge to the parent.
pub(crate) fn process_milestone(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    milestone_data: &Value,
    parent_key: &str,
    target: MilestoneTarget,
) -> Result<()> {
    let milestone = Node::new(NodeKind::Milestone).with(milestone_data);
    storage.add_node(&milestone)?;

    let creator = actor_or_default(milestone_data.get("creator"));
    let creator_key = add_user(storage, &creator)?;
    let creates = Relationship::new(RelationshipKind::CreatesMilestone, creator_key, milestone.key())
        .with(milestone_data);
    storage.add_relationship(&creates)?;

    let has_milestone = Relationship::new(
        RelationshipKind::ProjectHasMilestone,
        project_id,
        milestone.key(),
    );
    storage.add_relationship(&has_milestone)?;

    let requires_kind = match target {
        MilestoneTarget::Issue => RelationshipKind::RequiresIssue,
        MilestoneTarget::PullRequest => RelationshipKind::RequiresPullRequest,
    };
    let requires = Relationship::new(requires_kind, milestone.key(), parent_key);
    storage.add_relationship(&requires)?;
    Ok(())
}

/// Nodes array of a GraphQL-style connection, or empty.
pub(crate) fn connection_nodes(document: &Value, connection: &str) -> Vec<Value> {
    document
        .get(connection)
        .and_then(|value| value.get("nodes"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
