//! Workflow and workflow-run processing.

use anyhow::Result;
use serde_json::Value;

use super::{actor_or_default, add_user};
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one workflow document with its runs embedded.
pub fn process_workflow(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    let workflow = Node::new(NodeKind::Workflow).with(data);
    let workflow_key = workflow.key();
    storage.add_node(&workflow)?;

    let has_workflow =
        Relationship::new(RelationshipKind::ProjectHasWorkflow, project_id, &workflow_key);
    storage.add_relationship(&has_workflow)?;

    for run in data
        .get("workflowRuns")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
    {
        process_workflow_run(storage, &workflow_key, &run)?;
    }
    Ok(())
}

fn process_workflow_run(
    storage: &mut PreprocessorStorage,
    workflow_key: &str,
    data: &Value,
) -> Result<()> {
    let run = Node::new(NodeKind::WorkflowRun).with(data);
    let run_key = run.key();
    storage.add_node(&run)?;

    if let Some(head_commit) = data.get("headCommit").and_then(Value::as_str) {
        if !head_commit.is_empty() {
            let has_head = Relationship::new(
                RelationshipKind::WorkflowRunHasHeadCommit,
                &run_key,
                head_commit,
            );
            storage.add_relationship(&has_head)?;
        }
    }

    let actor = actor_or_default(data.get("actor"));
    let actor_key = add_user(storage, &actor)?;
    let creates = Relationship::new(RelationshipKind::CreatesWorkflowRun, actor_key, &run_key)
        .with(data);
    storage.add_relationship(&creates)?;

    let triggering_actor = actor_or_default(data.get("triggeringActor"));
    let triggering_key = add_user(storage, &triggering_actor)?;
    let triggers =
        Relationship::new(RelationshipKind::TriggersWorkflowRun, triggering_key, &run_key)
            .with(data);
    storage.add_relationship(&triggers)?;

    let has_run = Relationship::new(RelationshipKind::HasWorkflowRun, workflow_key, &run_key);
    storage.add_relationship(&has_run)?;
    Ok(())
}
