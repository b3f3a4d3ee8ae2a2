//! Issue processing.
//!
//! Both the GraphQL issues connection and the REST fall-back feed the
//! same document shape through here. The issue node itself is written
//! last so a ConvertedToDiscussionEvent seen in the timeline can still
//! flip its flag.

use anyhow::Result;
use serde_json::{Value, json};

use super::commit::year_month;
use super::{MilestoneTarget, actor_or_default, add_user, connection_nodes, process_milestone};
use crate::graph::data_type::month_floor;
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one issues connection document (`{"nodes": [...]}`).
pub fn process_issues(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    for issue in data.get("nodes").and_then(Value::as_array).cloned().unwrap_or_default() {
        if issue.is_null() {
            continue;
        }
        process_issue(storage, project_id, &issue)?;
    }
    Ok(())
}

fn process_issue(storage: &mut PreprocessorStorage, project_id: &str, data: &Value) -> Result<()> {
    let mut issue = Node::new(NodeKind::Issue).with(data);
    let issue_key = issue.key();

    if let Some(created_at) = data.get("createdAt").and_then(Value::as_str) {
        let bucket_id = storage.issue_time_bucket_id(created_at);
        let (year, month) = year_month(created_at);
        let bucket = Node::new(NodeKind::ProjectIssueMonth).with(&json!({
            "id": bucket_id,
            "year": year,
            "month": month,
        }));
        storage.add_node(&bucket)?;

        let in_month = Relationship::new(RelationshipKind::IssueInMonth, &issue_key, bucket.key());
        storage.add_relationship(&in_month)?;

        let mut has_month =
            Relationship::new(RelationshipKind::ProjectHasIssueMonth, project_id, bucket.key());
        has_month.set("date_month", &json!(month_floor(created_at)));
        storage.add_relationship(&has_month)?;
    }

    if let Some(milestone_data) = data.get("milestone").filter(|v| v.is_object()) {
        process_milestone(
            storage,
            project_id,
            milestone_data,
            &issue_key,
            MilestoneTarget::Issue,
        )?;
    }

    for event in connection_nodes(data, "timelineItems") {
        process_timeline_item(storage, &issue_key, &mut issue, &event)?;
    }

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let creates = Relationship::new(RelationshipKind::CreatesIssue, author_key, &issue_key).with(data);
    storage.add_relationship(&creates)?;

    for assignee in connection_nodes(data, "assignees") {
        let assignee_key = add_user(storage, &assignee)?;
        let assigned =
            Relationship::new(RelationshipKind::GetsAssignedIssue, assignee_key, &issue_key);
        storage.add_relationship(&assigned)?;
    }

    for label_data in connection_nodes(data, "labels") {
        let label = Node::new(NodeKind::Label).with(&label_data);
        storage.add_node(&label)?;
        let has_label = Relationship::new(RelationshipKind::IssueHasLabel, &issue_key, label.key());
        storage.add_relationship(&has_label)?;
    }

    for comment in connection_nodes(data, "comments") {
        let commenter = actor_or_default(comment.get("author"));
        let commenter_key = add_user(storage, &commenter)?;
        let comments_on =
            Relationship::new(RelationshipKind::CommentsOnIssue, commenter_key, &issue_key)
                .with(&comment);
        storage.add_relationship(&comments_on)?;
    }

    // Written last so convertedToDiscussion reflects the timeline.
    storage.add_node(&issue)?;
    Ok(())
}

fn process_timeline_item(
    storage: &mut PreprocessorStorage,
    issue_key: &str,
    issue: &mut Node,
    event: &Value,
) -> Result<()> {
    match event.get("__typename").and_then(Value::as_str) {
        Some("ClosedEvent") => {
            let actor = actor_or_default(event.get("actor"));
            let actor_key = add_user(storage, &actor)?;
            let closes =
                Relationship::new(RelationshipKind::ClosesIssue, actor_key, issue_key).with(event);
            storage.add_relationship(&closes)?;
        }
        Some("ConvertedToDiscussionEvent") => {
            issue.set("convertedToDiscussion", &json!(true));
        }
        _ => {}
    }
    Ok(())
}
