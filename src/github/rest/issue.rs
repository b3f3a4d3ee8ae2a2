//! REST fall-back for issues whose nested lists overflowed the GraphQL
//! page limits.
//!
//! The document returned here is shape-identical to the GraphQL issues
//! connection (same keys, casing and `nodes` wrappers), so processors
//! never learn which source produced a record.

use anyhow::Result;
use serde_json::{Value, json};

use super::milestone_document;
use super::wrapper::RestWrapper;
use crate::github::graphql::{json_path, json_path_str};

/// Fetch one issue and its labels, timeline, assignees and comments,
/// normalized to the unified shape.
pub async fn issue_document(wrapper: &mut RestWrapper, number: i64) -> Result<Value> {
    let issue = wrapper
        .get_json(&wrapper.repo_path(&format!("/issues/{number}")))
        .await?;
    let timeline = issue_timeline(wrapper, number).await?;
    let comments = issue_comments(wrapper, number).await?;

    Ok(json!({
        "nodes": [
            {
                "id": json_path_str(&issue, &["node_id"]).unwrap_or(""),
                "number": json_path(&issue, &["number"]).cloned().unwrap_or(json!(-1)),
                "title": json_path_str(&issue, &["title"]).unwrap_or(""),
                "body": json_path_str(&issue, &["body"]).unwrap_or(""),
                "state": json_path_str(&issue, &["state"]).unwrap_or("").to_uppercase(),
                "createdAt": json_path_str(&issue, &["created_at"]).unwrap_or(""),
                "milestone": milestone_document(issue.get("milestone")),
                "timelineItems": {"nodes": timeline},
                "author": actor_document(issue.get("user")),
                "assignees": {"nodes": issue_assignees(&issue)},
                "labels": {"nodes": issue_labels(&issue)},
                "comments": {"nodes": comments},
            }
        ]
    }))
}

/// `user`-object style actor reference normalized to the GraphQL actor
/// shape; None maps to null so the sentinel substitution happens in one
/// place downstream.
pub(super) fn actor_document(raw: Option<&Value>) -> Value {
    match raw {
        Some(user) if user.is_object() => json!({
            "id": json_path_str(user, &["node_id"]).unwrap_or(""),
            "login": json_path_str(user, &["login"]).unwrap_or(""),
            "name": "",
            "email": "",
        }),
        _ => Value::Null,
    }
}

fn issue_labels(issue: &Value) -> Vec<Value> {
    json_path(issue, &["labels"])
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .map(|label| {
                    json!({
                        "id": json_path_str(label, &["node_id"]).unwrap_or(""),
                        "name": json_path_str(label, &["name"]).unwrap_or(""),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn issue_assignees(issue: &Value) -> Vec<Value> {
    json_path(issue, &["assignees"])
        .and_then(Value::as_array)
        .map(|assignees| {
            assignees
                .iter()
                .filter(|assignee| {
                    json_path_str(assignee, &["node_id"]).is_some_and(|id| !id.is_empty())
                })
                .map(|assignee| {
                    json!({
                        "id": json_path_str(assignee, &["node_id"]).unwrap_or(""),
                        "login": json_path_str(assignee, &["login"]).unwrap_or(""),
                        "name": "",
                        "email": "",
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn issue_timeline(wrapper: &mut RestWrapper, number: i64) -> Result<Vec<Value>> {
    let events = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/issues/{number}/events")))
        .await?;
    Ok(events
        .iter()
        .filter_map(|event| {
            let name = json_path_str(event, &["event"])?;
            match name {
                "closed" => Some(json!({
                    "__typename": "ClosedEvent",
                    "id": json_path_str(event, &["node_id"]).unwrap_or(""),
                    "createdAt": json_path_str(event, &["created_at"]).unwrap_or(""),
                    "actor": actor_document(event.get("actor")),
                })),
                "converted_to_discussion" => Some(json!({
                    "__typename": "ConvertedToDiscussionEvent",
                    "id": json_path_str(event, &["node_id"]).unwrap_or(""),
                })),
                _ => None,
            }
        })
        .collect())
}

async fn issue_comments(wrapper: &mut RestWrapper, number: i64) -> Result<Vec<Value>> {
    let comments = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/issues/{number}/comments")))
        .await?;
    Ok(comments
        .iter()
        .map(|comment| {
            json!({
                "id": json_path_str(comment, &["node_id"]).unwrap_or(""),
                "createdAt": json_path_str(comment, &["created_at"]).unwrap_or(""),
                "body": json_path_str(comment, &["body"]).unwrap_or(""),
                "author": actor_document(comment.get("user")),
            })
        })
        .collect())
}
