//! REST fall-back for pull requests, shape-identical to the GraphQL
//! pullRequests connection.
//!
//! The one wrinkle the normalization has to absorb: review comments in
//! the REST API refer to their parent through the REST-scoped numeric
//! id, while GraphQL uses the stable node id. A first pass over all
//! review comments builds the `{rest id -> node id}` map, then every
//! `replyTo.id` is rewritten through it; ids absent from the map become
//! null.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::{Value, json};

use super::issue::actor_document;
use super::milestone_document;
use super::wrapper::RestWrapper;
use crate::github::graphql::{json_path, json_path_str};

/// Fetch one pull request with reviewers, assignees, comments, timeline,
/// reviews (with their comments), labels and files, normalized to the
/// unified shape.
pub async fn pull_request_document(wrapper: &mut RestWrapper, number: i64) -> Result<Value> {
    let pull_request = wrapper
        .get_json(&wrapper.repo_path(&format!("/pulls/{number}")))
        .await?;

    let review_comments = review_comments(wrapper, number).await?;
    let reviews = reviews(wrapper, number, &review_comments).await?;
    let comments = pull_request_comments(wrapper, number).await?;
    let timeline = pull_request_timeline(wrapper, number).await?;
    let labels = pull_request_labels(wrapper, number).await?;
    let files = pull_request_files(wrapper, number).await?;

    Ok(json!({
        "nodes": [
            {
                "id": json_path_str(&pull_request, &["node_id"]).unwrap_or(""),
                "mergedAt": json_path_str(&pull_request, &["merged_at"]).unwrap_or(""),
                "number": json_path(&pull_request, &["number"]).cloned().unwrap_or(json!(-1)),
                "title": json_path_str(&pull_request, &["title"]).unwrap_or(""),
                "body": json_path_str(&pull_request, &["body"]).unwrap_or(""),
                "isDraft": json_path(&pull_request, &["draft"]).cloned().unwrap_or(json!(false)),
                "locked": json_path(&pull_request, &["locked"]).cloned().unwrap_or(json!(false)),
                "createdAt": json_path_str(&pull_request, &["created_at"]).unwrap_or(""),
                "activeLockReason": json_path_str(&pull_request, &["active_lock_reason"]).unwrap_or(""),
                "state": json_path_str(&pull_request, &["state"]).unwrap_or("").to_uppercase(),
                "baseRepository": {
                    "id": json_path(&pull_request, &["base", "repo", "node_id"]).cloned().unwrap_or(Value::Null),
                    "url": json_path_str(&pull_request, &["base", "repo", "html_url"]).unwrap_or(""),
                },
                "headRepository": {
                    "id": json_path(&pull_request, &["head", "repo", "node_id"]).cloned().unwrap_or(Value::Null),
                    "url": json_path_str(&pull_request, &["head", "repo", "html_url"]).unwrap_or(""),
                },
                "headRefOid": json_path_str(&pull_request, &["head", "sha"]).unwrap_or(""),
                "headRefName": json_path(&pull_request, &["head", "ref"]).cloned().unwrap_or(Value::Null),
                "baseRefOid": json_path_str(&pull_request, &["base", "sha"]).unwrap_or(""),
                "baseRefName": json_path(&pull_request, &["base", "ref"]).cloned().unwrap_or(Value::Null),
                "author": actor_document(pull_request.get("user")),
                "reviewRequests": {"nodes": requested_reviewers(&pull_request)},
                "milestone": milestone_document(pull_request.get("milestone")),
                "assignees": {"nodes": assignees(&pull_request)},
                "comments": {"nodes": comments},
                "timelineItems": {"nodes": timeline},
                "reviews": {"nodes": reviews},
                "labels": {"nodes": labels},
                "files": {"nodes": files},
            }
        ]
    }))
}

fn requested_reviewers(pull_request: &Value) -> Vec<Value> {
    json_path(pull_request, &["requested_reviewers"])
        .and_then(Value::as_array)
        .map(|reviewers| {
            reviewers
                .iter()
                .filter(|reviewer| {
                    json_path_str(reviewer, &["node_id"]).is_some_and(|id| !id.is_empty())
                })
                .map(|reviewer| json!({"requestedReviewer": actor_document(Some(reviewer))}))
                .collect()
        })
        .unwrap_or_default()
}

fn assignees(pull_request: &Value) -> Vec<Value> {
    json_path(pull_request, &["assignees"])
        .and_then(Value::as_array)
        .map(|assignees| {
            assignees
                .iter()
                .filter(|assignee| {
                    json_path_str(assignee, &["node_id"]).is_some_and(|id| !id.is_empty())
                })
                .map(|assignee| actor_document(Some(assignee)))
                .collect()
        })
        .unwrap_or_default()
}

async fn pull_request_comments(wrapper: &mut RestWrapper, number: i64) -> Result<Vec<Value>> {
    let comments = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/issues/{number}/comments")))
        .await?;
    Ok(comments
        .iter()
        .map(|comment| {
            json!({
                "id": json_path_str(comment, &["node_id"]).unwrap_or(""),
                "body": json_path_str(comment, &["body"]).unwrap_or(""),
                "createdAt": json_path_str(comment, &["created_at"]).unwrap_or(""),
                "author": actor_document(comment.get("user")),
            })
        })
        .collect())
}

async fn pull_request_timeline(wrapper: &mut RestWrapper, number: i64) -> Result<Vec<Value>> {
    let events = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/issues/{number}/events")))
        .await?;
    Ok(events
        .iter()
        .filter_map(|event| {
            let name = json_path_str(event, &["event"])?;
            match name {
                "merged" => Some(json!({
                    "__typename": "MergedEvent",
                    "id": json_path_str(event, &["node_id"]).unwrap_or(""),
                    "createdAt": json_path_str(event, &["created_at"]).unwrap_or(""),
                    "actor": actor_document(event.get("actor")),
                    "commit": {"oid": json_path_str(event, &["commit_id"]).unwrap_or("")},
                })),
                "closed" => Some(json!({
                    "__typename": "ClosedEvent",
                    "id": json_path_str(event, &["node_id"]).unwrap_or(""),
                    "createdAt": json_path_str(event, &["created_at"]).unwrap_or(""),
                    "actor": actor_document(event.get("actor")),
                })),
                _ => None,
            }
        })
        .collect())
}

async fn pull_request_labels(wrapper: &mut RestWrapper, number: i64) -> Result<Vec<Value>> {
    let labels = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/issues/{number}/labels")))
        .await?;
    Ok(labels
        .iter()
        .map(|label| {
            json!({
                "id": json_path_str(label, &["node_id"]).unwrap_or(""),
                "name": json_path_str(label, &["name"]).unwrap_or(""),
            })
        })
        .collect())
}

async fn pull_request_files(wrapper: &mut RestWrapper, number: i64) -> Result<Vec<Value>> {
    let files = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/pulls/{number}/files")))
        .await?;
    Ok(files
        .iter()
        .map(|file| {
            json!({
                "additions": json_path(file, &["additions"]).cloned().unwrap_or(json!(-1)),
                "deletions": json_path(file, &["deletions"]).cloned().unwrap_or(json!(-1)),
                "path": json_path_str(file, &["filename"]).unwrap_or(""),
                "changeType": json_path_str(file, &["status"]).unwrap_or(""),
            })
        })
        .collect())
}

/// Raw review comments normalized to the unified shape, with the
/// reply-to ids rewritten from REST-scoped numeric ids to node ids.
async fn review_comments(wrapper: &mut RestWrapper, number: i64) -> Result<Vec<Value>> {
    let comments = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/pulls/{number}/comments")))
        .await?;
    let mut normalized: Vec<Value> = comments
        .iter()
        .map(|comment| {
            json!({
                "pullRequestReviewID": json_path(comment, &["pull_request_review_id"]).cloned().unwrap_or(json!(-1)),
                "id": json_path_str(comment, &["node_id"]).unwrap_or(""),
                "rawId": json_path(comment, &["id"]).cloned().unwrap_or(json!("")),
                "body": json_path_str(comment, &["body"]).unwrap_or(""),
                "createdAt": json_path_str(comment, &["created_at"]).unwrap_or(""),
                "diffHunk": json_path_str(comment, &["diff_hunk"]).unwrap_or(""),
                "path": json_path_str(comment, &["path"]).unwrap_or(""),
                "startLine": json_path(comment, &["start_line"]).cloned().unwrap_or(json!(-1)),
                "originalStartLine": json_path(comment, &["original_start_line"]).cloned().unwrap_or(json!(-1)),
                "line": json_path(comment, &["line"]).cloned().unwrap_or(json!(-1)),
                "originalLine": json_path(comment, &["original_line"]).cloned().unwrap_or(json!(-1)),
                "author": actor_document(comment.get("user")),
                "replyTo": {
                    "id": json_path(comment, &["in_reply_to_id"])
                        .map(value_as_id_string)
                        .unwrap_or_default(),
                },
                "commit": {"oid": json_path_str(comment, &["commit_id"]).unwrap_or("")},
                "originalCommit": {"oid": json_path_str(comment, &["original_commit_id"]).unwrap_or("")},
            })
        })
        .collect();
    rewrite_reply_to_ids(&mut normalized);
    Ok(normalized)
}

fn value_as_id_string(value: &Value) -> Value {
    match value {
        Value::Number(n) => json!(n.to_string()),
        Value::String(s) => json!(s.clone()),
        _ => json!(""),
    }
}

/// Rewrite every `replyTo.id` from the REST numeric id to the stable
/// node id using the `{rawId -> id}` map over all comments of the pull
/// request. Ids not present in the map become null.
pub fn rewrite_reply_to_ids(comments: &mut [Value]) {
    let mut raw_to_node: HashMap<String, String> = HashMap::new();
    for comment in comments.iter() {
        let raw_id = match comment.get("rawId") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => continue,
        };
        if let Some(node_id) = json_path_str(comment, &["id"]) {
            raw_to_node.insert(raw_id, node_id.to_string());
        }
    }
    for comment in comments.iter_mut() {
        let old_id = json_path_str(comment, &["replyTo", "id"]).map(str::to_string);
        let new_id = old_id
            .as_deref()
            .and_then(|raw| raw_to_node.get(raw))
            .cloned();
        if let Some(reply_to) = comment.get_mut("replyTo") {
            reply_to["id"] = match new_id {
                Some(id) => json!(id),
                None => Value::Null,
            };
        }
    }
}

/// Reviews with their comments attached by `pull_request_review_id`.
async fn reviews(
    wrapper: &mut RestWrapper,
    number: i64,
    review_comments: &[Value],
) -> Result<Vec<Value>> {
    let reviews = wrapper
        .get_array_all(&wrapper.repo_path(&format!("/pulls/{number}/reviews")))
        .await?;
    Ok(reviews
        .iter()
        .map(|review| {
            let review_id = json_path(review, &["id"]).cloned().unwrap_or(json!(-1));
            let comments: Vec<Value> = review_comments
                .iter()
                .filter(|comment| comment.get("pullRequestReviewID") == Some(&review_id))
                .cloned()
                .collect();
            json!({
                "id": json_path_str(review, &["node_id"]).unwrap_or(""),
                "rawID": review_id,
                "state": json_path_str(review, &["state"]).unwrap_or("").to_uppercase(),
                "body": json_path_str(review, &["body"]).unwrap_or(""),
                "submittedAt": json_path_str(review, &["submitted_at"]).unwrap_or(""),
                "createdAt": json_path_str(review, &["submitted_at"]).unwrap_or(""),
                "author": actor_document(review.get("user")),
                "commit": {"oid": json_path_str(review, &["commit_id"]).unwrap_or("")},
                "comments": {"nodes": comments},
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(raw_id: i64, node_id: &str, reply_to: Option<i64>) -> Value {
        json!({
            "rawId": raw_id,
            "id": node_id,
            "replyTo": {"id": reply_to.map(|id| id.to_string()).unwrap_or_default()},
        })
    }

    #[test]
    fn reply_ids_are_rewritten_to_node_ids() {
        let mut comments = vec![
            comment(100, "PRRC_a", None),
            comment(101, "PRRC_b", Some(100)),
        ];
        rewrite_reply_to_ids(&mut comments);
        assert_eq!(comments[1]["replyTo"]["id"], json!("PRRC_a"));
    }

    #[test]
    fn unknown_reply_ids_become_null() {
        let mut comments = vec![comment(101, "PRRC_b", Some(999))];
        rewrite_reply_to_ids(&mut comments);
        assert_eq!(comments[0]["replyTo"]["id"], Value::Null);
    }

    #[test]
    fn comments_without_reply_become_null() {
        let mut comments = vec![comment(100, "PRRC_a", None)];
        rewrite_reply_to_ids(&mut comments);
        assert_eq!(comments[0]["replyTo"]["id"], Value::Null);
    }
}
