//! Pull request processing.
//!
//! The widest processor: besides everything an issue carries, a pull
//! request links to its base and head branches and commits, requested
//! reviewers, reviews with their comment trees, and its file changes
//! (inline, unless patch capture defers them to the REST pass).

use anyhow::Result;
use serde_json::{Value, json};

use super::commit::year_month;
use super::pull_request_file::add_pull_request_file;
use super::{MilestoneTarget, actor_or_default, add_user, connection_nodes, process_milestone};
use crate::github::graphql::{json_path, json_path_str};
use crate::graph::data_type::month_floor;
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one pullRequests connection document (`{"nodes": [...]}`).
/// When `defer_files` is set, file changes are skipped here and captured
/// later by the REST patch pass.
pub fn process_pull_requests(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
    defer_files: bool,
) -> Result<()> {
    for pull_request in data.get("nodes").and_then(Value::as_array).cloned().unwrap_or_default()
    {
        if pull_request.is_null() {
            continue;
        }
        process_pull_request(storage, project_id, &pull_request, defer_files)?;
    }
    Ok(())
}

fn process_pull_request(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
    defer_files: bool,
) -> Result<()> {
    let mut pull_request = Node::new(NodeKind::PullRequest).with(data);
    pull_request.set(
        "baseRepositoryURL",
        &json!(json_path_str(data, &["baseRepository", "url"]).unwrap_or("")),
    );
    pull_request.set(
        "headRepositoryURL",
        &json!(json_path_str(data, &["headRepository", "url"]).unwrap_or("")),
    );
    let pull_request_key = pull_request.key();
    storage.add_node(&pull_request)?;

    if let Some(created_at) = data.get("createdAt").and_then(Value::as_str) {
        let bucket_id = storage.pull_request_time_bucket_id(created_at);
        let (year, month) = year_month(created_at);
        let bucket = Node::new(NodeKind::ProjectPullRequestMonth).with(&json!({
            "id": bucket_id,
            "year": year,
            "month": month,
        }));
        storage.add_node(&bucket)?;

        let in_month =
            Relationship::new(RelationshipKind::PullRequestInMonth, &pull_request_key, bucket.key());
        storage.add_relationship(&in_month)?;

        let mut has_month = Relationship::new(
            RelationshipKind::ProjectHasPullRequestMonth,
            project_id,
            bucket.key(),
        );
        has_month.set("date_month", &json!(month_floor(created_at)));
        storage.add_relationship(&has_month)?;
    }

    process_branch_refs(storage, &pull_request_key, data)?;

    if let Some(base_oid) = data.get("baseRefOid").and_then(Value::as_str) {
        let base = Relationship::new(
            RelationshipKind::IsPullRequestBaseCommit,
            &pull_request_key,
            base_oid,
        );
        storage.add_relationship(&base)?;
    }
    if let Some(head_oid) = data.get("headRefOid").and_then(Value::as_str) {
        let head = Relationship::new(
            RelationshipKind::IsPullRequestHeadCommit,
            &pull_request_key,
            head_oid,
        );
        storage.add_relationship(&head)?;
    }

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let creates =
        Relationship::new(RelationshipKind::CreatesPullRequest, author_key, &pull_request_key)
            .with(data);
    storage.add_relationship(&creates)?;

    if let Some(milestone_data) = data.get("milestone").filter(|v| v.is_object()) {
        process_milestone(
            storage,
            project_id,
            milestone_data,
            &pull_request_key,
            MilestoneTarget::PullRequest,
        )?;
    }

    for request in connection_nodes(data, "reviewRequests") {
        let reviewer = actor_or_default(request.get("requestedReviewer"));
        let reviewer_key = add_user(storage, &reviewer)?;
        let requests =
            Relationship::new(RelationshipKind::RequestsReviewer, &pull_request_key, reviewer_key);
        storage.add_relationship(&requests)?;
    }

    for assignee in connection_nodes(data, "assignees") {
        let assignee_key = add_user(storage, &assignee)?;
        let assigned = Relationship::new(
            RelationshipKind::GetsAssignedPullRequest,
            assignee_key,
            &pull_request_key,
        );
        storage.add_relationship(&assigned)?;
    }

    for label_data in connection_nodes(data, "labels") {
        let label = Node::new(NodeKind::Label).with(&label_data);
        storage.add_node(&label)?;
        let has_label =
            Relationship::new(RelationshipKind::PullRequestHasLabel, &pull_request_key, label.key());
        storage.add_relationship(&has_label)?;
    }

    if !defer_files {
        for file_data in connection_nodes(data, "files") {
            add_pull_request_file(storage, &pull_request_key, &file_data)?;
        }
    }

    for comment in connection_nodes(data, "comments") {
        let commenter = actor_or_default(comment.get("author"));
        let commenter_key = add_user(storage, &commenter)?;
        let comments_on = Relationship::new(
            RelationshipKind::CommentsOnPullRequest,
            commenter_key,
            &pull_request_key,
        )
        .with(&comment);
        storage.add_relationship(&comments_on)?;
    }

    for event in connection_nodes(data, "timelineItems") {
        process_timeline_item(storage, &pull_request_key, &event)?;
    }

    for review in connection_nodes(data, "reviews") {
        process_review(storage, &pull_request_key, &review)?;
    }

    Ok(())
}

/// Base and head branch references, identified by (repository id,
/// `origin/<ref>`). The head branch is only linked when it lives in the
/// same repository; cross-fork heads have no branch node in this
/// project.
fn process_branch_refs(
    storage: &mut PreprocessorStorage,
    pull_request_key: &str,
    data: &Value,
) -> Result<()> {
    let base_repository_id = json_path_str(data, &["baseRepository", "id"]);
    let head_repository_id = json_path_str(data, &["headRepository", "id"]);
    let base_ref_name = data.get("baseRefName").and_then(Value::as_str);
    let head_ref_name = data.get("headRefName").and_then(Value::as_str);

    if let (Some(base_repo), Some(base_ref)) = (base_repository_id, base_ref_name) {
        let branch_id = storage.branch_id(base_repo, &format!("origin/{base_ref}"));
        let target = Relationship::new(
            RelationshipKind::PullRequestHasTargetBranch,
            pull_request_key,
            branch_id,
        );
        storage.add_relationship(&target)?;
    }
    if let (Some(head_repo), Some(head_ref)) = (head_repository_id, head_ref_name) {
        if base_repository_id == Some(head_repo) {
            let branch_id = storage.branch_id(head_repo, &format!("origin/{head_ref}"));
            let source = Relationship::new(
                RelationshipKind::PullRequestHasSourceBranch,
                pull_request_key,
                branch_id,
            );
            storage.add_relationship(&source)?;
        }
    }
    Ok(())
}

fn process_timeline_item(
    storage: &mut PreprocessorStorage,
    pull_request_key: &str,
    event: &Value,
) -> Result<()> {
    let type_name = event.get("__typename").and_then(Value::as_str);
    if !matches!(type_name, Some("MergedEvent") | Some("ClosedEvent")) {
        return Ok(());
    }

    let event_node = Node::new(NodeKind::PullRequestEvent).with(event);
    storage.add_node(&event_node)?;

    if type_name == Some("MergedEvent") {
        if let Some(commit_oid) = json_path_str(event, &["commit", "oid"]) {
            let links = Relationship::new(
                RelationshipKind::PullRequestEventLinksCommit,
                event_node.key(),
                commit_oid,
            );
            storage.add_relationship(&links)?;
        }
    }

    let actor = actor_or_default(event.get("actor"));
    let actor_key = add_user(storage, &actor)?;
    let creates =
        Relationship::new(RelationshipKind::CreatesPullRequestEvent, actor_key, event_node.key())
            .with(event);
    storage.add_relationship(&creates)?;

    let has_event = Relationship::new(
        RelationshipKind::PullRequestHasEvent,
        pull_request_key,
        event_node.key(),
    );
    storage.add_relationship(&has_event)?;
    Ok(())
}

fn process_review(
    storage: &mut PreprocessorStorage,
    pull_request_key: &str,
    data: &Value,
) -> Result<()> {
    let mut review = Node::new(NodeKind::PullRequestReview).with(data);
    let review_commit_hash = json_path_str(data, &["commit", "oid"]).map(str::to_string);
    if let Some(commit_hash) = &review_commit_hash {
        review.set("commitHash", &json!(commit_hash));
    }
    storage.add_node(&review)?;

    if let Some(commit_hash) = &review_commit_hash {
        let reviews_commit = Relationship::new(
            RelationshipKind::PullRequestReviewReviewsCommit,
            review.key(),
            commit_hash.clone(),
        );
        storage.add_relationship(&reviews_commit)?;
    }

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let creates =
        Relationship::new(RelationshipKind::CreatesPullRequestReview, author_key, review.key())
            .with(data);
    storage.add_relationship(&creates)?;

    let has_review = Relationship::new(
        RelationshipKind::PullRequestHasReview,
        pull_request_key,
        review.key(),
    );
    storage.add_relationship(&has_review)?;

    for comment in connection_nodes(data, "comments") {
        process_review_comment(storage, &review.key(), &comment)?;
    }
    Ok(())
}

fn process_review_comment(
    storage: &mut PreprocessorStorage,
    review_key: &str,
    data: &Value,
) -> Result<()> {
    let mut comment = Node::new(NodeKind::PullRequestReviewComment).with(data);
    let commit_hash = json_path_str(data, &["commit", "oid"]).map(str::to_string);
    if let Some(hash) = &commit_hash {
        comment.set("commitHash", &json!(hash));
    }
    let original_commit_hash = json_path_str(data, &["originalCommit", "oid"]).map(str::to_string);
    if let Some(hash) = &original_commit_hash {
        comment.set("originalCommitHash", &json!(hash));
    }
    if let Some(reply_to_id) = json_path_str(data, &["replyTo", "id"]) {
        comment.set("replyToId", &json!(reply_to_id));
    }
    storage.add_node(&comment)?;

    if let Some(hash) = &commit_hash {
        let comments_commit = Relationship::new(
            RelationshipKind::ReviewCommentCommentsCommit,
            comment.key(),
            hash.clone(),
        );
        storage.add_relationship(&comments_commit)?;
    }
    if let Some(hash) = &original_commit_hash {
        let comments_original = Relationship::new(
            RelationshipKind::ReviewCommentCommentsOriginalCommit,
            comment.key(),
            hash.clone(),
        );
        storage.add_relationship(&comments_original)?;
    }

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let creates = Relationship::new(
        RelationshipKind::CreatesPullRequestReviewComment,
        author_key,
        comment.key(),
    )
    .with(data);
    storage.add_relationship(&creates)?;

    let comments_on = Relationship::new(
        RelationshipKind::CommentsOnPullRequestReview,
        comment.key(),
        review_key,
    );
    storage.add_relationship(&comments_on)?;

    if let Some(reply_to_id) = json_path(data, &["replyTo", "id"]).and_then(Value::as_str) {
        if !reply_to_id.is_empty() {
            let reply = Relationship::new(
                RelationshipKind::IsReplyToPullRequestReviewComment,
                comment.key(),
                reply_to_id,
            );
            storage.add_relationship(&reply)?;
        }
    }
    Ok(())
}
