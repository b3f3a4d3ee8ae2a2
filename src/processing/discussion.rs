//! Discussion processing: comments, reply trees and the answering
//! comment.

use anyhow::Result;
use serde_json::Value;

use super::{actor_or_default, add_user, connection_nodes};
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process one discussions connection document (`{"nodes": [...]}`).
/// Partial documents from the follow-up comment pager run through the
/// same path; node dedup absorbs the repetition.
pub fn process_discussions(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    for discussion in data.get("nodes").and_then(Value::as_array).cloned().unwrap_or_default()
    {
        if discussion.is_null() {
            continue;
        }
        process_discussion(storage, project_id, &discussion)?;
    }
    Ok(())
}

fn process_discussion(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    data: &Value,
) -> Result<()> {
    let mut discussion = Node::new(NodeKind::Discussion).with(data);
    if let Some(category_name) = data
        .get("category")
        .and_then(|category| category.get("name"))
        .and_then(Value::as_str)
    {
        discussion.set("categoryName", &Value::String(category_name.to_string()));
    }
    let discussion_key = discussion.key();
    storage.add_node(&discussion)?;

    let has_discussion =
        Relationship::new(RelationshipKind::ProjectHasDiscussion, project_id, &discussion_key);
    storage.add_relationship(&has_discussion)?;

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let creates =
        Relationship::new(RelationshipKind::CreatesDiscussion, author_key, &discussion_key)
            .with(data);
    storage.add_relationship(&creates)?;

    for label_data in connection_nodes(data, "labels") {
        let label = Node::new(NodeKind::Label).with(&label_data);
        storage.add_node(&label)?;
        let has_label =
            Relationship::new(RelationshipKind::DiscussionHasLabel, &discussion_key, label.key());
        storage.add_relationship(&has_label)?;
    }

    for comment in connection_nodes(data, "comments") {
        process_comment(storage, &discussion_key, &comment)?;
    }
    Ok(())
}

fn process_comment(
    storage: &mut PreprocessorStorage,
    discussion_key: &str,
    data: &Value,
) -> Result<()> {
    let comment = Node::new(NodeKind::DiscussionComment).with(data);
    let comment_key = comment.key();
    storage.add_node(&comment)?;

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let creates =
        Relationship::new(RelationshipKind::CreatesDiscussionComment, author_key, &comment_key)
            .with(data);
    storage.add_relationship(&creates)?;

    let has_comment =
        Relationship::new(RelationshipKind::DiscussionHasComment, discussion_key, &comment_key);
    storage.add_relationship(&has_comment)?;

    if data.get("isAnswer").and_then(Value::as_bool) == Some(true) {
        let answers = Relationship::new(
            RelationshipKind::CommentAnswersDiscussion,
            &comment_key,
            discussion_key,
        );
        storage.add_relationship(&answers)?;
    }

    for reply in connection_nodes(data, "replies") {
        process_reply(storage, discussion_key, &comment_key, &reply)?;
    }
    Ok(())
}

fn process_reply(
    storage: &mut PreprocessorStorage,
    discussion_key: &str,
    parent_comment_key: &str,
    data: &Value,
) -> Result<()> {
    let reply = Node::new(NodeKind::DiscussionComment).with(data);
    let reply_key = reply.key();
    storage.add_node(&reply)?;

    let author = actor_or_default(data.get("author"));
    let author_key = add_user(storage, &author)?;
    let creates =
        Relationship::new(RelationshipKind::CreatesDiscussionComment, author_key, &reply_key)
            .with(data);
    storage.add_relationship(&creates)?;

    let reply_to = Relationship::new(
        RelationshipKind::ReplyToDiscussionComment,
        &reply_key,
        parent_comment_key,
    );
    storage.add_relationship(&reply_to)?;

    let has_comment =
        Relationship::new(RelationshipKind::DiscussionHasComment, discussion_key, &reply_key);
    storage.add_relationship(&has_comment)?;
    Ok(())
}
