//! Commit metadata enumeration (author, committer, commit comments).
//!
//! The clone driver owns commit content; this pager only supplies the
//! GitHub-side identities and comments the clone cannot know.

use std::collections::VecDeque;

use anyhow::Result;
use serde_json::{Value, json};

use super::wrapper::{PAGE_SIZE, RestWrapper};
use crate::github::graphql::{json_path, json_path_str};

pub struct CommitMetaPager<'a> {
    wrapper: &'a mut RestWrapper,
    page: usize,
    buffer: VecDeque<Value>,
    exhausted: bool,
}

impl<'a> CommitMetaPager<'a> {
    pub fn new(wrapper: &'a mut RestWrapper) -> Self {
        Self {
            wrapper,
            page: 1,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// The next commit metadata document, or None after the last page.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(commit) = self.buffer.pop_front() {
                if json_path_str(&commit, &["sha"]).is_none() {
                    continue;
                }
                return Ok(Some(self.build_document(&commit).await?));
            }
            if self.exhausted {
                return Ok(None);
            }
            let batch = self
                .wrapper
                .get_array_page(&self.wrapper.repo_path("/commits"), self.page)
                .await?;
            self.page += 1;
            self.exhausted = batch.len() < PAGE_SIZE;
            if batch.is_empty() {
                return Ok(None);
            }
            self.buffer.extend(batch);
        }
    }

    async fn build_document(&mut self, commit: &Value) -> Result<Value> {
        let sha = json_path_str(commit, &["sha"]).unwrap_or("").to_string();
        let comment_count = json_path(commit, &["commit", "comment_count"])
            .and_then(Value::as_i64)
            .unwrap_or(-1);
        let comments = if comment_count > 0 {
            self.commit_comments(&sha).await?
        } else {
            Vec::new()
        };
        Ok(json!({
            "hash": sha,
            "authoredAt": json_path_str(commit, &["commit", "author", "date"]).unwrap_or(""),
            "author": identity_document(commit.get("author")),
            "committedAt": json_path_str(commit, &["commit", "committer", "date"]).unwrap_or(""),
            "committer": identity_document(commit.get("committer")),
            "commitComments": comments,
        }))
    }

    async fn commit_comments(&mut self, sha: &str) -> Result<Vec<Value>> {
        let comments = self
            .wrapper
            .get_array_all(&self.wrapper.repo_path(&format!("/commits/{sha}/comments")))
            .await?;
        Ok(comments
            .iter()
            .map(|comment| {
                json!({
                    "id": json_path_str(comment, &["node_id"]).unwrap_or(""),
                    "body": json_path_str(comment, &["body"]).unwrap_or(""),
                    "path": json_path_str(comment, &["path"]).unwrap_or(""),
                    "position": json_path(comment, &["position"]).cloned().unwrap_or(json!(-1)),
                    "line": json_path(comment, &["line"]).cloned().unwrap_or(json!(-1)),
                    "createdAt": json_path_str(comment, &["created_at"]).unwrap_or(""),
                    "user": match comment.get("user") {
                        Some(user) if user.is_object() => json!({
                            "id": json_path_str(user, &["node_id"]).unwrap_or(""),
                            "login": json_path_str(user, &["login"]).unwrap_or(""),
                        }),
                        _ => Value::Null,
                    },
                })
            })
            .collect())
    }
}

fn identity_document(raw: Option<&Value>) -> Value {
    match raw {
        Some(identity) if identity.is_object() => json!({
            "id": json_path_str(identity, &["node_id"]).unwrap_or(""),
            "login": json_path_str(identity, &["login"]).unwrap_or(""),
            "name": json_path_str(identity, &["name"]).unwrap_or(""),
            "email": json_path_str(identity, &["email"]).unwrap_or(""),
        }),
        _ => Value::Null,
    }
}
