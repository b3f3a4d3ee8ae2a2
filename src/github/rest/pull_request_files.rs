//! Pull-request file-action enumeration with patch text.
//!
//! Only used when `pull_request_file_content` is enabled; walking every
//! file of every pull request is by far the most request-hungry phase.

use std::collections::VecDeque;

use anyhow::Result;
use serde_json::{Value, json};

use super::wrapper::{PAGE_SIZE, RestWrapper};
use crate::github::graphql::{json_path, json_path_str};

pub struct PullRequestFilePager<'a> {
    wrapper: &'a mut RestWrapper,
    page: usize,
    pull_requests: VecDeque<Value>,
    pull_requests_exhausted: bool,
    current_pull_request_id: String,
    files: VecDeque<Value>,
}

impl<'a> PullRequestFilePager<'a> {
    pub fn new(wrapper: &'a mut RestWrapper) -> Self {
        Self {
            wrapper,
            page: 1,
            pull_requests: VecDeque::new(),
            pull_requests_exhausted: false,
            current_pull_request_id: String::new(),
            files: VecDeque::new(),
        }
    }

    /// The next file action, tagged with its pull request's node id, or
    /// None when every pull request's files are drained.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(file) = self.files.pop_front() {
                return Ok(Some(json!({
                    "pullRequestId": self.current_pull_request_id,
                    "sha": json_path_str(&file, &["sha"]).unwrap_or(""),
                    "path": json_path_str(&file, &["filename"]).unwrap_or(""),
                    "changeType": json_path_str(&file, &["status"]).unwrap_or("").to_uppercase(),
                    "additions": json_path(&file, &["additions"]).cloned().unwrap_or(json!(-1)),
                    "deletions": json_path(&file, &["deletions"]).cloned().unwrap_or(json!(-1)),
                    "changes": json_path(&file, &["changes"]).cloned().unwrap_or(json!(-1)),
                    "patch": json_path_str(&file, &["patch"]).unwrap_or(""),
                })));
            }

            if let Some(pull_request) = self.pull_requests.pop_front() {
                let number = json_path(&pull_request, &["number"])
                    .and_then(Value::as_i64)
                    .unwrap_or(-1);
                self.current_pull_request_id = json_path_str(&pull_request, &["node_id"])
                    .unwrap_or("")
                    .to_string();
                let files = self
                    .wrapper
                    .get_array_all(&self.wrapper.repo_path(&format!("/pulls/{number}/files")))
                    .await?;
                self.files.extend(files);
                continue;
            }

            if self.pull_requests_exhausted {
                return Ok(None);
            }
            let batch = self
                .wrapper
                .get_array_page(&self.wrapper.repo_path("/pulls?state=all"), self.page)
                .await?;
            self.page += 1;
            self.pull_requests_exhausted = batch.len() < PAGE_SIZE;
            if batch.is_empty() && self.pull_requests_exhausted {
                return Ok(None);
            }
            self.pull_requests.extend(batch);
        }
    }
}
