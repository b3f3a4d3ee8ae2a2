//! REST side of the dual-source collection engine.
//!
//! Every adapter in this module emits documents shape-identical to the
//! GraphQL counterparts so downstream processors are oblivious to which
//! source produced a record.

pub mod commit;
pub mod issue;
pub mod pull_request;
pub mod pull_request_files;
pub mod sbom;
pub mod workflow;
pub mod wrapper;

pub use commit::CommitMetaPager;
pub use pull_request_files::PullRequestFilePager;
pub use workflow::WorkflowPager;
pub use wrapper::RestWrapper;

use anyhow::Result;
use serde_json::{Value, json};

use crate::github::graphql::{json_path, json_path_str};

/// REST collector facade mirroring the GraphQL collector surface.
pub struct RestCollector;

impl RestCollector {
    /// Unified-shape issue document for one number.
    pub async fn get_issue(wrapper: &mut RestWrapper, number: i64) -> Result<Value> {
        issue::issue_document(wrapper, number).await
    }

    /// Unified-shape pull request document for one number.
    pub async fn get_pull_request(wrapper: &mut RestWrapper, number: i64) -> Result<Value> {
        pull_request::pull_request_document(wrapper, number).await
    }

    /// Lazy sequence of unified-shape issue documents for the partially
    /// collected numbers.
    pub fn issue_pager<'a>(wrapper: &'a mut RestWrapper, numbers: &[i64]) -> NumbersPager<'a> {
        NumbersPager::new(wrapper, numbers, NumbersPagerKind::Issues)
    }

    /// Lazy sequence of unified-shape pull request documents for the
    /// partially collected numbers.
    pub fn pull_request_pager<'a>(
        wrapper: &'a mut RestWrapper,
        numbers: &[i64],
    ) -> NumbersPager<'a> {
        NumbersPager::new(wrapper, numbers, NumbersPagerKind::PullRequests)
    }

    pub fn commit_pager(wrapper: &mut RestWrapper) -> CommitMetaPager<'_> {
        CommitMetaPager::new(wrapper)
    }

    pub fn workflow_pager(wrapper: &mut RestWrapper) -> WorkflowPager<'_> {
        WorkflowPager::new(wrapper)
    }

    pub fn pull_request_file_pager(wrapper: &mut RestWrapper) -> PullRequestFilePager<'_> {
        PullRequestFilePager::new(wrapper)
    }

    pub async fn get_sbom(wrapper: &mut RestWrapper) -> Result<Vec<Value>> {
        sbom::sbom_packages(wrapper).await
    }
}

#[derive(Debug, Clone, Copy)]
enum NumbersPagerKind {
    Issues,
    PullRequests,
}

/// Lazy sequence over the numbers flagged partially collected by the
/// query tree, producing one unified-shape document per advance.
pub struct NumbersPager<'a> {
    wrapper: &'a mut RestWrapper,
    numbers: std::collections::VecDeque<i64>,
    kind: NumbersPagerKind,
}

impl<'a> NumbersPager<'a> {
    fn new(wrapper: &'a mut RestWrapper, numbers: &[i64], kind: NumbersPagerKind) -> Self {
        Self {
            wrapper,
            numbers: numbers.iter().copied().collect(),
            kind,
        }
    }

    pub async fn next(&mut self) -> Result<Option<Value>> {
        let Some(number) = self.numbers.pop_front() else {
            return Ok(None);
        };
        let document = match self.kind {
            NumbersPagerKind::Issues => issue::issue_document(self.wrapper, number).await?,
            NumbersPagerKind::PullRequests => {
                pull_request::pull_request_document(self.wrapper, number).await?
            }
        };
        Ok(Some(document))
    }
}

/// Milestone sub-document in the unified shape, including the computed
/// progress percentage. An empty milestone counts as 0 % complete.
pub(crate) fn milestone_document(raw: Option<&Value>) -> Value {
    let Some(milestone) = raw.filter(|value| value.is_object()) else {
        return Value::Null;
    };
    let open = json_path(milestone, &["open_issues"])
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let closed = json_path(milestone, &["closed_issues"])
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let progress = if open + closed > 0.0 {
        100.0 * closed / (open + closed)
    } else {
        0.0
    };
    json!({
        "id": json_path_str(milestone, &["node_id"]).unwrap_or(""),
        "number": json_path(milestone, &["number"]).cloned().unwrap_or(json!(-1)),
        "title": json_path_str(milestone, &["title"]).unwrap_or(""),
        "description": json_path_str(milestone, &["description"]).unwrap_or(""),
        "dueOn": json_path_str(milestone, &["due_on"]).unwrap_or(""),
        "createdAt": json_path_str(milestone, &["created_at"]).unwrap_or(""),
        "closedAt": json_path_str(milestone, &["closed_at"]).unwrap_or(""),
        "progressPercentage": progress,
        "state": json_path_str(milestone, &["state"]).unwrap_or("").to_uppercase(),
        "creator": issue::actor_document(milestone.get("creator")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_progress_is_computed() {
        let document = milestone_document(Some(&json!({
            "node_id": "M_1",
            "number": 3,
            "title": "v1",
            "state": "open",
            "open_issues": 1,
            "closed_issues": 3,
        })));
        assert_eq!(document["progressPercentage"], json!(75.0));
        assert_eq!(document["state"], json!("OPEN"));
    }

    #[test]
    fn empty_milestone_is_zero_percent() {
        let document = milestone_document(Some(&json!({
            "node_id": "M_2",
            "open_issues": 0,
            "closed_issues": 0,
        })));
        assert_eq!(document["progressPercentage"], json!(0.0));
    }

    #[test]
    fn missing_milestone_is_null() {
        assert_eq!(milestone_document(None), Value::Null);
        assert_eq!(milestone_document(Some(&Value::Null)), Value::Null);
    }
}
