//! Workflow and workflow-run enumeration.

use std::collections::VecDeque;

use anyhow::Result;
use serde_json::{Value, json};

use super::wrapper::{PAGE_SIZE, RestWrapper};
use crate::github::graphql::{json_path, json_path_str};

pub struct WorkflowPager<'a> {
    wrapper: &'a mut RestWrapper,
    page: usize,
    buffer: VecDeque<Value>,
    exhausted: bool,
}

impl<'a> WorkflowPager<'a> {
    pub fn new(wrapper: &'a mut RestWrapper) -> Self {
        Self {
            wrapper,
            page: 1,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// The next workflow document with its runs embedded, or None after
    /// the last workflow.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(workflow) = self.buffer.pop_front() {
                return Ok(Some(self.build_document(&workflow).await?));
            }
            if self.exhausted {
                return Ok(None);
            }
            let page_document = self
                .wrapper
                .get_json(&format!(
                    "{}?per_page={PAGE_SIZE}&page={}",
                    self.wrapper.repo_path("/actions/workflows"),
                    self.page
                ))
                .await?;
            let batch = json_path(&page_document, &["workflows"])
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            self.page += 1;
            self.exhausted = batch.len() < PAGE_SIZE;
            if batch.is_empty() {
                return Ok(None);
            }
            self.buffer.extend(batch);
        }
    }

    async fn build_document(&mut self, workflow: &Value) -> Result<Value> {
        let workflow_id = json_path(workflow, &["id"])
            .and_then(Value::as_i64)
            .unwrap_or(-1);
        let runs = self.workflow_runs(workflow_id).await?;
        Ok(json!({
            "id": json_path_str(workflow, &["node_id"]).unwrap_or(""),
            "title": json_path_str(workflow, &["name"]).unwrap_or(""),
            "configPath": json_path_str(workflow, &["path"]).unwrap_or(""),
            "createdAt": json_path_str(workflow, &["created_at"]).unwrap_or(""),
            "state": json_path_str(workflow, &["state"]).unwrap_or(""),
            "workflowRuns": runs,
        }))
    }

    async fn workflow_runs(&mut self, workflow_id: i64) -> Result<Vec<Value>> {
        let mut runs = Vec::new();
        let mut page = 1;
        loop {
            let document = self
                .wrapper
                .get_json(&format!(
                    "{}?per_page={PAGE_SIZE}&page={page}",
                    self.wrapper
                        .repo_path(&format!("/actions/workflows/{workflow_id}/runs"))
                ))
                .await?;
            let batch = json_path(&document, &["workflow_runs"])
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let done = batch.len() < PAGE_SIZE;
            runs.extend(batch.iter().map(run_document));
            if done {
                return Ok(runs);
            }
            page += 1;
        }
    }
}

fn run_document(run: &Value) -> Value {
    json!({
        "id": json_path_str(run, &["node_id"]).unwrap_or(""),
        "status": json_path_str(run, &["status"]).unwrap_or(""),
        "conclusion": json_path_str(run, &["conclusion"]).unwrap_or(""),
        "createdAt": json_path_str(run, &["created_at"]).unwrap_or(""),
        "startedAt": json_path_str(run, &["run_started_at"]).unwrap_or(""),
        "attempts": json_path(run, &["run_attempt"]).cloned().unwrap_or(json!(-1)),
        "headCommit": json_path_str(run, &["head_sha"]).unwrap_or(""),
        "actor": run_actor(run.get("actor")),
        "triggeringActor": run_actor(run.get("triggering_actor")),
    })
}

fn run_actor(raw: Option<&Value>) -> Value {
    match raw {
        Some(actor) if actor.is_object() => json!({
            "id": json_path_str(actor, &["node_id"]).unwrap_or(""),
            "login": json_path_str(actor, &["login"]).unwrap_or(""),
            "email": "",
            "name": "",
        }),
        _ => Value::Null,
    }
}
