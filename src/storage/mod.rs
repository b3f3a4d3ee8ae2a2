//! Preprocessor storage: the single mutable sink every processor writes
//! into. Combines the in-memory dedup container with the per-kind CSV
//! appenders; `add_node` and `add_relationship` are idempotent within a
//! run.

pub mod container;
pub mod file_handler;

use std::path::Path;

use anyhow::Result;

pub use container::{RepositoryContainer, TimeBucketCategory};
pub use file_handler::{RepositoryFileHandler, TableKind};

use crate::graph::{Node, Relationship};
use crate::types::RepositoryId;

pub struct PreprocessorStorage {
    container: RepositoryContainer,
    file_handler: RepositoryFileHandler,
}

impl PreprocessorStorage {
    pub fn new(repository_id: &RepositoryId, share_dir: &Path) -> Self {
        Self {
            container: RepositoryContainer::new(),
            file_handler: RepositoryFileHandler::new(repository_id, share_dir),
        }
    }

    /// Write a node to memory and file unless its key was seen before.
    pub fn add_node(&mut self, node: &Node) -> Result<()> {
        if self.container.node_exists(node) {
            return Ok(());
        }
        self.file_handler.append_node(node)?;
        self.container.add_node(node);
        Ok(())
    }

    /// Write a relationship unless an identical one (same endpoints and
    /// property tuple) was seen before.
    pub fn add_relationship(&mut self, relationship: &Relationship) -> Result<()> {
        if self.container.relationship_exists(relationship) {
            return Ok(());
        }
        self.file_handler.append_relationship(relationship)?;
        self.container.add_relationship(relationship);
        Ok(())
    }

    pub fn branch_id(&mut self, project_id: &str, branch_name: &str) -> String {
        self.container.branch_id(project_id, branch_name)
    }

    pub fn issue_time_bucket_id(&mut self, timestamp: &str) -> String {
        self.container
            .time_bucket_id(TimeBucketCategory::Issue, timestamp)
    }

    pub fn pull_request_time_bucket_id(&mut self, timestamp: &str) -> String {
        self.container
            .time_bucket_id(TimeBucketCategory::PullRequest, timestamp)
    }

    pub fn commit_time_bucket_id(&mut self, timestamp: &str) -> String {
        self.container
            .time_bucket_id(TimeBucketCategory::Commit, timestamp)
    }

    pub fn neo4j_file_name(&self, table: TableKind) -> Option<String> {
        self.file_handler.neo4j_file_name(table)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file_handler.flush()
    }

    pub fn delete_all_files(&mut self) -> Result<()> {
        self.file_handler.delete_files()
    }

    pub fn file_sizes(&self) -> std::collections::HashMap<String, f64> {
        self.file_handler.file_sizes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, RelationshipKind};
    use crate::types::{Owner, RepositoryName};
    use serde_json::json;

    fn storage(dir: &Path) -> PreprocessorStorage {
        let repo = RepositoryId::new(Owner::from("octo"), RepositoryName::from("dedup"));
        PreprocessorStorage::new(&repo, dir)
    }

    #[test]
    fn duplicate_nodes_produce_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage(dir.path());
        let user = Node::new(NodeKind::User).with(&json!({"id": "U_1", "login": "alice"}));
        storage.add_node(&user).unwrap();
        storage.add_node(&user).unwrap();
        storage.flush().unwrap();

        let path = dir.path().join(format!(
            "{}_User.csv",
            RepositoryId::new(Owner::from("octo"), RepositoryName::from("dedup"))
                .namespace_hash()
        ));
        let contents = std::fs::read_to_string(path).unwrap();
        // header + exactly one row
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn duplicate_relationships_produce_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage(dir.path());
        let edge = Relationship::new(RelationshipKind::StarsProject, "U_1", "P_1");
        storage.add_relationship(&edge).unwrap();
        storage.add_relationship(&edge).unwrap();

        let mut different = Relationship::new(RelationshipKind::CommentsOnIssue, "U_1", "I_1");
        different.set("id", &json!("c1"));
        storage.add_relationship(&different).unwrap();
        let mut second_comment = Relationship::new(RelationshipKind::CommentsOnIssue, "U_1", "I_1");
        second_comment.set("id", &json!("c2"));
        storage.add_relationship(&second_comment).unwrap();
        storage.flush().unwrap();

        let namespace = RepositoryId::new(Owner::from("octo"), RepositoryName::from("dedup"))
            .namespace_hash();
        let stars = std::fs::read_to_string(dir.path().join(format!("{namespace}_STARS.csv")))
            .unwrap();
        assert_eq!(stars.lines().count(), 2);
        let comments = std::fs::read_to_string(
            dir.path()
                .join(format!("{namespace}_COMMENTS_ON_ISSUE.csv")),
        )
        .unwrap();
        // two distinct property tuples between the same endpoints
        assert_eq!(comments.lines().count(), 3);
    }
}
