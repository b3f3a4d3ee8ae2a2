//! In-memory repository container used solely to deduplicate within one
//! mining run, plus the memoized derived identifiers that have no
//! GitHub-assigned id (branches and month buckets).

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};

/// Month-bucket categories, one id namespace each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBucketCategory {
    Issue,
    PullRequest,
    Commit,
}

#[derive(Default)]
pub struct RepositoryContainer {
    node_keys: HashMap<NodeKind, HashSet<String>>,
    /// Dedup hashes per (kind, source key). Edge content participates in
    /// the hash because distinct property tuples between the same node
    /// pair are distinct edges.
    relationship_hashes: HashMap<(RelationshipKind, String), HashSet<String>>,
    branch_ids: HashMap<String, String>,
    time_bucket_ids: HashMap<(TimeBucketCategory, String), String>,
}

impl RepositoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_exists(&self, node: &Node) -> bool {
        self.node_keys
            .get(&node.kind())
            .is_some_and(|keys| keys.contains(&node.key()))
    }

    pub fn add_node(&mut self, node: &Node) {
        self.node_keys
            .entry(node.kind())
            .or_default()
            .insert(node.key());
    }

    pub fn relationship_exists(&self, relationship: &Relationship) -> bool {
        self.relationship_hashes
            .get(&(relationship.kind(), relationship.source_key().to_string()))
            .is_some_and(|hashes| hashes.contains(&relationship.dedup_hash()))
    }

    pub fn add_relationship(&mut self, relationship: &Relationship) {
        self.relationship_hashes
            .entry((relationship.kind(), relationship.source_key().to_string()))
            .or_default()
            .insert(relationship.dedup_hash());
    }

    /// Stable branch identifier derived from exactly (project id, branch
    /// name), memoized for the run.
    pub fn branch_id(&mut self, project_id: &str, branch_name: &str) -> String {
        let key = format!("{project_id}{branch_name}");
        self.branch_ids
            .entry(key.clone())
            .or_insert_with(|| {
                let mut hasher = Sha256::new();
                hasher.update(key.as_bytes());
                format!("{:x}", hasher.finalize())
            })
            .clone()
    }

    /// Opaque per-run id for the (category, year-month) bucket. The first
    /// seven characters of an ISO-8601 timestamp are the year and month.
    pub fn time_bucket_id(&mut self, category: TimeBucketCategory, timestamp: &str) -> String {
        let month = timestamp.chars().take(7).collect::<String>();
        self.time_bucket_ids
            .entry((category, month))
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_dedup_by_kind_and_key() {
        let mut container = RepositoryContainer::new();
        let commit = Node::new(NodeKind::Commit).with(&json!({"hash": "abc"}));
        assert!(!container.node_exists(&commit));
        container.add_node(&commit);
        assert!(container.node_exists(&commit));

        // Same key under a different kind is a different node.
        let issue = Node::new(NodeKind::Issue).with(&json!({"id": "abc"}));
        assert!(!container.node_exists(&issue));
    }

    #[test]
    fn relationship_dedup_by_content() {
        let mut container = RepositoryContainer::new();
        let edge = Relationship::new(RelationshipKind::ParentOf, "a", "b");
        container.add_relationship(&edge);
        assert!(container.relationship_exists(&edge));

        let reversed = Relationship::new(RelationshipKind::ParentOf, "b", "a");
        assert!(!container.relationship_exists(&reversed));
    }

    #[test]
    fn branch_id_is_a_function_of_project_and_name() {
        let mut container = RepositoryContainer::new();
        let first = container.branch_id("P1", "origin/main");
        let again = container.branch_id("P1", "origin/main");
        let other_branch = container.branch_id("P1", "origin/dev");
        let other_project = container.branch_id("P2", "origin/main");
        assert_eq!(first, again);
        assert_ne!(first, other_branch);
        assert_ne!(first, other_project);
    }

    #[test]
    fn time_buckets_group_by_year_month() {
        let mut container = RepositoryContainer::new();
        let march_a = container.time_bucket_id(TimeBucketCategory::Issue, "2023-03-01T10:00:00Z");
        let march_b = container.time_bucket_id(TimeBucketCategory::Issue, "2023-03-28T23:59:59Z");
        let april = container.time_bucket_id(TimeBucketCategory::Issue, "2023-04-01T00:00:00Z");
        assert_eq!(march_a, march_b);
        assert_ne!(march_a, april);

        // Categories keep separate namespaces.
        let commit_march =
            container.time_bucket_id(TimeBucketCategory::Commit, "2023-03-01T10:00:00Z");
        assert_ne!(march_a, commit_march);
    }
}
