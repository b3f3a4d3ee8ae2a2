//! Node kinds and their declared property schemas.
//!
//! A [`Node`] is a tagged variant: the [`NodeKind`] selects the label,
//! the key attribute, the shareability flag and the declared property
//! list, and the value vector holds the coerced properties in
//! declaration order (which is also the CSV column order).

use serde_json::Value;
use sha2::{Digest, Sha256};
use strum::{Display, EnumIter, EnumString};

use super::data_type::{PropertyType, PropertyValue};

use PropertyType::{Boolean, Datetime, Float, Integer, String as Str};

/// Every node label the pipeline can emit. The display form is the
/// database label and the CSV file-name token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum NodeKind {
    Branch,
    Commit,
    Dependency,
    Discussion,
    DiscussionComment,
    File,
    FileAction,
    Issue,
    Label,
    Language,
    License,
    Milestone,
    Organization,
    Project,
    ProjectCommitMonth,
    ProjectIssueMonth,
    ProjectPullRequestMonth,
    PullRequest,
    PullRequestEvent,
    PullRequestFile,
    PullRequestReview,
    PullRequestReviewComment,
    Release,
    Topic,
    User,
    Workflow,
    WorkflowRun,
}

impl NodeKind {
    /// Declared properties in declaration (and CSV column) order.
    pub fn properties(self) -> &'static [(&'static str, PropertyType)] {
        match self {
            Self::Branch => &[("id", Str), ("name", Str)],
            Self::Commit => &[("hash", Str), ("message", Str), ("merge", Boolean)],
            Self::Dependency => &[
                ("name", Str),
                ("versionInfo", Str),
                ("nameAndVersion", Str),
                ("licenseDeclared", Str),
                ("dev", Boolean),
            ],
            Self::Discussion => &[
                ("id", Str),
                ("number", Integer),
                ("title", Str),
                ("closed", Boolean),
                ("closedAt", Datetime),
                ("upvoteCount", Integer),
                ("body", Str),
                ("categoryName", Str),
            ],
            Self::DiscussionComment => &[("id", Str), ("body", Str), ("isAnswer", Boolean)],
            Self::File => &[
                ("fileId", Str),
                ("mimeType", Str),
                ("path", Str),
                ("fileSha", Str),
                ("fileSize", Integer),
            ],
            Self::FileAction => &[
                ("fileActionId", Str),
                ("changeType", Str),
                ("copiedFile", Boolean),
                ("renamedFile", Boolean),
                ("newFile", Boolean),
                ("deletedFile", Boolean),
                ("diff", Str),
                ("addedLines", Integer),
                ("deletedLines", Integer),
            ],
            Self::Issue => &[
                ("id", Str),
                ("number", Integer),
                ("title", Str),
                ("body", Str),
                ("state", Str),
                ("convertedToDiscussion", Boolean),
            ],
            Self::Label => &[("id", Str), ("name", Str)],
            Self::Language => &[("name", Str)],
            Self::License => &[("spdxId", Str)],
            Self::Milestone => &[
                ("id", Str),
                ("number", Integer),
                ("title", Str),
                ("description", Str),
                ("dueOn", Datetime),
                ("closedAt", Datetime),
                ("progressPercentage", Float),
                ("state", Str),
            ],
            Self::Organization => &[
                ("orgId", Str),
                ("organizationEmail", Str),
                ("orgDesc", Str),
                ("orgLogin", Str),
                ("orgName", Str),
            ],
            Self::Project => &[
                ("id", Str),
                ("url", Str),
                ("name", Str),
                ("description", Str),
                ("isArchived", Boolean),
                ("archivedAt", Datetime),
                ("isMirror", Boolean),
                ("mirrorUrl", Str),
                ("isLocked", Boolean),
                ("lockReason", Str),
                ("diskUsage", Integer),
                ("visibility", Str),
                ("forkingAllowed", Boolean),
                ("hasWikiEnabled", Boolean),
            ],
            Self::ProjectCommitMonth | Self::ProjectIssueMonth | Self::ProjectPullRequestMonth => {
                &[("id", Str), ("year", Integer), ("month", Integer)]
            }
            Self::PullRequest => &[
                ("id", Str),
                ("number", Integer),
                ("mergedAt", Datetime),
                ("title", Str),
                ("body", Str),
                ("isDraft", Boolean),
                ("locked", Boolean),
                ("activeLockReason", Str),
                ("state", Str),
                ("baseRepositoryURL", Str),
                ("headRepositoryURL", Str),
                ("baseRefOid", Str),
                ("headRefOid", Str),
            ],
            Self::PullRequestEvent => &[("id", Str), ("__typename", Str), ("additionalData", Str)],
            Self::PullRequestFile => &[
                ("id", Str),
                ("pullRequestId", Str),
                ("sha", Str),
                ("path", Str),
                ("changeType", Str),
                ("additions", Integer),
                ("deletions", Integer),
                ("changes", Integer),
                ("patch", Str),
            ],
            Self::PullRequestReview => &[
                ("id", Str),
                ("state", Str),
                ("body", Str),
                ("createdAt", Datetime),
                ("submittedAt", Datetime),
                ("commitHash", Str),
            ],
            Self::PullRequestReviewComment => &[
                ("id", Str),
                ("rawId", Integer),
                ("body", Str),
                ("diffHunk", Str),
                ("path", Str),
                ("startLine", Integer),
                ("originalStartLine", Integer),
                ("line", Integer),
                ("originalLine", Integer),
                ("commitHash", Str),
                ("originalCommitHash", Str),
                ("replyToId", Str),
            ],
            Self::Release => &[("id", Str), ("name", Str), ("publishedAt", Datetime)],
            Self::Topic => &[("id", Str), ("name", Str)],
            Self::User => &[("name", Str), ("login", Str), ("email", Str), ("id", Str)],
            Self::Workflow => &[
                ("id", Str),
                ("title", Str),
                ("configPath", Str),
                ("createdAt", Datetime),
                ("state", Str),
                ("headCommit", Str),
            ],
            Self::WorkflowRun => &[
                ("id", Str),
                ("status", Str),
                ("conclusion", Str),
                ("attempts", Integer),
                ("state", Str),
            ],
        }
    }

    /// The attribute that uniquely identifies a node of this kind.
    pub fn key_name(self) -> &'static str {
        match self {
            Self::Commit => "hash",
            Self::File => "fileId",
            Self::FileAction => "fileActionId",
            Self::Language => "name",
            Self::License => "spdxId",
            Self::Dependency => "nameAndVersion",
            Self::Organization => "orgId",
            _ => "id",
        }
    }

    /// Shareable kinds are deduplicated across repositories with MERGE.
    pub fn shareable(self) -> bool {
        matches!(
            self,
            Self::User
                | Self::Organization
                | Self::Language
                | Self::License
                | Self::Topic
                | Self::Dependency
                | Self::File
        )
    }
}

/// One graph node: a kind plus its coerced property values.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    values: Vec<PropertyValue>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            values: vec![PropertyValue::Empty; kind.properties().len()],
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Set one declared property, coercing to its declared type.
    /// Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: &Value) {
        let Some(index) = self
            .kind
            .properties()
            .iter()
            .position(|(declared, _)| *declared == name)
        else {
            return;
        };
        let (_, declared_type) = self.kind.properties()[index];
        self.values[index] = PropertyValue::coerce(declared_type, value);
    }

    /// Extract every top-level scalar of `document` whose key matches a
    /// declared property. Null, array and object values are skipped, so a
    /// missing field leaves the property unset rather than sentinel-ed.
    pub fn extract_and_update(&mut self, document: &Value) {
        let Some(object) = document.as_object() else {
            return;
        };
        for (key, value) in object {
            if value.is_null() || value.is_array() || value.is_object() {
                continue;
            }
            self.set(key, value);
        }
    }

    /// Builder-style variant of [`Node::extract_and_update`].
    pub fn with(mut self, document: &Value) -> Self {
        self.extract_and_update(document);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        let index = self
            .kind
            .properties()
            .iter()
            .position(|(declared, _)| *declared == name)?;
        Some(&self.values[index])
    }

    /// The key attribute value, rendered as written to CSV.
    pub fn key(&self) -> String {
        self.get(self.kind.key_name())
            .map(PropertyValue::to_csv_field)
            .unwrap_or_default()
    }

    /// sha256 over `name:value|...` across all properties in declaration
    /// order. Stable content identity for derived keys.
    pub fn content_hash(&self) -> String {
        let joined = self
            .kind
            .properties()
            .iter()
            .zip(&self.values)
            .map(|((name, _), value)| format!("{name}:{}", value.to_csv_field()))
            .collect::<Vec<_>>()
            .join("|");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Derive the key attribute from the other properties: the key is
    /// cleared, the content hash computed, and the result stored as the
    /// key. Used by File and PullRequestFile whose identity is their
    /// content.
    pub fn derive_key_from_content(&mut self) -> String {
        self.set(self.kind.key_name(), &Value::String(String::new()));
        let hash = self.content_hash();
        self.set(self.kind.key_name(), &Value::String(hash.clone()));
        hash
    }

    /// CSV row in declared column order.
    pub fn csv_record(&self) -> Vec<String> {
        self.values.iter().map(PropertyValue::to_csv_field).collect()
    }

    /// CSV header in declared column order.
    pub fn csv_header(kind: NodeKind) -> Vec<&'static str> {
        kind.properties().iter().map(|(name, _)| *name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_and_update_coerces_matching_scalars() {
        let mut node = Node::new(NodeKind::Issue);
        node.extract_and_update(&json!({
            "id": "I_abc",
            "number": 12,
            "title": "crash on load",
            "body": null,
            "state": "OPEN",
            "labels": {"nodes": []},
        }));
        assert_eq!(node.key(), "I_abc");
        assert_eq!(node.get("number"), Some(&PropertyValue::Int(12)));
        // null skipped, stays unset
        assert_eq!(node.get("body"), Some(&PropertyValue::Empty));
    }

    #[test]
    fn key_name_per_kind() {
        assert_eq!(NodeKind::Commit.key_name(), "hash");
        assert_eq!(NodeKind::Dependency.key_name(), "nameAndVersion");
        assert_eq!(NodeKind::Organization.key_name(), "orgId");
        assert_eq!(NodeKind::Issue.key_name(), "id");
    }

    #[test]
    fn shareable_kinds() {
        for kind in [
            NodeKind::User,
            NodeKind::Organization,
            NodeKind::Language,
            NodeKind::License,
            NodeKind::Topic,
            NodeKind::Dependency,
            NodeKind::File,
        ] {
            assert!(kind.shareable(), "{kind} should merge across repositories");
        }
        assert!(!NodeKind::Project.shareable());
        assert!(!NodeKind::Commit.shareable());
    }

    #[test]
    fn content_hash_is_a_function_of_properties() {
        let file_a = Node::new(NodeKind::File).with(&json!({
            "mimeType": "text/plain", "path": "a.txt", "fileSha": "s1", "fileSize": 10,
        }));
        let file_b = Node::new(NodeKind::File).with(&json!({
            "mimeType": "text/plain", "path": "a.txt", "fileSha": "s1", "fileSize": 10,
        }));
        let file_c = Node::new(NodeKind::File).with(&json!({
            "mimeType": "text/plain", "path": "b.txt", "fileSha": "s1", "fileSize": 10,
        }));
        assert_eq!(file_a.content_hash(), file_b.content_hash());
        assert_ne!(file_a.content_hash(), file_c.content_hash());
    }

    #[test]
    fn derive_key_ignores_previous_key_value() {
        let mut with_key = Node::new(NodeKind::PullRequestFile).with(&json!({
            "id": "stale", "pullRequestId": "PR_1", "sha": "abc", "path": "src/a.js",
        }));
        let mut without_key = Node::new(NodeKind::PullRequestFile).with(&json!({
            "pullRequestId": "PR_1", "sha": "abc", "path": "src/a.js",
        }));
        assert_eq!(
            with_key.derive_key_from_content(),
            without_key.derive_key_from_content()
        );
    }

    #[test]
    fn csv_record_matches_header_arity() {
        let node = Node::new(NodeKind::Project);
        assert_eq!(
            node.csv_record().len(),
            Node::csv_header(NodeKind::Project).len()
        );
    }
}
