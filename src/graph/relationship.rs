//! Relationship kinds, endpoint tables and property schemas.
//!
//! The display form of a [`RelationshipKind`] is the database
//! relationship type and the CSV file-name token. Endpoints name the
//! node kinds matched by key during the bulk load; missing endpoints at
//! load time simply produce no edge.

use serde_json::Value;
use sha2::{Digest, Sha256};
use strum::{Display, EnumIter, EnumString};

use super::data_type::{PropertyType, PropertyValue};
use super::node::NodeKind;

use PropertyType::{Datetime, Integer, String as Str};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum RelationshipKind {
    #[strum(serialize = "BRANCH_HAS_HEAD_COMMIT")]
    BranchHeadCommit,
    #[strum(serialize = "CONTAINS_COMMIT")]
    BranchContainsCommit,
    #[strum(serialize = "COMMIT_IN_MONTH")]
    CommitInMonth,
    #[strum(serialize = "PERFORMS")]
    PerformsFileAction,
    #[strum(serialize = "PARENT_OF")]
    ParentOf,
    #[strum(serialize = "DISCUSSION_HAS_COMMENT")]
    DiscussionHasComment,
    #[strum(serialize = "REPLY_TO_DISCUSSION_COMMENT")]
    ReplyToDiscussionComment,
    #[strum(serialize = "DISCUSSION_HAS_LABEL")]
    DiscussionHasLabel,
    #[strum(serialize = "ANSWERS_DISCUSSION")]
    CommentAnswersDiscussion,
    #[strum(serialize = "AFTER_ACTION")]
    FileAfterAction,
    #[strum(serialize = "BEFORE_ACTION")]
    FileBeforeAction,
    #[strum(serialize = "ISSUE_IN_MONTH")]
    IssueInMonth,
    #[strum(serialize = "ISSUE_HAS_LABEL")]
    IssueHasLabel,
    #[strum(serialize = "REQUIRES_ISSUE")]
    RequiresIssue,
    #[strum(serialize = "REQUIRES_PULL_REQUEST")]
    RequiresPullRequest,
    #[strum(serialize = "ORGANIZATION_OWNS_PROJECT")]
    OrganizationOwnsProject,
    #[strum(serialize = "HAS_ISSUE_MONTH")]
    ProjectHasIssueMonth,
    #[strum(serialize = "HAS_PULL_REQUEST_MONTH")]
    ProjectHasPullRequestMonth,
    #[strum(serialize = "HAS_COMMIT_MONTH")]
    ProjectHasCommitMonth,
    #[strum(serialize = "HAS_RELEASE")]
    ProjectHasRelease,
    #[strum(serialize = "PROJECT_HAS_LABEL")]
    ProjectHasLabel,
    #[strum(serialize = "HAS_WORKFLOW")]
    ProjectHasWorkflow,
    #[strum(serialize = "PROJECT_HAS_MILESTONE")]
    ProjectHasMilestone,
    #[strum(serialize = "HAS_TOPIC")]
    ProjectHasTopic,
    #[strum(serialize = "PROJECT_HAS_BRANCH")]
    ProjectHasBranch,
    #[strum(serialize = "IS_LICENSED")]
    ProjectIsLicensed,
    #[strum(serialize = "DEPENDENT_ON")]
    ProjectIsDependentOn,
    #[strum(serialize = "CONTAINS_LANGUAGE")]
    ProjectContainsLanguage,
    #[strum(serialize = "PROJECT_HAS_DISCUSSION")]
    ProjectHasDiscussion,
    #[strum(serialize = "PULL_REQUEST_HAS_LABEL")]
    PullRequestHasLabel,
    #[strum(serialize = "PULL_REQUEST_IN_MONTH")]
    PullRequestInMonth,
    #[strum(serialize = "REQUESTS_REVIEWER")]
    RequestsReviewer,
    #[strum(serialize = "COMMENTS_ON_PULL_REQUEST_REVIEW")]
    CommentsOnPullRequestReview,
    #[strum(serialize = "REPLY_TO_PULL_REQUEST_REVIEW_COMMENT")]
    IsReplyToPullRequestReviewComment,
    #[strum(serialize = "IS_PULL_REQUEST_BASE_COMMIT")]
    IsPullRequestBaseCommit,
    #[strum(serialize = "IS_PULL_REQUEST_HEAD_COMMIT")]
    IsPullRequestHeadCommit,
    #[strum(serialize = "LINKS_COMMIT")]
    PullRequestEventLinksCommit,
    #[strum(serialize = "PULL_REQUEST_HAS_REVIEW")]
    PullRequestHasReview,
    #[strum(serialize = "HAS_EVENT")]
    PullRequestHasEvent,
    #[strum(serialize = "IS_SINGLE_PULL_REQUEST_REVIEW_COMMENT")]
    IsSinglePullRequestReviewComment,
    #[strum(serialize = "PROPOSES_CHANGE")]
    PullRequestProposesFileChange,
    #[strum(serialize = "REVIEWS_COMMIT")]
    PullRequestReviewReviewsCommit,
    #[strum(serialize = "REVIEW_COMMENT_COMMENTS_COMMIT")]
    ReviewCommentCommentsCommit,
    #[strum(serialize = "REVIEW_COMMENT_COMMENTS_ORIGINAL_COMMIT")]
    ReviewCommentCommentsOriginalCommit,
    #[strum(serialize = "PULL_REQUEST_HAS_TARGET_BRANCH")]
    PullRequestHasTargetBranch,
    #[strum(serialize = "PULL_REQUEST_HAS_SOURCE_BRANCH")]
    PullRequestHasSourceBranch,
    #[strum(serialize = "TAGS_COMMIT")]
    ReleaseTagsCommit,
    #[strum(serialize = "AUTHOR_OF")]
    AuthorOfCommit,
    #[strum(serialize = "COMMITTER_OF")]
    CommitterOfCommit,
    #[strum(serialize = "CLOSES_ISSUE")]
    ClosesIssue,
    #[strum(serialize = "COMMENTS_ON_ISSUE")]
    CommentsOnIssue,
    #[strum(serialize = "CREATES_ISSUE")]
    CreatesIssue,
    #[strum(serialize = "CREATES_PULL_REQUEST")]
    CreatesPullRequest,
    #[strum(serialize = "CREATES_DISCUSSION")]
    CreatesDiscussion,
    #[strum(serialize = "COMMENTS_ON_COMMIT")]
    CommentsOnCommit,
    #[strum(serialize = "COMMENTS_ON_PULL_REQUEST")]
    CommentsOnPullRequest,
    #[strum(serialize = "CREATES_PULL_REQUEST_EVENT")]
    CreatesPullRequestEvent,
    #[strum(serialize = "TRIGGERS_WORKFLOW_RUN")]
    TriggersWorkflowRun,
    #[strum(serialize = "USER_OWNS_PROJECT")]
    UserOwnsProject,
    #[strum(serialize = "CREATES_RELEASE")]
    CreatesRelease,
    #[strum(serialize = "CREATES_DISCUSSION_COMMENT")]
    CreatesDiscussionComment,
    #[strum(serialize = "CREATES_WORKFLOW_RUN")]
    CreatesWorkflowRun,
    #[strum(serialize = "CREATES_PULL_REQUEST_REVIEW")]
    CreatesPullRequestReview,
    #[strum(serialize = "CREATES_MILESTONE")]
    CreatesMilestone,
    #[strum(serialize = "CREATES_PULL_REQUEST_REVIEW_COMMENT")]
    CreatesPullRequestReviewComment,
    #[strum(serialize = "STARS")]
    StarsProject,
    #[strum(serialize = "GETS_ASSIGNED_ISSUE")]
    GetsAssignedIssue,
    #[strum(serialize = "GETS_ASSIGNED_PULL_REQUEST")]
    GetsAssignedPullRequest,
    #[strum(serialize = "WATCHES")]
    WatchesProject,
    #[strum(serialize = "HAS_WORKFLOW_RUN")]
    HasWorkflowRun,
    #[strum(serialize = "WORKFLOW_RUN_HAS_HEAD_COMMIT")]
    WorkflowRunHasHeadCommit,
}

impl RelationshipKind {
    /// Source and destination node kinds matched by key at load time.
    pub fn endpoints(self) -> (NodeKind, NodeKind) {
        use NodeKind as N;
        match self {
            Self::BranchHeadCommit | Self::BranchContainsCommit => (N::Branch, N::Commit),
            Self::CommitInMonth => (N::Commit, N::ProjectCommitMonth),
            Self::PerformsFileAction => (N::Commit, N::FileAction),
            Self::ParentOf => (N::Commit, N::Commit),
            Self::DiscussionHasComment => (N::Discussion, N::DiscussionComment),
            Self::ReplyToDiscussionComment => (N::DiscussionComment, N::DiscussionComment),
            Self::DiscussionHasLabel => (N::Discussion, N::Label),
            Self::CommentAnswersDiscussion => (N::DiscussionComment, N::Discussion),
            Self::FileAfterAction | Self::FileBeforeAction => (N::FileAction, N::File),
            Self::IssueInMonth => (N::Issue, N::ProjectIssueMonth),
            Self::IssueHasLabel => (N::Issue, N::Label),
            Self::RequiresIssue => (N::Milestone, N::Issue),
            Self::RequiresPullRequest => (N::Milestone, N::PullRequest),
            Self::OrganizationOwnsProject => (N::Organization, N::Project),
            Self::ProjectHasIssueMonth => (N::Project, N::ProjectIssueMonth),
            Self::ProjectHasPullRequestMonth => (N::Project, N::ProjectPullRequestMonth),
            Self::ProjectHasCommitMonth => (N::Project, N::ProjectCommitMonth),
            Self::ProjectHasRelease => (N::Project, N::Release),
            Self::ProjectHasLabel => (N::Project, N::Label),
            Self::ProjectHasWorkflow => (N::Project, N::Workflow),
            Self::ProjectHasMilestone => (N::Project, N::Milestone),
            Self::ProjectHasTopic => (N::Project, N::Topic),
            Self::ProjectHasBranch => (N::Project, N::Branch),
            Self::ProjectIsLicensed => (N::Project, N::License),
            Self::ProjectIsDependentOn => (N::Project, N::Dependency),
            Self::ProjectContainsLanguage => (N::Project, N::Language),
            Self::ProjectHasDiscussion => (N::Project, N::Discussion),
            Self::PullRequestHasLabel => (N::PullRequest, N::Label),
            Self::PullRequestInMonth => (N::PullRequest, N::ProjectPullRequestMonth),
            Self::RequestsReviewer => (N::PullRequest, N::User),
            Self::CommentsOnPullRequestReview => {
                (N::PullRequestReviewComment, N::PullRequestReview)
            }
            Self::IsReplyToPullRequestReviewComment => {
                (N::PullRequestReviewComment, N::PullRequestReviewComment)
            }
            Self::IsPullRequestBaseCommit | Self::IsPullRequestHeadCommit => {
                (N::PullRequest, N::Commit)
            }
            Self::PullRequestEventLinksCommit => (N::PullRequestEvent, N::Commit),
            Self::PullRequestHasReview => (N::PullRequest, N::PullRequestReview),
            Self::PullRequestHasEvent => (N::PullRequest, N::PullRequestEvent),
            Self::IsSinglePullRequestReviewComment => (N::PullRequestReviewComment, N::PullRequest),
            Self::PullRequestProposesFileChange => (N::PullRequest, N::PullRequestFile),
            Self::PullRequestReviewReviewsCommit => (N::PullRequestReview, N::Commit),
            Self::ReviewCommentCommentsCommit | Self::ReviewCommentCommentsOriginalCommit => {
                (N::PullRequestReviewComment, N::Commit)
            }
            Self::PullRequestHasTargetBranch | Self::PullRequestHasSourceBranch => {
                (N::PullRequest, N::Branch)
            }
            Self::ReleaseTagsCommit => (N::Release, N::Commit),
            Self::AuthorOfCommit | Self::CommitterOfCommit | Self::CommentsOnCommit => {
                (N::User, N::Commit)
            }
            Self::ClosesIssue
            | Self::CommentsOnIssue
            | Self::CreatesIssue
            | Self::GetsAssignedIssue => (N::User, N::Issue),
            Self::CreatesPullRequest
            | Self::CommentsOnPullRequest
            | Self::GetsAssignedPullRequest => (N::User, N::PullRequest),
            Self::CreatesDiscussion => (N::User, N::Discussion),
            Self::CreatesPullRequestEvent => (N::User, N::PullRequestEvent),
            Self::TriggersWorkflowRun | Self::CreatesWorkflowRun => (N::User, N::WorkflowRun),
            Self::UserOwnsProject | Self::StarsProject | Self::WatchesProject => {
                (N::User, N::Project)
            }
            Self::CreatesRelease => (N::User, N::Release),
            Self::CreatesDiscussionComment => (N::User, N::DiscussionComment),
            Self::CreatesPullRequestReview => (N::User, N::PullRequestReview),
            Self::CreatesMilestone => (N::User, N::Milestone),
            Self::CreatesPullRequestReviewComment => (N::User, N::PullRequestReviewComment),
            Self::HasWorkflowRun => (N::Workflow, N::WorkflowRun),
            Self::WorkflowRunHasHeadCommit => (N::WorkflowRun, N::Commit),
        }
    }

    /// Declared edge properties in declaration (and CSV column) order.
    pub fn properties(self) -> &'static [(&'static str, PropertyType)] {
        match self {
            Self::ProjectHasIssueMonth
            | Self::ProjectHasPullRequestMonth
            | Self::ProjectHasCommitMonth => &[("date_month", Datetime)],
            Self::OrganizationOwnsProject
            | Self::UserOwnsProject
            | Self::CreatesIssue
            | Self::CreatesPullRequest
            | Self::CreatesDiscussion
            | Self::CreatesPullRequestEvent
            | Self::CreatesRelease
            | Self::CreatesDiscussionComment
            | Self::CreatesWorkflowRun
            | Self::CreatesPullRequestReview
            | Self::CreatesMilestone
            | Self::CreatesPullRequestReviewComment => &[("createdAt", Datetime)],
            Self::ClosesIssue => &[("id", Str), ("createdAt", Datetime)],
            Self::CommentsOnIssue => &[("id", Str), ("createdAt", Datetime), ("body", Str)],
            Self::CommentsOnPullRequest => &[("id", Str), ("body", Str), ("createdAt", Datetime)],
            Self::CommentsOnCommit => &[
                ("id", Str),
                ("body", Str),
                ("path", Str),
                ("position", Integer),
                ("line", Integer),
                ("createdAt", Datetime),
            ],
            Self::AuthorOfCommit => &[("authoredAt", Datetime)],
            Self::CommitterOfCommit => &[("committedAt", Datetime)],
            Self::TriggersWorkflowRun => &[("startedAt", Datetime)],
            _ => &[],
        }
    }

    pub fn has_properties(self) -> bool {
        !self.properties().is_empty()
    }
}

/// One directed edge between two node keys, plus coerced edge properties.
#[derive(Debug, Clone)]
pub struct Relationship {
    kind: RelationshipKind,
    source_key: String,
    destination_key: String,
    values: Vec<PropertyValue>,
}

impl Relationship {
    pub fn new(
        kind: RelationshipKind,
        source_key: impl Into<String>,
        destination_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source_key: source_key.into(),
            destination_key: destination_key.into(),
            values: vec![PropertyValue::Empty; kind.properties().len()],
        }
    }

    pub fn kind(&self) -> RelationshipKind {
        self.kind
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn destination_key(&self) -> &str {
        &self.destination_key
    }

    /// Set one declared edge property, coercing to the declared type.
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

    /// Extract matching top-level scalars of `document` into the declared
    /// edge properties, skipping nulls and nested values.
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

    /// Builder-style variant of [`Relationship::extract_and_update`].
    pub fn with(mut self, document: &Value) -> Self {
        self.extract_and_update(document);
        self
    }

    /// Content hash used for within-run edge deduplication. Multiple
    /// edges of one kind may exist between the same node pair as long as
    /// their property tuples differ, so the properties are part of the
    /// hash.
    pub fn dedup_hash(&self) -> String {
        let properties = self
            .kind
            .properties()
            .iter()
            .zip(&self.values)
            .map(|((name, _), value)| format!("{name}:{}", value.to_csv_field()))
            .collect::<Vec<_>>()
            .join("|");
        let mut hasher = Sha256::new();
        hasher.update(
            format!("{}:{properties}:{}", self.source_key, self.destination_key).as_bytes(),
        );
        format!("{:x}", hasher.finalize())
    }

    /// CSV row: `source_id`, `destination_id`, then the declared
    /// properties in order.
    pub fn csv_record(&self) -> Vec<String> {
        let mut record = vec![self.source_key.clone(), self.destination_key.clone()];
        record.extend(self.values.iter().map(PropertyValue::to_csv_field));
        record
    }

    /// CSV header: `source_id`, `destination_id`, property names.
    pub fn csv_header(kind: RelationshipKind) -> Vec<&'static str> {
        let mut header = vec!["source_id", "destination_id"];
        header.extend(kind.properties().iter().map(|(name, _)| *name));
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_are_declared_for_every_kind() {
        use strum::IntoEnumIterator;
        for kind in RelationshipKind::iter() {
            // must not panic, and properties/header must agree
            let _ = kind.endpoints();
            assert_eq!(
                Relationship::csv_header(kind).len(),
                2 + kind.properties().len()
            );
        }
    }

    #[test]
    fn dedup_hash_includes_properties() {
        let plain = Relationship::new(RelationshipKind::CommentsOnIssue, "u1", "i1");
        let mut with_body = Relationship::new(RelationshipKind::CommentsOnIssue, "u1", "i1");
        with_body.set("body", &json!("first!"));
        assert_ne!(plain.dedup_hash(), with_body.dedup_hash());
    }

    #[test]
    fn dedup_hash_is_stable() {
        let a = Relationship::new(RelationshipKind::ParentOf, "c1", "c2");
        let b = Relationship::new(RelationshipKind::ParentOf, "c1", "c2");
        assert_eq!(a.dedup_hash(), b.dedup_hash());
    }

    #[test]
    fn csv_record_leads_with_endpoints() {
        let mut edge = Relationship::new(RelationshipKind::AuthorOfCommit, "default", "abc123");
        edge.set("authoredAt", &json!("2023-01-02T03:04:05Z"));
        assert_eq!(
            edge.csv_record(),
            vec!["default", "abc123", "2023-01-02T03:04:05Z"]
        );
    }

    #[test]
    fn database_names_follow_the_graph_contract() {
        assert_eq!(
            RelationshipKind::PullRequestEventLinksCommit.to_string(),
            "LINKS_COMMIT"
        );
        assert_eq!(RelationshipKind::PullRequestHasEvent.to_string(), "HAS_EVENT");
        assert_eq!(
            RelationshipKind::PullRequestProposesFileChange.to_string(),
            "PROPOSES_CHANGE"
        );
        assert_eq!(RelationshipKind::PerformsFileAction.to_string(), "PERFORMS");
        assert_eq!(RelationshipKind::FileAfterAction.to_string(), "AFTER_ACTION");
    }
}
