//! Composable GraphQL secondary-root queries with cursor state.
//!
//! Each secondary root (labels, releases, discussions, issues,
//! pullRequests, watchers, stargazers) carries its own cursor and
//! `hasNextPage` flag. A query round emits selections only for roots
//! that still have pages; parsing a round's result advances the cursors
//! and records primary items whose nested lists overflowed their page
//! limit as partially collected. Nested pagination is not followed here,
//! the REST fall-back completes those records.

use std::collections::HashMap;

use serde_json::Value;
use strum::{Display, EnumIter};

/// The secondary roots the tree can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SecondaryRootKind {
    #[strum(serialize = "labels")]
    Labels,
    #[strum(serialize = "releases")]
    Releases,
    #[strum(serialize = "discussions")]
    Discussions,
    #[strum(serialize = "issues")]
    Issues,
    #[strum(serialize = "pullRequests")]
    PullRequests,
    #[strum(serialize = "watchers")]
    Watchers,
    #[strum(serialize = "stargazers")]
    Stargazers,
}

impl SecondaryRootKind {
    /// Page size per root. Changing these changes throughput only.
    pub fn page_size(self) -> u32 {
        match self {
            Self::Labels | Self::Releases => 100,
            Self::Discussions | Self::Issues => 30,
            Self::PullRequests => 15,
            Self::Watchers | Self::Stargazers => 50,
        }
    }
}

/// Cursor state of one secondary root.
struct SecondaryRoot {
    kind: SecondaryRootKind,
    first_execution: bool,
    has_next_page: bool,
    cursor: String,
}

impl SecondaryRoot {
    fn new(kind: SecondaryRootKind) -> Self {
        Self {
            kind,
            first_execution: true,
            has_next_page: true,
            cursor: String::new(),
        }
    }

    fn query_arguments(&self) -> String {
        let mut arguments = format!("first: {}", self.kind.page_size());
        if !self.first_execution {
            arguments.push_str(&format!(", after: \"{}\"", self.cursor));
        }
        arguments
    }

    fn selection(&self) -> String {
        let arguments = self.query_arguments();
        match self.kind {
            SecondaryRootKind::Labels => label_selection(&arguments),
            SecondaryRootKind::Releases => release_selection(&arguments),
            SecondaryRootKind::Discussions => discussion_selection(&arguments),
            SecondaryRootKind::Issues => issue_selection(&arguments),
            SecondaryRootKind::PullRequests => pull_request_selection(&arguments),
            SecondaryRootKind::Watchers => user_connection_selection("watchers", &arguments),
            SecondaryRootKind::Stargazers => user_connection_selection("stargazers", &arguments),
        }
    }

    /// Advance cursor state from this root's subtree of the last result
    /// and return the numbers of partially collected primary items.
    fn parse_result(&mut self, subtree: &Value) -> Vec<i64> {
        self.has_next_page = subtree
            .pointer("/pageInfo/hasNextPage")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if let Some(cursor) = subtree.pointer("/pageInfo/endCursor").and_then(Value::as_str) {
            self.cursor = cursor.to_string();
        }
        self.first_execution = false;

        let mut partially_collected = Vec::new();
        if let Some(nodes) = subtree.get("nodes").and_then(Value::as_array) {
            for item in nodes {
                if contains_has_next_page(item) {
                    if let Some(number) = item.get("number").and_then(Value::as_i64) {
                        partially_collected.push(number);
                    }
                }
            }
        }
        partially_collected
    }
}

/// Recursively search a subtree for any `hasNextPage: true`.
fn contains_has_next_page(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(contains_has_next_page),
        Value::Object(map) => map.iter().any(|(key, nested)| {
            (key == "hasNextPage" && nested.as_bool() == Some(true))
                || contains_has_next_page(nested)
        }),
        _ => false,
    }
}

/// The multi-root query generator.
pub struct GraphQlQueryTree {
    roots: Vec<SecondaryRoot>,
    exceptions: Vec<SecondaryRootKind>,
}

impl GraphQlQueryTree {
    /// `activate` names the roots to collect; `exceptions` names roots
    /// that must not keep the loop alive on their own.
    pub fn new(activate: &[SecondaryRootKind], exceptions: &[SecondaryRootKind]) -> Self {
        Self {
            roots: activate.iter().map(|kind| SecondaryRoot::new(*kind)).collect(),
            exceptions: exceptions.to_vec(),
        }
    }

    /// The next inner query, or None once every non-exception root is
    /// exhausted.
    pub fn next_query(&self) -> Option<String> {
        let live: Vec<&SecondaryRoot> = self
            .roots
            .iter()
            .filter(|root| root.has_next_page)
            .collect();
        let keeps_running = live
            .iter()
            .any(|root| !self.exceptions.contains(&root.kind));
        if !keeps_running {
            return None;
        }
        Some(
            live.iter()
                .map(|root| root.selection())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Update cursors from the `repository` object of the last result and
    /// collect partially collected item numbers per root.
    pub fn parse_result(&mut self, repository: &Value) -> HashMap<SecondaryRootKind, Vec<i64>> {
        let mut partially_collected = HashMap::new();
        for root in &mut self.roots {
            if let Some(subtree) = repository.get(root.kind.to_string()) {
                partially_collected.insert(root.kind, root.parse_result(subtree));
            }
        }
        partially_collected
    }
}

fn actor_fields() -> &'static str {
    r#"... on User {
                id
                login
                email
                name
              }"#
}

fn label_selection(arguments: &str) -> String {
    format!(
        r#"
        labels({arguments}) {{
          nodes {{
            id
            name
          }}
          pageInfo {{
            endCursor
            hasNextPage
          }}
        }}"#
    )
}

fn release_selection(arguments: &str) -> String {
    format!(
        r#"
        releases({arguments}) {{
          nodes {{
            id
            name
            publishedAt
            createdAt
            author {{
              id
              login
              email
              name
            }}
            tagCommit {{
              oid
            }}
          }}
          pageInfo {{
            endCursor
            hasNextPage
          }}
        }}"#
    )
}

fn user_connection_selection(root: &str, arguments: &str) -> String {
    format!(
        r#"
        {root}({arguments}) {{
          nodes {{
            id
            login
            email
            name
          }}
          pageInfo {{
            endCursor
            hasNextPage
          }}
        }}"#
    )
}

fn milestone_fields() -> String {
    format!(
        r#"milestone {{
              id
              number
              title
              description
              dueOn
              createdAt
              closedAt
              progressPercentage
              state
              creator {{
                {actor}
              }}
            }}"#,
        actor = actor_fields()
    )
}

fn issue_selection(arguments: &str) -> String {
    format!(
        r#"
        issues({arguments}) {{
          nodes {{
            id
            number
            title
            body
            state
            createdAt
            {milestone}
            timelineItems(first: 100, itemTypes: [CLOSED_EVENT, CONVERTED_TO_DISCUSSION_EVENT]) {{
              nodes {{
                __typename
                ... on ClosedEvent {{
                  id
                  createdAt
                  actor {{
                    {actor}
                  }}
                }}
                ... on ConvertedToDiscussionEvent {{
                  id
                }}
              }}
              pageInfo {{
                endCursor
                hasNextPage
              }}
            }}
            author {{
              {actor}
            }}
            assignees(first: 20) {{
              nodes {{
                id
                login
                email
                name
              }}
              pageInfo {{
                endCursor
                hasNextPage
              }}
            }}
            labels(first: 50) {{
              nodes {{
                id
                name
              }}
              pageInfo {{
                endCursor
                hasNextPage
              }}
            }}
            comments(first: 100) {{
              nodes {{
                id
                createdAt
                body
                author {{
                  {actor}
                }}
              }}
              pageInfo {{
                endCursor
                hasNextPage
              }}
            }}
          }}
          pageInfo {{
            endCursor
            hasNextPage
          }}
        }}"#,
        milestone = milestone_fields(),
        actor = actor_fields(),
    )
}

fn pull_request_selection(arguments: &str) -> String {
    format!(
        r#"
        pullRequests({arguments}) {{
          pageInfo {{
            hasNextPage
            endCursor
          }}
          nodes {{
            id
            number
            mergedAt
            title
            body
            isDraft
            locked
            createdAt
            activeLockReason
            state
            baseRepository {{
              id
              url
            }}
            headRepository {{
              id
              url
            }}
            headRefOid
            headRefName
            baseRefOid
            baseRefName
            author {{
              {actor}
            }}
            reviewRequests(first: 100) {{
              nodes {{
                requestedReviewer {{
                  {actor}
                }}
              }}
            }}
            {milestone}
            assignees(first: 10) {{
              nodes {{
                id
                login
                email
                name
              }}
              pageInfo {{
                hasNextPage
                endCursor
              }}
            }}
            comments(first: 50) {{
              nodes {{
                id
                body
                createdAt
                author {{
                  {actor}
                }}
              }}
              pageInfo {{
                hasNextPage
                endCursor
              }}
            }}
            timelineItems(first: 100, itemTypes: [MERGED_EVENT, CLOSED_EVENT]) {{
              nodes {{
                __typename
                ... on MergedEvent {{
                  id
                  createdAt
                  actor {{
                    {actor}
                  }}
                  commit {{
                    oid
                  }}
                }}
                ... on ClosedEvent {{
                  id
                  createdAt
                  actor {{
                    {actor}
                  }}
                }}
              }}
              pageInfo {{
                hasNextPage
                endCursor
              }}
            }}
            reviews(first: 100) {{
              nodes {{
                id
                state
                body
                submittedAt
                createdAt
                author {{
                  {actor}
                }}
                commit {{
                  oid
                }}
                comments(first: 100) {{
                  nodes {{
                    id
                    body
                    createdAt
                    diffHunk
                    path
                    startLine
                    originalStartLine
                    line
                    originalLine
                    author {{
                      {actor}
                    }}
                    replyTo {{
                      id
                    }}
                    commit {{
                      oid
                    }}
                    originalCommit {{
                      oid
                    }}
                  }}
                  pageInfo {{
                    hasNextPage
                    endCursor
                  }}
                }}
              }}
              pageInfo {{
                hasNextPage
                endCursor
              }}
            }}
            labels(first: 10) {{
              nodes {{
                id
                name
              }}
              pageInfo {{
                hasNextPage
                endCursor
              }}
            }}
            files(first: 50) {{
              nodes {{
                additions
                deletions
                path
                changeType
              }}
              pageInfo {{
                hasNextPage
                endCursor
              }}
            }}
          }}
        }}"#,
        milestone = milestone_fields(),
        actor = actor_fields(),
    )
}

fn discussion_selection(arguments: &str) -> String {
    format!(
        r#"
        discussions({arguments}) {{
          nodes {{
            id
            number
            title
            closed
            closedAt
            createdAt
            upvoteCount
            body
            category {{
              name
            }}
            author {{
              {actor}
            }}
            labels(first: 50) {{
              nodes {{
                id
                name
              }}
              pageInfo {{
                endCursor
                hasNextPage
              }}
            }}
            {comments}
          }}
          pageInfo {{
            endCursor
            hasNextPage
          }}
        }}"#,
        actor = actor_fields(),
        comments = super::discussion::discussion_comments_selection("first: 30"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_round_has_no_cursor() {
        let tree = GraphQlQueryTree::new(&[SecondaryRootKind::Labels], &[]);
        let query = tree.next_query().unwrap();
        assert!(query.contains("labels(first: 100)"));
        assert!(!query.contains("after:"));
    }

    #[test]
    fn cursor_advances_after_parse() {
        let mut tree = GraphQlQueryTree::new(&[SecondaryRootKind::Labels], &[]);
        tree.parse_result(&json!({
            "labels": {
                "nodes": [],
                "pageInfo": {"hasNextPage": true, "endCursor": "CURSOR_1"}
            }
        }));
        let query = tree.next_query().unwrap();
        assert!(query.contains(r#"after: "CURSOR_1""#));
    }

    #[test]
    fn loop_terminates_when_all_roots_exhausted() {
        let mut tree =
            GraphQlQueryTree::new(&[SecondaryRootKind::Labels, SecondaryRootKind::Releases], &[]);
        tree.parse_result(&json!({
            "labels": {"nodes": [], "pageInfo": {"hasNextPage": false, "endCursor": null}},
            "releases": {"nodes": [], "pageInfo": {"hasNextPage": true, "endCursor": "R1"}},
        }));
        // releases still alive
        let query = tree.next_query().unwrap();
        assert!(query.contains("releases"));
        assert!(!query.contains("labels"));

        tree.parse_result(&json!({
            "releases": {"nodes": [], "pageInfo": {"hasNextPage": false, "endCursor": null}},
        }));
        assert!(tree.next_query().is_none());
    }

    #[test]
    fn exception_roots_do_not_keep_the_loop_alive() {
        let mut tree = GraphQlQueryTree::new(
            &[SecondaryRootKind::Issues, SecondaryRootKind::Watchers],
            &[SecondaryRootKind::Watchers],
        );
        tree.parse_result(&json!({
            "issues": {"nodes": [], "pageInfo": {"hasNextPage": false, "endCursor": null}},
            "watchers": {"nodes": [], "pageInfo": {"hasNextPage": true, "endCursor": "W1"}},
        }));
        assert!(tree.next_query().is_none());
    }

    #[test]
    fn nested_overflow_marks_item_partially_collected() {
        let mut tree = GraphQlQueryTree::new(&[SecondaryRootKind::PullRequests], &[]);
        let partial = tree.parse_result(&json!({
            "pullRequests": {
                "nodes": [
                    {
                        "number": 7,
                        "comments": {"pageInfo": {"hasNextPage": true, "endCursor": "C"}},
                    },
                    {
                        "number": 8,
                        "comments": {"pageInfo": {"hasNextPage": false, "endCursor": null}},
                    }
                ],
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }
        }));
        assert_eq!(partial[&SecondaryRootKind::PullRequests], vec![7]);
    }

    #[test]
    fn deeply_nested_overflow_is_found() {
        let item = json!({
            "number": 3,
            "reviews": {"nodes": [
                {"comments": {"pageInfo": {"hasNextPage": true}}}
            ]}
        });
        assert!(contains_has_next_page(&item));
        let complete = json!({"number": 3, "reviews": {"nodes": []}});
        assert!(!contains_has_next_page(&complete));
    }
}
