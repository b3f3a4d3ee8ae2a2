//! Follow-up query completing discussions whose comment list overflowed
//! the nested page limit.
//!
//! Only the comment connection is paged; replies are capped at 100 per
//! comment.

use serde_json::Value;

use super::json_path;

/// Comment connection selection shared with the discussions secondary
/// root.
pub fn discussion_comments_selection(arguments: &str) -> String {
    format!(
        r#"comments({arguments}) {{
              nodes {{
                id
                body
                isAnswer
                createdAt
                author {{
                  ... on User {{
                    id
                    login
                    email
                    name
                  }}
                }}
                replies(first: 100) {{
                    nodes {{
                      id
                      body
                      createdAt
                      author {{
                        ... on User {{
                          id
                          name
                          login
                          email
                        }}
                      }}
                    }}
                    pageInfo {{
                      hasNextPage
                      endCursor
                    }}
                }}
              }}
              pageInfo {{
                endCursor
                hasNextPage
              }}
            }}"#
    )
}

/// Cursor state for one discussion's comment pages.
pub struct DiscussionQuery {
    number: i64,
    first_execution: bool,
    cursor: String,
    has_next_page: bool,
}

impl DiscussionQuery {
    pub fn new(number: i64) -> Self {
        Self {
            number,
            first_execution: true,
            cursor: String::new(),
            has_next_page: true,
        }
    }

    pub fn is_finished(&self) -> bool {
        !self.has_next_page
    }

    /// The next inner query, or None when the comment list is complete.
    pub fn next_query(&self) -> Option<String> {
        if self.is_finished() {
            return None;
        }
        let mut arguments = "first: 100".to_string();
        if !self.first_execution {
            arguments.push_str(&format!(", after: \"{}\"", self.cursor));
        }
        Some(format!(
            r#"
        discussion(number: {number}) {{
            id
            labels(first: 50) {{
              nodes {{
                id
                name
              }}
            }}
            category {{
              name
            }}
            {comments}
        }}"#,
            number = self.number,
            comments = discussion_comments_selection(&arguments),
        ))
    }

    /// Advance the comment cursor from the last result.
    pub fn parse_result(&mut self, data: &Value) {
        self.first_execution = false;
        let page_info_path = ["repository", "discussion", "comments", "pageInfo"];
        self.has_next_page = json_path(data, &page_info_path)
            .and_then(|info| info.get("hasNextPage"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if let Some(cursor) = json_path(data, &page_info_path)
            .and_then(|info| info.get("endCursor"))
            .and_then(Value::as_str)
        {
            self.cursor = cursor.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pages_until_comments_are_complete() {
        let mut query = DiscussionQuery::new(42);
        let first = query.next_query().unwrap();
        assert!(first.contains("discussion(number: 42)"));
        assert!(!first.contains("after:"));

        query.parse_result(&json!({
            "repository": {"discussion": {"comments": {
                "pageInfo": {"hasNextPage": true, "endCursor": "D1"}
            }}}
        }));
        assert!(query.next_query().unwrap().contains(r#"after: "D1""#));

        query.parse_result(&json!({
            "repository": {"discussion": {"comments": {
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }}}
        }));
        assert!(query.next_query().is_none());
    }

    #[test]
    fn missing_discussion_ends_the_pager() {
        let mut query = DiscussionQuery::new(7);
        query.parse_result(&json!({"repository": {"discussion": null}}));
        assert!(query.is_finished());
    }
}
