//! Iterator-style facades over the GraphQL API.
//!
//! Pagers are lazy, finite and not restartable: each `next` call may
//! suspend for token acquisition, HTTP dispatch or retry. The collector
//! and the REST fall-back deliver issues and pull requests in the exact
//! same document shape, so downstream processors never know which source
//! produced a record.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::Value;

use super::discussion::DiscussionQuery;
use super::project::project_selection;
use super::query_tree::{GraphQlQueryTree, SecondaryRootKind};
use super::wrapper::GraphQlWrapper;

pub struct GraphQlCollector;

impl GraphQlCollector {
    /// Lazy sequence of `(query result, partially collected numbers)`
    /// rounds for the given secondary roots.
    pub fn pager<'a>(
        wrapper: &'a mut GraphQlWrapper,
        activate: &[SecondaryRootKind],
        exceptions: &[SecondaryRootKind],
    ) -> GraphQlPager<'a> {
        GraphQlPager {
            wrapper,
            tree: GraphQlQueryTree::new(activate, exceptions),
        }
    }

    /// Lazy sequence of comment pages for one discussion number.
    pub fn discussion_pager(wrapper: &mut GraphQlWrapper, number: i64) -> DiscussionPager<'_> {
        DiscussionPager {
            wrapper,
            query: DiscussionQuery::new(number),
        }
    }

    /// One-shot project metadata document (the full `data` object).
    pub async fn get_project(wrapper: &mut GraphQlWrapper) -> Result<Value> {
        wrapper.execute(&project_selection()).await
    }
}

pub struct GraphQlPager<'a> {
    wrapper: &'a mut GraphQlWrapper,
    tree: GraphQlQueryTree,
}

impl GraphQlPager<'_> {
    /// Produce the next round, or None once every non-exception root is
    /// exhausted.
    pub async fn next(
        &mut self,
    ) -> Result<Option<(Value, HashMap<SecondaryRootKind, Vec<i64>>)>> {
        let Some(inner_query) = self.tree.next_query() else {
            return Ok(None);
        };
        let data = self.wrapper.execute(&inner_query).await?;
        let partially_collected = data
            .get("repository")
            .map(|repository| self.tree.parse_result(repository))
            .unwrap_or_default();
        Ok(Some((data, partially_collected)))
    }
}

pub struct DiscussionPager<'a> {
    wrapper: &'a mut GraphQlWrapper,
    query: DiscussionQuery,
}

impl DiscussionPager<'_> {
    /// Produce the next partial discussion document, or None when its
    /// comment list is complete.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        let Some(inner_query) = self.query.next_query() else {
            return Ok(None);
        };
        let data = self.wrapper.execute(&inner_query).await?;
        self.query.parse_result(&data);
        Ok(Some(data))
    }
}
