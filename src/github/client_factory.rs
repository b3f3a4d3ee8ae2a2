//! Per-repository client lifecycle.
//!
//! Each repository worker owns one factory holding one REST wrapper and
//! one GraphQL wrapper. At most one of the two is started at any time;
//! switching API kinds destroys the other first, keeping the worker's
//! concurrent token holdings at one.

use std::sync::Arc;

use anyhow::Result;

use super::graphql::GraphQlWrapper;
use super::rest::RestWrapper;
use super::token_pool::TokenPool;
use crate::types::{GithubApiKind, RepositoryId};

pub struct ClientFactory {
    graphql: GraphQlWrapper,
    rest: RestWrapper,
    active: Option<GithubApiKind>,
}

impl ClientFactory {
    pub fn new(token_pool: Arc<TokenPool>, repository_id: RepositoryId) -> Self {
        Self {
            graphql: GraphQlWrapper::new(Arc::clone(&token_pool), repository_id.clone()),
            rest: RestWrapper::new(token_pool, repository_id),
            active: None,
        }
    }

    /// The GraphQL wrapper, started; a live REST client is destroyed
    /// first.
    pub async fn graphql(&mut self) -> Result<&mut GraphQlWrapper> {
        if self.active != Some(GithubApiKind::GraphQl) {
            if self.rest.is_running() {
                self.rest.destroy(false).await?;
            }
            self.graphql.start().await?;
            self.active = Some(GithubApiKind::GraphQl);
        }
        Ok(&mut self.graphql)
    }

    /// The REST wrapper, started; a live GraphQL client is destroyed
    /// first.
    pub async fn rest(&mut self) -> Result<&mut RestWrapper> {
        if self.active != Some(GithubApiKind::Rest) {
            if self.graphql.is_running() {
                self.graphql.destroy().await?;
            }
            self.rest.start().await?;
            self.active = Some(GithubApiKind::Rest);
        }
        Ok(&mut self.rest)
    }

    /// Tear down whichever client is live, returning its token.
    pub async fn destroy(&mut self) -> Result<()> {
        if self.graphql.is_running() {
            self.graphql.destroy().await?;
        }
        if self.rest.is_running() {
            self.rest.destroy(false).await?;
        }
        self.active = None;
        Ok(())
    }
}
