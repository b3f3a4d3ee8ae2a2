//! Core type definitions shared across the mining pipeline.
//!
//! Repository identity follows domain-driven naming: every owner/name pair
//! travels as a [`RepositoryId`] so collectors, processors and the loader
//! never pass bare strings around.

pub mod repository;

pub use repository::{Owner, RepositoryId, RepositoryName, RepositoryUrl};

use strum::{Display, EnumIter, EnumString};

/// The two GitHub API surfaces multiplexed by the token pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
pub enum GithubApiKind {
    /// GraphQL API (point-budgeted, `rateLimit` block in every response)
    #[strum(serialize = "GRAPHQL")]
    GraphQl,
    /// REST v3 API (request-budgeted, `X-RateLimit-*` headers)
    #[strum(serialize = "REST")]
    Rest,
}
