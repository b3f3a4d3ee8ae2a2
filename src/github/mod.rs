//! GitHub API access: credential pooling, the GraphQL and REST client
//! envelopes, and the per-repository client factory.

pub mod client_factory;
pub mod error;
pub mod graphql;
pub mod rest;
pub mod token_pool;

pub use client_factory::ClientFactory;
pub use error::ApiRetryableError;
pub use token_pool::TokenPool;

/// Remaining-budget low-water mark. Once a token's remaining points fall
/// to this value or below it is rotated out until its reported reset.
pub const MIN_REMAINING_BUDGET: i64 = 50;
