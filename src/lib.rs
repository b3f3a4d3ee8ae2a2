//! Mining pipeline turning GitHub repository histories into a property
//! graph.
//!
//! For each target repository the pipeline acquires a full historical
//! snapshot over the GraphQL and REST APIs plus a local clone,
//! normalizes everything into typed nodes and relationships, spools
//! them to per-kind CSV files and bulk-loads the files into Neo4j with
//! secondary cross-linking queries.

/// Local clone driver: commits, branches and file diffs with MIME naming
pub mod clone;

/// Configuration document and repository list loading
pub mod config;

/// GitHub API access: token pool, client factory, GraphQL and REST wrappers
pub mod github;

/// Node and relationship kinds, property schemas and coercion rules
pub mod graph;

/// Bulk loader generating Cypher from the schema tables
pub mod loader;

/// Hierarchical processors from response documents to graph operations
pub mod processing;

/// In-memory dedup container and per-kind CSV files
pub mod storage;

/// Repository worker and the bounded worker pool
pub mod services;

/// Core type definitions shared across the pipeline
pub mod types;
