//! Property-graph data model: node and relationship kinds, their declared
//! property schemas, and the total coercion rules applied to every
//! property write.
//!
//! The deep per-kind class hierarchy of classic miners is flattened into
//! tagged variants plus behavior tables: [`node::NodeKind`] and
//! [`relationship::RelationshipKind`] answer `key_name`, `shareable`,
//! `properties` and `endpoints` queries, and the loader generates its
//! Cypher from those tables instead of virtual dispatch.

pub mod data_type;
pub mod node;
pub mod relationship;

pub use data_type::{PropertyType, PropertyValue};
pub use node::{Node, NodeKind};
pub use relationship::{Relationship, RelationshipKind};

/// The reserved user substituted for missing actor references.
pub const DEFAULT_USER_ID: &str = "default";

/// JSON document of the sentinel user, shaped like a GraphQL `User` node.
pub fn default_user_document() -> serde_json::Value {
    serde_json::json!({
        "id": DEFAULT_USER_ID,
        "login": DEFAULT_USER_ID,
        "name": DEFAULT_USER_ID,
        "email": DEFAULT_USER_ID,
    })
}
