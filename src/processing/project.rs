//! Project metadata processing: the Project node, ownership, license,
//! topics and languages.

use anyhow::{Context, Result};
use serde_json::Value;

use super::{actor_or_default, add_user, connection_nodes};
use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process the project document and return the project node id every
/// later processor hangs its relationships on.
pub fn process_project(storage: &mut PreprocessorStorage, data: &Value) -> Result<String> {
    let repository = data
        .get("repository")
        .filter(|value| value.is_object())
        .context("Project response carries no repository object")?;

    let project = Node::new(NodeKind::Project).with(repository);
    let project_id = project.key();
    storage.add_node(&project)?;

    if let Some(license_data) = repository.get("licenseInfo").filter(|v| v.is_object()) {
        let license = Node::new(NodeKind::License).with(license_data);
        storage.add_node(&license)?;
        let is_licensed =
            Relationship::new(RelationshipKind::ProjectIsLicensed, &project_id, license.key());
        storage.add_relationship(&is_licensed)?;
    }

    process_owner(storage, &project_id, repository.get("owner"))?;

    for topic_entry in connection_nodes(repository, "repositoryTopics") {
        let Some(topic_data) = topic_entry.get("topic").filter(|v| v.is_object()) else {
            continue;
        };
        let topic = Node::new(NodeKind::Topic).with(topic_data);
        storage.add_node(&topic)?;
        let has_topic = Relationship::new(RelationshipKind::ProjectHasTopic, &project_id, topic.key());
        storage.add_relationship(&has_topic)?;
    }

    for language_data in connection_nodes(repository, "languages") {
        if language_data.get("name").and_then(Value::as_str).is_none() {
            continue;
        }
        let language = Node::new(NodeKind::Language).with(&language_data);
        storage.add_node(&language)?;
        let contains = Relationship::new(
            RelationshipKind::ProjectContainsLanguage,
            &project_id,
            language.key(),
        );
        storage.add_relationship(&contains)?;
    }

    Ok(project_id)
}

/// Repository owners come in two shapes: a User (key `id`) or an
/// Organization (key `orgId`). A missing owner falls back to the
/// sentinel user.
fn process_owner(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    owner: Option<&Value>,
) -> Result<()> {
    let owner_data = actor_or_default(owner);
    if owner_data.get("orgId").is_some() {
        let organization = Node::new(NodeKind::Organization).with(&owner_data);
        storage.add_node(&organization)?;
        let owns = Relationship::new(
            RelationshipKind::OrganizationOwnsProject,
            organization.key(),
            project_id,
        )
        .with(&owner_data);
        storage.add_relationship(&owns)?;
    } else {
        let owner_key = add_user(storage, &owner_data)?;
        let owns = Relationship::new(RelationshipKind::UserOwnsProject, owner_key, project_id)
            .with(&owner_data);
        storage.add_relationship(&owns)?;
    }
    Ok(())
}
