//! Dependency processing from the SBOM package list.

use anyhow::Result;
use serde_json::{Value, json};

use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::storage::PreprocessorStorage;

/// Process the SBOM packages. The key is `name-versionInfo`, shared
/// across every repository depending on the same package version.
pub fn process_dependencies(
    storage: &mut PreprocessorStorage,
    project_id: &str,
    packages: &[Value],
) -> Result<()> {
    for package in packages {
        if package.is_null() {
            continue;
        }
        let mut dependency = Node::new(NodeKind::Dependency).with(package);
        let name = package.get("name").and_then(Value::as_str).unwrap_or("");
        let version = package.get("versionInfo").and_then(Value::as_str).unwrap_or("");
        dependency.set("nameAndVersion", &json!(format!("{name}-{version}")));
        storage.add_node(&dependency)?;

        let depends_on = Relationship::new(
            RelationshipKind::ProjectIsDependentOn,
            project_id,
            dependency.key(),
        );
        storage.add_relationship(&depends_on)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Owner, RepositoryId, RepositoryName};

    #[test]
    fn name_and_version_forms_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryId::new(Owner::from("octo"), RepositoryName::from("deps"));
        let mut storage = PreprocessorStorage::new(&repo, dir.path());
        process_dependencies(
            &mut storage,
            "P_1",
            &[json!({"name": "left-pad", "versionInfo": "1.3.0", "licenseDeclared": "MIT"})],
        )
        .unwrap();
        storage.flush().unwrap();
        let contents = std::fs::read_to_string(
            dir.path()
                .join(format!("{}_Dependency.csv", repo.namespace_hash())),
        )
        .unwrap();
        assert!(contents.contains("left-pad-1.3.0"));
    }
}
