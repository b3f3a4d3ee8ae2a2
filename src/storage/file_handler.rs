//! Per-kind CSV files holding the tabular intermediate representation.
//!
//! One file per node kind and one per relationship kind, namespaced by
//! `sha256(owner/name)` so concurrent workers never collide. Headers are
//! written lazily on first append and every field is quoted.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{QuoteStyle, Writer, WriterBuilder};
use strum::IntoEnumIterator;

use crate::graph::{Node, NodeKind, Relationship, RelationshipKind};
use crate::types::RepositoryId;

/// File-name token for either table family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Node(NodeKind),
    Relationship(RelationshipKind),
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(kind) => write!(f, "{kind}"),
            Self::Relationship(kind) => write!(f, "{kind}"),
        }
    }
}

impl TableKind {
    /// Every table the pipeline can produce, nodes first.
    pub fn all() -> Vec<TableKind> {
        NodeKind::iter()
            .map(TableKind::Node)
            .chain(RelationshipKind::iter().map(TableKind::Relationship))
            .collect()
    }
}

pub struct RepositoryFileHandler {
    share_dir: PathBuf,
    namespace: String,
    writers: HashMap<TableKind, Writer<File>>,
}

impl RepositoryFileHandler {
    pub fn new(repository_id: &RepositoryId, share_dir: &Path) -> Self {
        Self {
            share_dir: share_dir.to_path_buf(),
            namespace: repository_id.namespace_hash(),
            writers: HashMap::new(),
        }
    }

    fn file_name(&self, table: TableKind) -> String {
        format!("{}_{table}.csv", self.namespace)
    }

    fn file_path(&self, table: TableKind) -> PathBuf {
        self.share_dir.join(self.file_name(table))
    }

    /// Path in the database's import form, or None when the file was
    /// never written for this repository.
    pub fn neo4j_file_name(&self, table: TableKind) -> Option<String> {
        if self.file_path(table).is_file() {
            Some(format!("file:///{}", self.file_name(table)))
        } else {
            None
        }
    }

    fn writer(&mut self, table: TableKind, header: &[&str]) -> Result<&mut Writer<File>> {
        if !self.writers.contains_key(&table) {
            let path = self.file_path(table);
            let write_header = !path.is_file();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create share dir {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let mut writer = WriterBuilder::new()
                .quote_style(QuoteStyle::Always)
                .from_writer(file);
            if write_header {
                writer.write_record(header)?;
            }
            self.writers.insert(table, writer);
        }
        Ok(self
            .writers
            .get_mut(&table)
            .context("CSV writer disappeared")?)
    }

    pub fn append_node(&mut self, node: &Node) -> Result<()> {
        let table = TableKind::Node(node.kind());
        let header = Node::csv_header(node.kind());
        let record = node.csv_record();
        let writer = self.writer(table, &header)?;
        writer.write_record(&record)?;
        Ok(())
    }

    pub fn append_relationship(&mut self, relationship: &Relationship) -> Result<()> {
        let table = TableKind::Relationship(relationship.kind());
        let header = Relationship::csv_header(relationship.kind());
        let record = relationship.csv_record();
        let writer = self.writer(table, &header)?;
        writer.write_record(&record)?;
        Ok(())
    }

    /// Flush all open writers so the loader reads complete files.
    pub fn flush(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Delete every CSV belonging to this repository.
    pub fn delete_files(&mut self) -> Result<()> {
        self.writers.clear();
        for table in TableKind::all() {
            let path = self.file_path(table);
            if path.is_file() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete {}", path.display()))?;
            }
        }
        Ok(())
    }

    /// Size in KiB of every existing table file, for progress logging.
    pub fn file_sizes(&self) -> HashMap<String, f64> {
        let mut sizes = HashMap::new();
        for table in TableKind::all() {
            let path = self.file_path(table);
            let size = std::fs::metadata(&path)
                .map(|meta| meta.len() as f64 / 1024.0)
                .unwrap_or(0.0);
            sizes.insert(table.to_string(), size);
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Owner, RepositoryName};
    use serde_json::json;

    fn repo() -> RepositoryId {
        RepositoryId::new(Owner::from("octo"), RepositoryName::from("hello"))
    }

    #[test]
    fn writes_header_once_and_quotes_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = RepositoryFileHandler::new(&repo(), dir.path());

        let commit_a = Node::new(NodeKind::Commit).with(&json!({"hash": "a", "message": "m, one"}));
        let commit_b = Node::new(NodeKind::Commit).with(&json!({"hash": "b", "merge": true}));
        handler.append_node(&commit_a).unwrap();
        handler.append_node(&commit_b).unwrap();
        handler.flush().unwrap();

        let path = dir
            .path()
            .join(format!("{}_Commit.csv", repo().namespace_hash()));
        let contents = std::fs::read_to_string(path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), "\"hash\",\"message\",\"merge\"");
        assert_eq!(lines.next().unwrap(), "\"a\",\"m, one\",\"\"");
        assert_eq!(lines.next().unwrap(), "\"b\",\"\",\"True\"");
    }

    #[test]
    fn relationship_rows_lead_with_endpoint_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = RepositoryFileHandler::new(&repo(), dir.path());
        let edge = Relationship::new(RelationshipKind::ParentOf, "p", "c");
        handler.append_relationship(&edge).unwrap();
        handler.flush().unwrap();

        let path = dir
            .path()
            .join(format!("{}_PARENT_OF.csv", repo().namespace_hash()));
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("\"source_id\",\"destination_id\""));
        assert!(contents.contains("\"p\",\"c\""));
    }

    #[test]
    fn neo4j_file_name_only_for_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = RepositoryFileHandler::new(&repo(), dir.path());
        assert!(
            handler
                .neo4j_file_name(TableKind::Node(NodeKind::Commit))
                .is_none()
        );
        let commit = Node::new(NodeKind::Commit).with(&json!({"hash": "a"}));
        handler.append_node(&commit).unwrap();
        handler.flush().unwrap();
        let name = handler
            .neo4j_file_name(TableKind::Node(NodeKind::Commit))
            .unwrap();
        assert!(name.starts_with("file:///"));
        assert!(name.ends_with("_Commit.csv"));
    }

    #[test]
    fn delete_files_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = RepositoryFileHandler::new(&repo(), dir.path());
        let commit = Node::new(NodeKind::Commit).with(&json!({"hash": "a"}));
        handler.append_node(&commit).unwrap();
        handler.flush().unwrap();
        handler.delete_files().unwrap();
        assert!(
            handler
                .neo4j_file_name(TableKind::Node(NodeKind::Commit))
                .is_none()
        );
    }
}
