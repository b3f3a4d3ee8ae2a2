//! Bulk loader: index creation, batched CSV ingestion and the
//! cross-linking passes.
//!
//! All Cypher is generated from the schema tables in [`crate::graph`],
//! so adding a node or relationship kind never touches this module.
//! Loads run in bounded transactions of 300 rows; merges on shareable
//! kinds and the cross-link passes serialize through database
//! transactions.

pub mod cypher;

use anyhow::{Context, Result};
use neo4rs::{Graph, Query};
use strum::IntoEnumIterator;
use tracing::info;

use crate::config::Config;
use crate::graph::{NodeKind, RelationshipKind};
use crate::storage::{PreprocessorStorage, TableKind};
use crate::types::RepositoryId;

pub struct BulkLoader {
    graph: Graph,
    repository_id: RepositoryId,
    project_id: String,
}

impl BulkLoader {
    /// Connect to the graph database over bolt.
    pub async fn connect(
        config: &Config,
        repository_id: RepositoryId,
        project_id: String,
    ) -> Result<Self> {
        let uri = config.database_uri();
        let graph = Graph::new(uri.as_str(), config.db_username.as_str(), config.db_password.as_str())
            .await
            .with_context(|| format!("Failed to connect to graph database at {uri}"))?;
        info!("{repository_id} Connection to graph database established");
        Ok(Self {
            graph,
            repository_id,
            project_id,
        })
    }

    /// Run the full load: indexes, nodes, relationships, cross-links.
    pub async fn load(&self, storage: &PreprocessorStorage) -> Result<()> {
        info!("{} Start inserting repository into database", self.repository_id);
        self.create_indexes().await?;
        self.insert_nodes(storage).await?;
        self.insert_relationships(storage).await?;
        self.link_text_references().await?;
        self.link_pull_request_files_to_merge_commits().await?;
        Ok(())
    }

    async fn run(&self, query: String) -> Result<()> {
        self.graph
            .run(Query::new(query.clone()))
            .await
            .with_context(|| format!("{} Query failed: {query}", self.repository_id))
    }

    /// One key index per node kind plus an index on every datetime
    /// property of every node and relationship kind.
    async fn create_indexes(&self) -> Result<()> {
        info!("{} Creating database indexes", self.repository_id);
        for query in cypher::index_queries() {
            self.run(query).await?;
        }
        Ok(())
    }

    async fn insert_nodes(&self, storage: &PreprocessorStorage) -> Result<()> {
        for kind in NodeKind::iter() {
            let Some(file) = storage.neo4j_file_name(TableKind::Node(kind)) else {
                continue;
            };
            info!("{} Inserting node {kind}", self.repository_id);
            self.run(cypher::node_load_query(kind, &file)).await?;
        }
        Ok(())
    }

    async fn insert_relationships(&self, storage: &PreprocessorStorage) -> Result<()> {
        for kind in RelationshipKind::iter() {
            let Some(file) = storage.neo4j_file_name(TableKind::Relationship(kind)) else {
                continue;
            };
            info!("{} Inserting relationship {kind}", self.repository_id);
            self.run(cypher::relationship_load_query(kind, &file)).await?;
        }
        Ok(())
    }

    /// Cross-link pass 1: scan message/title/body text for
    /// `<verb>? #<number>` tokens and link the holder to the referenced
    /// issue or pull request.
    async fn link_text_references(&self) -> Result<()> {
        info!("{} Establishing issue/pull request links", self.repository_id);
        self.run(cypher::link_references_query(&self.project_id)).await
    }

    /// Cross-link pass 2: connect each PullRequestFile of a merged pull
    /// request to the File its merge commit produced at the same path.
    async fn link_pull_request_files_to_merge_commits(&self) -> Result<()> {
        info!("{} Linking pull request files to file nodes", self.repository_id);
        self.run(cypher::link_merge_files_query(&self.project_id)).await
    }
}
