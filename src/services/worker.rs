//! Repository worker: one task mining one repository end to end.
//!
//! Phase order: project, clone-derived data (commits, file actions,
//! branches), then the GraphQL secondary roots, then the REST passes
//! completing partially collected records, dependencies, commit
//! metadata, optional pull-request patches and workflows; finally the
//! bulk load and cleanup. A failing phase is logged and the worker moves
//! on; a single repository with pathological data never blocks the
//! pool.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::clone::CloneDriver;
use crate::config::Config;
use crate::github::graphql::{GraphQlCollector, SecondaryRootKind, json_path};
use crate::github::rest::RestCollector;
use crate::github::{ClientFactory, TokenPool};
use crate::loader::BulkLoader;
use crate::processing;
use crate::storage::PreprocessorStorage;
use crate::types::RepositoryId;

pub struct RepositoryWorker {
    config: Config,
    repository_id: RepositoryId,
    token_pool: Arc<TokenPool>,
}

impl RepositoryWorker {
    pub fn new(config: Config, repository_id: RepositoryId, token_pool: Arc<TokenPool>) -> Self {
        Self {
            config,
            repository_id,
            token_pool,
        }
    }

    /// Run the repository's pipeline end to end. Errors in individual
    /// phases are logged and skipped; only a failed project fetch or a
    /// failed clone aborts the repository, since nothing downstream can
    /// attach without them.
    pub async fn run(self) {
        let repo = self.repository_id.clone();
        info!("Initializing repository {repo}");
        if let Err(error) = self.mine().await {
            warn!("{repo} Repository worker aborted: {error:#}");
        }
    }

    async fn mine(self) -> Result<()> {
        let repo = self.repository_id.clone();
        let mut storage = PreprocessorStorage::new(&repo, &self.config.share_dir());
        info!("{repo} Clear repository CSV files");
        storage.delete_all_files()?;

        let mut factory = ClientFactory::new(Arc::clone(&self.token_pool), repo.clone());

        // Clone first so a missing repository fails before any token use.
        let clone_dir = self.config.clone_dir();
        let capture_content = self.config.commit_content;
        let repo_for_clone = repo.clone();
        let driver = tokio::task::block_in_place(|| {
            CloneDriver::clone(&repo_for_clone, &clone_dir, capture_content)
        })
        .with_context(|| format!("{repo} Failed to clone repository"))?;

        let project_id = self
            .process_project(&mut storage, &mut factory)
            .await
            .with_context(|| format!("{repo} Failed to collect project metadata"))?;

        self.run_phase("Commit history", || {
            tokio::task::block_in_place(|| -> Result<()> {
                for commit in driver.commits()? {
                    processing::commit::process_commit_content(&mut storage, &project_id, &commit)?;
                }
                Ok(())
            })
        });

        self.run_phase("Commit file/ file actions", || {
            tokio::task::block_in_place(|| -> Result<()> {
                for change in driver.file_actions()? {
                    processing::commit_file::process_file_action(&mut storage, &change?)?;
                }
                Ok(())
            })
        });

        self.run_phase("Branches", || {
            tokio::task::block_in_place(|| -> Result<()> {
                for branch in driver.branch_commits()? {
                    processing::branch::process_branch(&mut storage, &project_id, &branch)?;
                }
                Ok(())
            })
        });

        let mut partially_collected_issues: Vec<i64> = Vec::new();
        if let Err(error) = self
            .process_partial_issues(
                &mut storage,
                &mut factory,
                &project_id,
                &mut partially_collected_issues,
            )
            .await
        {
            warn!("{repo} Collecting issues partially failed: {error:#}");
        }

        let mut partially_collected_pull_requests: Vec<i64> = Vec::new();
        if let Err(error) = self
            .process_partial_pull_requests(
                &mut storage,
                &mut factory,
                &project_id,
                &mut partially_collected_pull_requests,
            )
            .await
        {
            warn!("{repo} Collecting pull requests partially failed: {error:#}");
        }

        if let Err(error) = self
            .process_discussions(&mut storage, &mut factory, &project_id)
            .await
        {
            warn!("{repo} Collecting discussions failed: {error:#}");
        }
        if let Err(error) = self
            .process_stargazers_watchers(&mut storage, &mut factory, &project_id)
            .await
        {
            warn!("{repo} Collecting stargazers/watchers failed: {error:#}");
        }
        if let Err(error) = self
            .process_releases(&mut storage, &mut factory, &project_id)
            .await
        {
            warn!("{repo} Collecting releases failed: {error:#}");
        }
        if let Err(error) = self
            .process_labels(&mut storage, &mut factory, &project_id)
            .await
        {
            warn!("{repo} Collecting labels failed: {error:#}");
        }

        if let Err(error) = self
            .process_remaining_issues(
                &mut storage,
                &mut factory,
                &project_id,
                &partially_collected_issues,
            )
            .await
        {
            warn!("{repo} Collecting remaining issues failed: {error:#}");
        }
        if let Err(error) = self
            .process_remaining_pull_requests(
                &mut storage,
                &mut factory,
                &project_id,
                &partially_collected_pull_requests,
            )
            .await
        {
            warn!("{repo} Collecting remaining pull requests failed: {error:#}");
        }
        if let Err(error) = self
            .process_dependencies(&mut storage, &mut factory, &project_id)
            .await
        {
            warn!("{repo} Collecting dependencies failed: {error:#}");
        }
        if let Err(error) = self.process_commit_meta(&mut storage, &mut factory).await {
            warn!("{repo} Collecting commit metadata failed: {error:#}");
        }
        if self.config.pull_request_file_content {
            if let Err(error) = self
                .process_pull_request_files(&mut storage, &mut factory)
                .await
            {
                warn!("{repo} Collecting pull request files failed: {error:#}");
            }
        }
        if let Err(error) = self
            .process_workflows(&mut storage, &mut factory, &project_id)
            .await
        {
            warn!("{repo} Collecting workflows failed: {error:#}");
        }

        info!("{repo} Destroying GitHub clients");
        if let Err(error) = factory.destroy().await {
            warn!("{repo} Destroying clients failed: {error:#}");
        }

        storage.flush()?;
        info!(
            "{repo} Intermediate file sizes (KiB): {:?}",
            storage.file_sizes()
        );
        match BulkLoader::connect(&self.config, repo.clone(), project_id.clone()).await {
            Ok(loader) => {
                if let Err(error) = loader.load(&storage).await {
                    warn!("{repo} Bulk load failed: {error:#}");
                }
            }
            Err(error) => warn!("{repo} Database connection failed: {error:#}"),
        }

        info!("{repo} Clear cloned repository");
        if let Err(error) = tokio::task::block_in_place(|| driver.cleanup()) {
            warn!("{repo} Clone cleanup failed: {error:#}");
        }
        info!("{repo} Clear repository CSV files");
        storage.delete_all_files()?;
        Ok(())
    }

    /// Run a synchronous clone-backed phase, logging failures.
    fn run_phase(&self, name: &str, phase: impl FnOnce() -> Result<()>) {
        info!("{} Start collecting - {name}", self.repository_id);
        if let Err(error) = phase() {
            warn!("{} Collecting {name} failed: {error:#}", self.repository_id);
        }
    }

    async fn process_project(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
    ) -> Result<String> {
        info!("{} Start collecting - Project", self.repository_id);
        let graphql = factory.graphql().await?;
        let data = GraphQlCollector::get_project(graphql).await?;
        processing::project::process_project(storage, &data)
    }

    async fn process_partial_issues(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
        partially_collected: &mut Vec<i64>,
    ) -> Result<()> {
        info!("{} Start collecting - Issues partial", self.repository_id);
        let graphql = factory.graphql().await?;
        let mut pager = GraphQlCollector::pager(graphql, &[SecondaryRootKind::Issues], &[]);
        while let Some((data, partial)) = pager.next().await? {
            if let Some(issues) = json_path(&data, &["repository", "issues"]) {
                processing::issue::process_issues(storage, project_id, &issues.clone())?;
            }
            if let Some(numbers) = partial.get(&SecondaryRootKind::Issues) {
                partially_collected.extend(numbers);
            }
        }
        Ok(())
    }

    async fn process_partial_pull_requests(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
        partially_collected: &mut Vec<i64>,
    ) -> Result<()> {
        info!("{} Start collecting - Pull requests partial", self.repository_id);
        let defer_files = self.config.pull_request_file_content;
        let graphql = factory.graphql().await?;
        let mut pager = GraphQlCollector::pager(graphql, &[SecondaryRootKind::PullRequests], &[]);
        while let Some((data, partial)) = pager.next().await? {
            if let Some(pull_requests) = json_path(&data, &["repository", "pullRequests"]) {
                processing::pull_request::process_pull_requests(
                    storage,
                    project_id,
                    &pull_requests.clone(),
                    defer_files,
                )?;
            }
            if let Some(numbers) = partial.get(&SecondaryRootKind::PullRequests) {
                partially_collected.extend(numbers);
            }
        }
        Ok(())
    }

    async fn process_discussions(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
    ) -> Result<()> {
        info!("{} Start collecting - Discussions", self.repository_id);
        let graphql = factory.graphql().await?;
        let mut follow_ups: Vec<i64> = Vec::new();
        {
            let mut pager =
                GraphQlCollector::pager(graphql, &[SecondaryRootKind::Discussions], &[]);
            while let Some((data, partial)) = pager.next().await? {
                if let Some(discussions) = json_path(&data, &["repository", "discussions"]) {
                    processing::discussion::process_discussions(
                        storage,
                        project_id,
                        &discussions.clone(),
                    )?;
                }
                if let Some(numbers) = partial.get(&SecondaryRootKind::Discussions) {
                    follow_ups.extend(numbers);
                }
            }
        }
        // Complete overflowing comment lists discussion by discussion.
        for number in follow_ups {
            let mut pager = GraphQlCollector::discussion_pager(graphql, number);
            while let Some(data) = pager.next().await? {
                let content = json_path(&data, &["repository", "discussion"]).cloned();
                let nodes: Vec<Value> = content.into_iter().collect();
                processing::discussion::process_discussions(
                    storage,
                    project_id,
                    &json!({"nodes": nodes}),
                )?;
            }
        }
        Ok(())
    }

    async fn process_stargazers_watchers(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
    ) -> Result<()> {
        info!("{} Start collecting - Stargazers/Watchers", self.repository_id);
        let graphql = factory.graphql().await?;
        let mut pager = GraphQlCollector::pager(
            graphql,
            &[SecondaryRootKind::Stargazers, SecondaryRootKind::Watchers],
            &[],
        );
        while let Some((data, _)) = pager.next().await? {
            if let Some(stargazers) = json_path(&data, &["repository", "stargazers"]) {
                processing::stars::process_stargazers(storage, project_id, &stargazers.clone())?;
            }
            if let Some(watchers) = json_path(&data, &["repository", "watchers"]) {
                processing::watches::process_watchers(storage, project_id, &watchers.clone())?;
            }
        }
        Ok(())
    }

    async fn process_releases(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
    ) -> Result<()> {
        info!("{} Start collecting - Releases", self.repository_id);
        let graphql = factory.graphql().await?;
        let mut pager = GraphQlCollector::pager(graphql, &[SecondaryRootKind::Releases], &[]);
        while let Some((data, _)) = pager.next().await? {
            if let Some(releases) = json_path(&data, &["repository", "releases"]) {
                processing::release::process_releases(storage, project_id, &releases.clone())?;
            }
        }
        Ok(())
    }

    async fn process_labels(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
    ) -> Result<()> {
        info!("{} Start collecting - Labels", self.repository_id);
        let graphql = factory.graphql().await?;
        let mut pager = GraphQlCollector::pager(graphql, &[SecondaryRootKind::Labels], &[]);
        while let Some((data, _)) = pager.next().await? {
            if let Some(labels) = json_path(&data, &["repository", "labels"]) {
                processing::label::process_labels(storage, project_id, &labels.clone())?;
            }
        }
        Ok(())
    }

    async fn process_remaining_issues(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
        numbers: &[i64],
    ) -> Result<()> {
        info!("{} Start collecting - Issues remaining", self.repository_id);
        let rest = factory.rest().await?;
        let mut pager = RestCollector::issue_pager(rest, numbers);
        while let Some(document) = pager.next().await? {
            processing::issue::process_issues(storage, project_id, &document)?;
        }
        Ok(())
    }

    async fn process_remaining_pull_requests(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
        numbers: &[i64],
    ) -> Result<()> {
        info!("{} Start collecting - Pull requests remaining", self.repository_id);
        let defer_files = self.config.pull_request_file_content;
        let rest = factory.rest().await?;
        let mut pager = RestCollector::pull_request_pager(rest, numbers);
        while let Some(document) = pager.next().await? {
            processing::pull_request::process_pull_requests(
                storage,
                project_id,
                &document,
                defer_files,
            )?;
        }
        Ok(())
    }

    async fn process_dependencies(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
    ) -> Result<()> {
        info!("{} Start collecting - Dependencies", self.repository_id);
        let rest = factory.rest().await?;
        let packages = RestCollector::get_sbom(rest).await?;
        processing::dependency::process_dependencies(storage, project_id, &packages)
    }

    async fn process_commit_meta(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
    ) -> Result<()> {
        info!(
            "{} Start collecting - Commit metadata (author/committer/comments)",
            self.repository_id
        );
        let rest = factory.rest().await?;
        let mut pager = RestCollector::commit_pager(rest);
        while let Some(document) = pager.next().await? {
            processing::commit::process_commit_meta(storage, &document)?;
        }
        Ok(())
    }

    async fn process_pull_request_files(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
    ) -> Result<()> {
        info!("{} Start collecting - Pull request file", self.repository_id);
        let rest = factory.rest().await?;
        let mut pager = RestCollector::pull_request_file_pager(rest);
        while let Some(document) = pager.next().await? {
            processing::pull_request_file::process_pull_request_file(storage, &document)?;
        }
        Ok(())
    }

    async fn process_workflows(
        &self,
        storage: &mut PreprocessorStorage,
        factory: &mut ClientFactory,
        project_id: &str,
    ) -> Result<()> {
        info!("{} Start collecting - Workflows", self.repository_id);
        let rest = factory.rest().await?;
        let mut pager = RestCollector::workflow_pager(rest);
        while let Some(document) = pager.next().await? {
            processing::workflow::process_workflow(storage, project_id, &document)?;
        }
        Ok(())
    }
}
