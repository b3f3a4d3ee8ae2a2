//! Tool configuration and repository list loading.
//!
//! A single JSON document configures the whole run. Missing required keys,
//! an empty token list or an empty repository list are fatal before any
//! mining starts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::types::{RepositoryId, RepositoryUrl};

/// Deserialized contents of the configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Maximum number of concurrently mined repositories.
    pub threads: usize,
    /// Deployment mode switches clone/share paths and the database host.
    pub deploy: bool,
    /// Whether textual commit diffs are stored on file actions.
    pub commit_content: bool,
    /// Whether pull request file patches are captured via REST.
    pub pull_request_file_content: bool,
    /// GitHub personal access tokens shared by all workers.
    pub github_tokens: Vec<String>,
    pub db_username: String,
    pub db_password: String,
}

impl Config {
    /// Load and validate the configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        if config.github_tokens.is_empty() {
            bail!("Configuration requires at least one entry in github_tokens");
        }
        if config.threads == 0 {
            bail!("Configuration requires threads >= 1");
        }
        Ok(config)
    }

    /// Directory the clone driver checks repositories out into.
    pub fn clone_dir(&self) -> PathBuf {
        if self.deploy {
            PathBuf::from("/repo_clone/")
        } else {
            PathBuf::from("./dev_data/repo_clone/")
        }
    }

    /// Directory the intermediate CSV files are written to. In deployment
    /// this is the database's import mount.
    pub fn share_dir(&self) -> PathBuf {
        if self.deploy {
            PathBuf::from("/repo_share/")
        } else {
            PathBuf::from("./dev_data/repo_share/")
        }
    }

    /// Bolt URI of the graph database.
    pub fn database_uri(&self) -> String {
        let host = if self.deploy { "neo4j1" } else { "localhost" };
        format!("bolt://{host}:7687")
    }
}

/// Read the newline-delimited repository list.
///
/// Every line is expected to hold one public GitHub repository URL; lines
/// too short to be one are skipped. An empty effective list is fatal.
pub fn read_repository_list(path: &Path) -> Result<Vec<RepositoryId>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read repository list {}", path.display()))?;
    let repositories: Vec<RepositoryId> = raw
        .lines()
        .filter_map(|line| RepositoryId::parse_url(&RepositoryUrl(line.to_string())))
        .collect();
    if repositories.is_empty() {
        bail!(
            "Repository list {} contains no usable repository URLs",
            path.display()
        );
    }
    Ok(repositories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_config() {
        let file = write_temp(
            r#"{
                "threads": 2,
                "deploy": false,
                "commit_content": true,
                "pull_request_file_content": false,
                "github_tokens": ["ghp_a", "ghp_b"],
                "db_username": "neo4j",
                "db_password": "secret"
            }"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.github_tokens.len(), 2);
        assert_eq!(config.database_uri(), "bolt://localhost:7687");
        assert_eq!(config.share_dir(), PathBuf::from("./dev_data/repo_share/"));
    }

    #[test]
    fn deploy_mode_switches_paths_and_host() {
        let file = write_temp(
            r#"{
                "threads": 1,
                "deploy": true,
                "commit_content": false,
                "pull_request_file_content": false,
                "github_tokens": ["ghp_a"],
                "db_username": "neo4j",
                "db_password": "secret"
            }"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database_uri(), "bolt://neo4j1:7687");
        assert_eq!(config.clone_dir(), PathBuf::from("/repo_clone/"));
    }

    #[test]
    fn empty_token_list_is_fatal() {
        let file = write_temp(
            r#"{
                "threads": 1,
                "deploy": false,
                "commit_content": false,
                "pull_request_file_content": false,
                "github_tokens": [],
                "db_username": "neo4j",
                "db_password": "secret"
            }"#,
        );
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn repository_list_skips_short_lines() {
        let file = write_temp(
            "https://github.com/rust-lang/cargo\nshort\n\nhttps://github.com/tokio-rs/tokio\n",
        );
        let repositories = read_repository_list(file.path()).unwrap();
        assert_eq!(repositories.len(), 2);
        assert_eq!(repositories[0].full_name(), "rust-lang/cargo");
    }

    #[test]
    fn empty_repository_list_is_fatal() {
        let file = write_temp("short\n\n");
        assert!(read_repository_list(file.path()).is_err());
    }
}
