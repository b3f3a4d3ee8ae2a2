//! Repository identity types and URL parsing.
//!
//! All repository-specific URL parsing lives here so the rest of the
//! pipeline works with validated `owner`/`name` pairs only.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Repository URL wrapper for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryUrl(pub String);

impl RepositoryUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

static REPO_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:https?://)?github\.com/([^/]+)/([^/]+?)(?:\.git)?(?:/.*)?/?$")
        .expect("Failed to compile repository URL regex")
});

/// Repository list entries below this length cannot hold a full
/// `https://github.com/x/y` URL and are skipped during parsing.
pub const MIN_REPOSITORY_URL_LEN: usize = 18;

/// Owner name wrapper for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Owner(pub String);

impl Owner {
    pub fn new(owner: String) -> Self {
        Self(owner)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Owner {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Repository name wrapper for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RepositoryName(pub String);

impl RepositoryName {
    pub fn new(repo_name: String) -> Self {
        Self(repo_name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepositoryName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A strongly-typed GitHub repository identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RepositoryId {
    pub owner: Owner,
    pub repository_name: RepositoryName,
}

impl RepositoryId {
    pub fn new(owner: Owner, repository_name: RepositoryName) -> Self {
        Self {
            owner,
            repository_name,
        }
    }

    /// Parse a repository identifier from a public GitHub URL.
    ///
    /// Lines shorter than [`MIN_REPOSITORY_URL_LEN`] are rejected before the
    /// regex runs; the owner and name are the third and fourth URL segments.
    pub fn parse_url(url: &RepositoryUrl) -> Option<Self> {
        let trimmed = url.0.trim();
        if trimmed.len() <= MIN_REPOSITORY_URL_LEN {
            return None;
        }
        let captures = REPO_URL_REGEX.captures(trimmed)?;
        Some(Self::new(
            Owner(captures.get(1)?.as_str().to_string()),
            RepositoryName(captures.get(2)?.as_str().to_string()),
        ))
    }

    /// `owner/name` form used in logs and namespace hashing.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repository_name)
    }

    /// HTTPS clone URL for the repository.
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}.git", self.full_name())
    }

    /// Stable per-repository file namespace: `sha256(owner/name)` hex.
    pub fn namespace_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.full_name().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_repository_url() {
        let id = RepositoryId::parse_url(&RepositoryUrl(
            "https://github.com/rust-lang/cargo".to_string(),
        ))
        .unwrap();
        assert_eq!(id.owner.as_str(), "rust-lang");
        assert_eq!(id.repository_name.as_str(), "cargo");
    }

    #[test]
    fn parses_url_with_git_suffix_and_trailing_path() {
        let id = RepositoryId::parse_url(&RepositoryUrl(
            "https://github.com/tokio-rs/tokio.git".to_string(),
        ))
        .unwrap();
        assert_eq!(id.full_name(), "tokio-rs/tokio");
    }

    #[test]
    fn rejects_short_lines() {
        assert!(RepositoryId::parse_url(&RepositoryUrl("github.com/a/b".to_string())).is_none());
        assert!(RepositoryId::parse_url(&RepositoryUrl(String::new())).is_none());
    }

    #[test]
    fn namespace_hash_is_stable_and_distinct() {
        let a = RepositoryId::new(Owner::from("facebook"), RepositoryName::from("react"));
        let b = RepositoryId::new(Owner::from("facebook"), RepositoryName::from("jest"));
        assert_eq!(a.namespace_hash(), a.namespace_hash());
        assert_ne!(a.namespace_hash(), b.namespace_hash());
        assert_eq!(a.namespace_hash().len(), 64);
    }
}
