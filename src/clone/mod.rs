//! Local clone driver.
//!
//! Clones a repository once and enumerates commit objects (deduplicated
//! across remote branches), child/parent pairs, per-pair file diffs with
//! MIME naming, and per-branch commit reachability. Everything GitHub
//! cannot answer cheaply comes from here.

pub mod mime;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::DateTime;
use git2::{BranchType, Delta, DiffFindOptions, DiffOptions, Oid, Patch, Repository};
use tracing::info;

use crate::graph::data_type::DATETIME_FORMAT;
use crate::types::RepositoryId;
use mime::{is_mime_relevant, sniff_mime};

/// One commit as the processors consume it.
#[derive(Debug, Clone)]
pub struct CommitSummary {
    pub hash: String,
    pub message: String,
    pub parent_hashes: Vec<String>,
    /// Committer timestamp in `YYYY-MM-DDTHH:MM:SSZ`.
    pub committed_at: String,
}

/// One remote branch with its reachable commits.
#[derive(Debug, Clone)]
pub struct BranchCommits {
    pub name: String,
    pub head_commit_sha: String,
    pub commit_shas: Vec<String>,
}

/// One file-level change between a commit and one of its parents.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub child_commit_sha: String,
    pub parent_commit_sha: String,
    /// A, M, D or R.
    pub change_type: String,
    pub mime_type_before: String,
    pub path_before: String,
    pub file_sha_before: String,
    pub file_size_before: i64,
    pub mime_type_after: String,
    pub path_after: String,
    pub file_sha_after: String,
    pub file_size_after: i64,
    pub copied_file: bool,
    pub renamed_file: bool,
    pub new_file: bool,
    pub deleted_file: bool,
    /// Patch text; empty unless content capture is on and the after-MIME
    /// is relevant.
    pub diff: String,
    pub added_lines: i64,
    pub deleted_lines: i64,
}

pub struct CloneDriver {
    repository: Repository,
    clone_repo_path: PathBuf,
    capture_content: bool,
}

impl CloneDriver {
    /// Clone the repository into `<clone_dir>/<owner>-<name>`, replacing
    /// any stale checkout from an earlier run.
    pub fn clone(
        repository_id: &RepositoryId,
        clone_dir: &Path,
        capture_content: bool,
    ) -> Result<Self> {
        let clone_repo_path = clone_dir.join(format!(
            "{}-{}",
            repository_id.owner, repository_id.repository_name
        ));
        if clone_repo_path.exists() {
            std::fs::remove_dir_all(&clone_repo_path).with_context(|| {
                format!("Failed to clear stale clone {}", clone_repo_path.display())
            })?;
        }
        std::fs::create_dir_all(clone_dir)
            .with_context(|| format!("Failed to create clone dir {}", clone_dir.display()))?;
        let url = repository_id.clone_url();
        info!("Cloning repository from {url}");
        let repository = Repository::clone(&url, &clone_repo_path)
            .with_context(|| format!("Failed to clone {url}"))?;
        Ok(Self {
            repository,
            clone_repo_path,
            capture_content,
        })
    }

    /// Reuse an existing checkout instead of cloning.
    pub fn open(path: &Path, capture_content: bool) -> Result<Self> {
        let repository = Repository::open(path)
            .with_context(|| format!("Failed to open repository at {}", path.display()))?;
        Ok(Self {
            repository,
            clone_repo_path: path.to_path_buf(),
            capture_content,
        })
    }

    /// Remote branch names and head targets, `origin/HEAD` excluded.
    fn remote_branches(&self) -> Result<Vec<(String, Oid)>> {
        let mut branches = Vec::new();
        for entry in self.repository.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            if name.ends_with("/HEAD") {
                continue;
            }
            let Some(target) = branch.get().target() else {
                continue;
            };
            branches.push((name, target));
        }
        Ok(branches)
    }

    /// All commit objects reachable from any remote branch, each yielded
    /// once.
    pub fn commits(&self) -> Result<Vec<CommitSummary>> {
        let mut seen: HashSet<Oid> = HashSet::new();
        let mut commits = Vec::new();
        for (_, head) in self.remote_branches()? {
            let mut revwalk = self.repository.revwalk()?;
            revwalk.push(head)?;
            for entry in revwalk {
                let oid = entry?;
                if !seen.insert(oid) {
                    continue;
                }
                let commit = self.repository.find_commit(oid)?;
                commits.push(CommitSummary {
                    hash: oid.to_string(),
                    message: commit.message().unwrap_or("").to_string(),
                    parent_hashes: commit.parent_ids().map(|id| id.to_string()).collect(),
                    committed_at: format_git_time(commit.time().seconds()),
                });
            }
        }
        Ok(commits)
    }

    /// Per remote branch: name, head sha and the ordered reachable
    /// commit shas.
    pub fn branch_commits(&self) -> Result<Vec<BranchCommits>> {
        let mut branches = Vec::new();
        for (name, head) in self.remote_branches()? {
            let mut revwalk = self.repository.revwalk()?;
            revwalk.push(head)?;
            let mut commit_shas = Vec::new();
            for entry in revwalk {
                commit_shas.push(entry?.to_string());
            }
            branches.push(BranchCommits {
                name,
                head_commit_sha: head.to_string(),
                commit_shas,
            });
        }
        Ok(branches)
    }

    /// Deduplicated (child, parent) commit id pairs.
    fn commit_parent_pairs(&self) -> Result<Vec<(Oid, Oid)>> {
        let mut seen: HashSet<Oid> = HashSet::new();
        let mut pairs = Vec::new();
        for (_, head) in self.remote_branches()? {
            let mut revwalk = self.repository.revwalk()?;
            revwalk.push(head)?;
            for entry in revwalk {
                let oid = entry?;
                if !seen.insert(oid) {
                    continue;
                }
                let commit = self.repository.find_commit(oid)?;
                for parent in commit.parent_ids() {
                    pairs.push((oid, parent));
                }
            }
        }
        Ok(pairs)
    }

    /// Lazy enumeration of file changes: one (child, parent) diff is
    /// computed per refill, so memory stays bounded by a single diff.
    pub fn file_actions(&self) -> Result<FileChangeIter<'_>> {
        Ok(FileChangeIter {
            driver: self,
            pairs: self.commit_parent_pairs()?,
            pair_index: 0,
            buffered: Vec::new(),
        })
    }

    fn diff_pair(&self, child: Oid, parent: Oid) -> Result<Vec<FileChange>> {
        let child_commit = self.repository.find_commit(child)?;
        let parent_commit = self.repository.find_commit(parent)?;
        let child_tree = child_commit.tree()?;
        let parent_tree = parent_commit.tree()?;

        let mut diff_options = DiffOptions::new();
        let mut diff = self.repository.diff_tree_to_tree(
            Some(&parent_tree),
            Some(&child_tree),
            Some(&mut diff_options),
        )?;
        let mut find_options = DiffFindOptions::new();
        find_options.renames(true).copies(true);
        diff.find_similar(Some(&mut find_options))?;

        let mut changes = Vec::new();
        for (index, delta) in diff.deltas().enumerate() {
            let change_type = match delta.status() {
                Delta::Added => "A",
                Delta::Deleted => "D",
                Delta::Renamed => "R",
                _ => "M",
            };
            let new_file = delta.status() == Delta::Added;
            let deleted_file = delta.status() == Delta::Deleted;
            let renamed_file = delta.status() == Delta::Renamed;
            let copied_file = delta.status() == Delta::Copied;

            let path_before = delta
                .old_file()
                .path()
                .map(|path| path.to_string_lossy().to_string())
                .unwrap_or_default();
            let path_after = delta
                .new_file()
                .path()
                .map(|path| path.to_string_lossy().to_string())
                .unwrap_or_default();

            let (file_sha_before, file_size_before, mime_type_before) =
                self.blob_facts(delta.old_file().id(), &path_before);
            let (file_sha_after, file_size_after, mime_type_after) =
                self.blob_facts(delta.new_file().id(), &path_after);

            let (diff_text, added_lines, deleted_lines) = match Patch::from_diff(&diff, index)? {
                Some(mut patch) => {
                    let text = patch
                        .to_buf()
                        .map(|buf| String::from_utf8_lossy(&buf).to_string())
                        .unwrap_or_default();
                    // Counted over the raw unified-diff text, so the
                    // `+++`/`---` file-header lines are included.
                    let (added, deleted) = count_diff_lines(&text);
                    let kept = if self.capture_content && is_mime_relevant(&mime_type_after) {
                        text
                    } else {
                        String::new()
                    };
                    (kept, added, deleted)
                }
                None => (String::new(), 0, 0),
            };

            changes.push(FileChange {
                child_commit_sha: child.to_string(),
                parent_commit_sha: parent.to_string(),
                change_type: change_type.to_string(),
                mime_type_before,
                path_before,
                file_sha_before,
                file_size_before,
                mime_type_after,
                path_after,
                file_sha_after,
                file_size_after,
                copied_file,
                renamed_file,
                new_file,
                deleted_file,
                diff: diff_text,
                added_lines,
                deleted_lines,
            });
        }
        Ok(changes)
    }

    /// (sha, size, mime) of a blob id. A zero id means the side does not
    /// exist; the MIME is then named from the path alone so deletion
    /// diffs of media files still hit the relevance filter.
    fn blob_facts(&self, id: Oid, path: &str) -> (String, i64, String) {
        if id.is_zero() {
            let mime = if path.is_empty() {
                "unknown".to_string()
            } else {
                sniff_mime(path, None)
            };
            return (String::new(), -1, mime);
        }
        match self.repository.find_blob(id) {
            Ok(blob) => {
                let mime = sniff_mime(path, Some(blob.content()));
                (id.to_string(), blob.size() as i64, mime)
            }
            Err(_) => (id.to_string(), -1, "unknown".to_string()),
        }
    }

    /// Delete the working tree.
    pub fn cleanup(&self) -> Result<()> {
        std::fs::remove_dir_all(&self.clone_repo_path).with_context(|| {
            format!("Failed to delete clone {}", self.clone_repo_path.display())
        })
    }
}

fn format_git_time(epoch_seconds: i64) -> String {
    DateTime::from_timestamp(epoch_seconds, 0)
        .map(|timestamp| timestamp.format(DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| "0001-01-01T01:01:01Z".to_string())
}

/// Lines of the diff text beginning with `+` and `-` respectively.
fn count_diff_lines(diff_text: &str) -> (i64, i64) {
    let added = diff_text.lines().filter(|line| line.starts_with('+')).count() as i64;
    let deleted = diff_text.lines().filter(|line| line.starts_with('-')).count() as i64;
    (added, deleted)
}

/// Iterator over file changes, diffing one commit pair at a time.
pub struct FileChangeIter<'a> {
    driver: &'a CloneDriver,
    pairs: Vec<(Oid, Oid)>,
    pair_index: usize,
    buffered: Vec<FileChange>,
}

impl Iterator for FileChangeIter<'_> {
    type Item = Result<FileChange>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(change) = self.buffered.pop() {
                return Some(Ok(change));
            }
            if self.pair_index >= self.pairs.len() {
                return None;
            }
            let (child, parent) = self.pairs[self.pair_index];
            self.pair_index += 1;
            match self.driver.diff_pair(child, parent) {
                Ok(mut changes) => {
                    changes.reverse();
                    self.buffered = changes;
                }
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_time_formatting() {
        assert_eq!(format_git_time(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_git_time(1_680_000_000), "2023-03-28T10:40:00Z");
    }

    #[test]
    fn diff_line_counts_include_file_header_lines() {
        let patch = "diff --git a/a.txt b/a.txt\n\
                     index 1111111..2222222 100644\n\
                     --- a/a.txt\n\
                     +++ b/a.txt\n\
                     @@ -1 +1,2 @@\n \
                     line one\n\
                     +line two\n";
        assert_eq!(count_diff_lines(patch), (2, 1));
        assert_eq!(count_diff_lines(""), (0, 0));
        assert_eq!(count_diff_lines("Binary files differ\n"), (0, 0));
    }
}
