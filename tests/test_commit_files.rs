//! Integration tests for clone-derived processing: commit content,
//! file actions and branches.

use std::path::Path;

use github_graph_miner::clone::{BranchCommits, CommitSummary, FileChange};
use github_graph_miner::processing;
use github_graph_miner::storage::PreprocessorStorage;
use github_graph_miner::types::{Owner, RepositoryId, RepositoryName};

fn repository() -> RepositoryId {
    RepositoryId::new(Owner::from("octo"), RepositoryName::from("clonefix"))
}

fn rows(dir: &Path, kind: &str) -> Vec<Vec<String>> {
    let path = dir.join(format!("{}_{kind}.csv", repository().namespace_hash()));
    if !path.is_file() {
        return Vec::new();
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn change(new_file: bool, deleted_file: bool) -> FileChange {
    FileChange {
        child_commit_sha: "child1".to_string(),
        parent_commit_sha: "parent1".to_string(),
        change_type: if new_file {
            "A".to_string()
        } else if deleted_file {
            "D".to_string()
        } else {
            "M".to_string()
        },
        mime_type_before: "text/plain".to_string(),
        path_before: "src/a.js".to_string(),
        file_sha_before: "sha_before".to_string(),
        file_size_before: 10,
        mime_type_after: "text/plain".to_string(),
        path_after: "src/a.js".to_string(),
        file_sha_after: "sha_after".to_string(),
        file_size_after: 12,
        copied_file: false,
        renamed_file: false,
        new_file,
        deleted_file,
        diff: "@@ -1 +1 @@\n-a\n+b".to_string(),
        added_lines: 1,
        deleted_lines: 1,
    }
}

#[test]
fn modified_file_gets_before_and_after_edges() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = PreprocessorStorage::new(&repository(), dir.path());
    processing::commit_file::process_file_action(&mut storage, &change(false, false)).unwrap();
    storage.flush().unwrap();

    assert_eq!(rows(dir.path(), "File").len(), 2);
    assert_eq!(rows(dir.path(), "FileAction").len(), 1);
    assert_eq!(rows(dir.path(), "BEFORE_ACTION").len(), 1);
    assert_eq!(rows(dir.path(), "AFTER_ACTION").len(), 1);
    let performs = rows(dir.path(), "PERFORMS");
    assert_eq!(performs.len(), 1);
    assert_eq!(performs[0][0], "child1");
}

#[test]
fn new_file_has_no_before_edge_and_deleted_no_after_edge() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = PreprocessorStorage::new(&repository(), dir.path());
    processing::commit_file::process_file_action(&mut storage, &change(true, false)).unwrap();
    storage.flush().unwrap();
    assert!(rows(dir.path(), "BEFORE_ACTION").is_empty());
    assert_eq!(rows(dir.path(), "AFTER_ACTION").len(), 1);

    let dir2 = tempfile::tempdir().unwrap();
    let mut storage2 = PreprocessorStorage::new(&repository(), dir2.path());
    processing::commit_file::process_file_action(&mut storage2, &change(false, true)).unwrap();
    storage2.flush().unwrap();
    assert_eq!(rows(dir2.path(), "BEFORE_ACTION").len(), 1);
    assert!(rows(dir2.path(), "AFTER_ACTION").is_empty());
}

#[test]
fn identical_file_content_deduplicates_across_actions() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = PreprocessorStorage::new(&repository(), dir.path());
    processing::commit_file::process_file_action(&mut storage, &change(false, false)).unwrap();
    // second action touching the same before/after content
    processing::commit_file::process_file_action(&mut storage, &change(false, false)).unwrap();
    storage.flush().unwrap();

    // Files dedup by content hash, FileActions never do (fresh UUID)
    assert_eq!(rows(dir.path(), "File").len(), 2);
    assert_eq!(rows(dir.path(), "FileAction").len(), 2);
    assert_eq!(rows(dir.path(), "PERFORMS").len(), 2);
}

#[test]
fn commit_content_creates_month_bucket_and_parent_edges() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = PreprocessorStorage::new(&repository(), dir.path());
    let merge_commit = CommitSummary {
        hash: "child1".to_string(),
        message: "Merge branch 'dev'".to_string(),
        parent_hashes: vec!["parent1".to_string(), "parent2".to_string()],
        committed_at: "2023-06-15T12:00:00Z".to_string(),
    };
    processing::commit::process_commit_content(&mut storage, "P_1", &merge_commit).unwrap();
    storage.flush().unwrap();

    let commits = rows(dir.path(), "Commit");
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0][2], "True");

    assert_eq!(rows(dir.path(), "ProjectCommitMonth").len(), 1);
    assert_eq!(rows(dir.path(), "COMMIT_IN_MONTH").len(), 1);
    let has_month = rows(dir.path(), "HAS_COMMIT_MONTH");
    assert_eq!(has_month[0][2], "2023-06-01T00:00:00Z");

    let parents = rows(dir.path(), "PARENT_OF");
    assert_eq!(parents.len(), 2);
    assert!(parents.iter().all(|row| row[1] == "child1"));
}

#[test]
fn branch_processing_derives_a_stable_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = PreprocessorStorage::new(&repository(), dir.path());
    let branch = BranchCommits {
        name: "origin/main".to_string(),
        head_commit_sha: "head1".to_string(),
        commit_shas: vec!["head1".to_string(), "older1".to_string()],
    };
    processing::branch::process_branch(&mut storage, "P_1", &branch).unwrap();
    storage.flush().unwrap();

    let branches = rows(dir.path(), "Branch");
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0][1], "origin/main");
    assert!(!branches[0][0].is_empty());

    assert_eq!(rows(dir.path(), "PROJECT_HAS_BRANCH").len(), 1);
    let head = rows(dir.path(), "BRANCH_HAS_HEAD_COMMIT");
    assert_eq!(head[0][1], "head1");
    assert_eq!(rows(dir.path(), "CONTAINS_COMMIT").len(), 2);
}
