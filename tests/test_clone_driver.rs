//! Integration tests for the clone driver against a synthetic local
//! repository. Remote-branch refs are created directly so no network is
//! involved.

use std::path::Path;

use git2::{Repository, Signature};

use github_graph_miner::clone::CloneDriver;

/// Build a repository with two commits on a synthetic remote branch:
/// commit 1 adds `a.txt` and `img.png`, commit 2 modifies `a.txt` and
/// deletes `img.png`.
fn build_fixture(path: &Path) -> (String, String) {
    let repo = Repository::init(path).unwrap();
    let signature = Signature::new(
        "tester",
        "tester@example.com",
        &git2::Time::new(1_680_000_000, 0),
    )
    .unwrap();

    std::fs::write(path.join("a.txt"), "line one\n").unwrap();
    std::fs::write(path.join("img.png"), b"\x89PNG\x00\x01binary").unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("a.txt")).unwrap();
    index.add_path(Path::new("img.png")).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let first = {
        let tree = repo.find_tree(tree_id).unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "add files", &tree, &[])
            .unwrap()
    };

    std::fs::write(path.join("a.txt"), "line one\nline two\n").unwrap();
    std::fs::remove_file(path.join("img.png")).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("a.txt")).unwrap();
    index.remove_path(Path::new("img.png")).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let second = {
        let tree = repo.find_tree(tree_id).unwrap();
        let parent = repo.find_commit(first).unwrap();
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            "grow a, drop image\n\nfixes #12",
            &tree,
            &[&parent],
        )
        .unwrap()
    };

    // surface the history as a remote branch, the only refs the driver walks
    repo.reference("refs/remotes/origin/main", second, true, "fixture")
        .unwrap();
    (first.to_string(), second.to_string())
}

#[test]
fn enumerates_commits_branches_and_diffs() {
    let dir = tempfile::tempdir().unwrap();
    let (first, second) = build_fixture(dir.path());
    let driver = CloneDriver::open(dir.path(), true).unwrap();

    let commits = driver.commits().unwrap();
    assert_eq!(commits.len(), 2);
    let second_commit = commits.iter().find(|c| c.hash == second).unwrap();
    assert_eq!(second_commit.parent_hashes, vec![first.clone()]);
    assert!(second_commit.message.starts_with("grow a, drop image"));
    assert_eq!(second_commit.committed_at, "2023-03-28T10:40:00Z");

    let branches = driver.branch_commits().unwrap();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].name, "origin/main");
    assert_eq!(branches[0].head_commit_sha, second);
    assert_eq!(branches[0].commit_shas.len(), 2);
    assert_eq!(branches[0].commit_shas[0], second);

    let changes: Vec<_> = driver
        .file_actions()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(changes.len(), 2);

    let modified = changes.iter().find(|c| c.path_after == "a.txt").unwrap();
    assert_eq!(modified.change_type, "M");
    assert_eq!(modified.child_commit_sha, second);
    assert_eq!(modified.parent_commit_sha, first);
    assert!(!modified.new_file && !modified.deleted_file);
    assert_eq!(modified.mime_type_after, "text/plain");
    // literal leading +/- counts over the unified diff, so the
    // +++/--- file-header lines are part of the totals
    assert_eq!(modified.added_lines, 2);
    assert_eq!(modified.deleted_lines, 1);
    // text content is captured
    assert!(modified.diff.contains("+line two"));

    let deleted = changes.iter().find(|c| c.path_before == "img.png").unwrap();
    assert_eq!(deleted.change_type, "D");
    assert!(deleted.deleted_file);
    // blocklisted after-MIME keeps the diff empty
    assert!(deleted.diff.is_empty());
}

#[test]
fn content_capture_off_keeps_all_diffs_empty() {
    let dir = tempfile::tempdir().unwrap();
    build_fixture(dir.path());
    let driver = CloneDriver::open(dir.path(), false).unwrap();
    let changes: Vec<_> = driver
        .file_actions()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert!(!changes.is_empty());
    assert!(changes.iter().all(|change| change.diff.is_empty()));
}
