use crate::common::repo::{TestRepo, paths};
use bit_checkout::artifacts::index::index_entry::{
    IndexEntry, STAGE_ANCESTOR, STAGE_OURS, STAGE_THEIRS,
};
use bit_checkout::errors::ErrorKind;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::path::{Path, PathBuf};

#[fixture]
fn repo() -> TestRepo {
    TestRepo::with_head(&[("a.txt", "a"), ("b.txt", "b")])
}

#[rstest]
fn local_modifications_are_overwritten(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a2"), ("b.txt", "b")]);
    repo.write("a.txt", "mine");

    let report = repo.force("topic").unwrap();

    assert_eq!(paths(&report.updated), vec!["a.txt"]);
    assert_eq!(repo.read("a.txt"), "a2");
}

#[rstest]
fn local_modifications_are_reverted_to_the_target(mut repo: TestRepo) {
    repo.write("a.txt", "mine");

    repo.force("master").unwrap();

    assert_eq!(repo.read("a.txt"), "a");
    assert_eq!(repo.index_oid("a.txt"), Some(repo.blob("a")));
}

#[rstest]
fn missing_files_are_restored(mut repo: TestRepo) {
    repo.remove("b.txt");

    let report = repo.force("master").unwrap();

    assert_eq!(paths(&report.updated), vec!["b.txt"]);
    assert_eq!(repo.read("b.txt"), "b");
}

#[rstest]
fn untracked_files_in_the_way_are_replaced(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a"), ("c.txt", "theirs")]);
    repo.write("c.txt", "mine");

    repo.force("topic").unwrap();

    assert_eq!(repo.read("c.txt"), "theirs");
}

#[rstest]
fn modified_files_missing_from_the_target_are_deleted(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a")]);
    repo.write("b.txt", "mine");

    let report = repo.force("topic").unwrap();

    assert_eq!(paths(&report.deleted), vec!["b.txt"]);
    assert!(!repo.exists("b.txt"));
    assert_eq!(repo.index_paths(), vec!["a.txt"]);
}

#[rstest]
fn untracked_files_outside_the_target_survive(mut repo: TestRepo) {
    repo.write("notes.txt", "keep");

    repo.force("master").unwrap();

    assert_eq!(repo.read("notes.txt"), "keep");
}

fn mark_unmerged(repo: &mut TestRepo, path: &str) {
    let metadata = repo
        .repository
        .index()
        .entry_by_path(Path::new(path))
        .unwrap()
        .metadata
        .clone();
    for (stage, content) in [
        (STAGE_ANCESTOR, "base"),
        (STAGE_OURS, "ours"),
        (STAGE_THEIRS, "theirs"),
    ] {
        let entry = IndexEntry::new(PathBuf::from(path), repo.blob(content), metadata.clone());
        repo.repository.index_mut().add_conflict(entry, stage).unwrap();
    }
    repo.repository.index_mut().write_updates().unwrap();
}

#[rstest]
fn unmerged_entries_are_resolved_to_the_target(mut repo: TestRepo) {
    mark_unmerged(&mut repo, "a.txt");
    repo.write("a.txt", "<<<<<<< ours\nours\n=======\ntheirs\n>>>>>>> theirs\n");

    repo.force("master").unwrap();

    assert_eq!(repo.read("a.txt"), "a");
    assert!(repo.repository.index().conflicted_paths().is_empty());
    assert!(repo.reopen().index().conflicted_paths().is_empty());
    assert_eq!(repo.index_oid("a.txt"), Some(repo.blob("a")));
}

#[rstest]
fn paths_written_before_a_failure_are_staged_in_memory(mut repo: TestRepo) {
    mark_unmerged(&mut repo, "a.txt");
    let unwritable = "x".repeat(300);
    repo.branch_with("topic", &[("a.txt", "a2"), ("b.txt", "b"), (&unwritable, "y")]);

    let error = repo.force("topic").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Io);
    assert_eq!(repo.read("a.txt"), "a2");
    assert!(repo.repository.index().conflicted_paths().is_empty());
    assert_eq!(repo.index_oid("a.txt"), Some(repo.blob("a2")));
    // nothing is persisted after a failed run
    assert_eq!(repo.reopen().index().conflicted_paths(), vec![PathBuf::from("a.txt")]);
}
