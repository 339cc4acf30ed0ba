use crate::common::repo::{TestRepo, paths};
use bit_checkout::artifacts::checkout::action::Reason;
use bit_checkout::artifacts::checkout::conflict::ConflictType;
use bit_checkout::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy};
use bit_checkout::errors::{CONFLICT_CODE, CheckoutError, ErrorKind};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

#[fixture]
fn repo() -> TestRepo {
    TestRepo::with_head(&[("a.txt", "a"), ("b.txt", "b")])
}

fn expect_conflicts(
    result: bit_checkout::errors::Result<impl std::fmt::Debug>,
) -> Vec<(String, Reason, ConflictType)> {
    match result {
        Err(CheckoutError::Conflict { conflicts }) => conflicts
            .into_iter()
            .map(|conflict| {
                (
                    conflict.path.to_string_lossy().into_owned(),
                    conflict.reason,
                    conflict.conflict_type,
                )
            })
            .collect(),
        other => panic!("expected conflicts, got {other:?}"),
    }
}

#[rstest]
fn switching_between_clean_trees_creates_updates_and_deletes(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a2"), ("c.txt", "c")]);

    let report = repo.safe("topic").unwrap();

    assert_eq!(paths(&report.created), vec!["c.txt"]);
    assert_eq!(paths(&report.updated), vec!["a.txt"]);
    assert_eq!(paths(&report.deleted), vec!["b.txt"]);
    assert_eq!(repo.read("a.txt"), "a2");
    assert_eq!(repo.read("c.txt"), "c");
    assert!(!repo.exists("b.txt"));
    assert_eq!(repo.index_paths(), vec!["a.txt", "c.txt"]);
}

#[rstest]
fn the_index_is_persisted_after_checkout(mut repo: TestRepo) {
    let topic = repo.branch_with("topic", &[("a.txt", "a2")]);

    repo.safe("topic").unwrap();

    let reopened = repo.reopen();
    let staged = reopened
        .index()
        .resolved_entries()
        .map(|entry| entry.name.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(staged, vec!["a.txt"]);
    // HEAD stays where it was
    assert_ne!(reopened.refs().read_head().unwrap(), Some(topic));
}

#[rstest]
fn local_modifications_block_an_update(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a2"), ("b.txt", "b")]);
    repo.write("a.txt", "mine");

    let result = repo.safe("topic");

    assert_eq!(
        expect_conflicts(result),
        vec![("a.txt".to_string(), Reason::Dirty, ConflictType::StaleFile)]
    );
    assert_eq!(repo.read("a.txt"), "mine");
    assert_eq!(repo.read("b.txt"), "b");
}

#[rstest]
fn conflicts_carry_the_conflict_code(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a2")]);
    repo.write("a.txt", "mine");

    let error = repo.safe("topic").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert_eq!(error.code(), CONFLICT_CODE);
}

#[rstest]
fn nothing_is_written_when_any_path_conflicts(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a2"), ("b.txt", "b2"), ("c.txt", "c")]);
    repo.write("b.txt", "mine");

    assert!(repo.safe("topic").is_err());

    assert_eq!(repo.read("a.txt"), "a");
    assert!(!repo.exists("c.txt"));
}

#[rstest]
fn local_modifications_survive_when_the_target_agrees_with_the_baseline(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a"), ("b.txt", "b2")]);
    repo.write("a.txt", "mine");

    let report = repo.safe("topic").unwrap();

    assert_eq!(paths(&report.updated), vec!["b.txt"]);
    assert!(paths(&report.skipped).contains(&"a.txt".to_string()));
    assert_eq!(repo.read("a.txt"), "mine");
    assert_eq!(repo.read("b.txt"), "b2");
}

#[rstest]
fn untracked_files_in_the_way_conflict(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "theirs")]);
    repo.write("c.txt", "mine");

    let result = repo.safe("topic");

    assert_eq!(
        expect_conflicts(result),
        vec![(
            "c.txt".to_string(),
            Reason::Untracked,
            ConflictType::UntrackedOverwritten
        )]
    );
    assert_eq!(repo.read("c.txt"), "mine");
}

#[rstest]
fn untracked_files_matching_the_target_are_adopted(mut repo: TestRepo) {
    let topic = repo.commit_files(&[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "same")]);
    repo.set_branch("topic", &topic);
    repo.write("c.txt", "same");

    repo.safe("topic").unwrap();

    assert_eq!(repo.read("c.txt"), "same");
    assert_eq!(repo.index_oid("c.txt"), Some(repo.blob("same")));
}

#[rstest]
fn deleted_files_are_not_resurrected(mut repo: TestRepo) {
    repo.branch_with("topic", &[("a.txt", "a2"), ("b.txt", "b")]);
    repo.remove("a.txt");

    let result = repo.safe("topic");

    let conflicts = expect_conflicts(result);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].0, "a.txt");
    assert!(!repo.exists("a.txt"));
}

#[rstest]
fn missing_files_stay_missing_unless_recreation_is_asked(mut repo: TestRepo) {
    repo.remove("a.txt");

    let report = repo.safe("master").unwrap();
    assert_eq!(report.changed_count(), 0);
    assert!(!repo.exists("a.txt"));

    let report = repo
        .checkout(
            "master",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE | CheckoutStrategy::RECREATE_MISSING),
        )
        .unwrap();
    assert_eq!(paths(&report.updated), vec!["a.txt"]);
    assert_eq!(repo.read("a.txt"), "a");
}

#[test]
fn directories_emptied_by_the_checkout_are_pruned() {
    let mut repo = TestRepo::with_head(&[
        ("ab/de/fgh.txt", "1"),
        ("ab/x.txt", "2"),
        ("top.txt", "3"),
    ]);
    repo.branch_with("topic", &[("top.txt", "3")]);

    let report = repo.safe("topic").unwrap();

    // removals run in reverse path order
    assert_eq!(paths(&report.deleted), vec!["ab/x.txt", "ab/de/fgh.txt"]);
    assert!(!repo.exists("ab"));
    assert!(repo.exists("top.txt"));
}

#[test]
fn directories_with_untracked_content_are_kept_after_pruning() {
    let mut repo = TestRepo::with_head(&[("ab/x.txt", "1"), ("top.txt", "2")]);
    repo.branch_with("topic", &[("top.txt", "2")]);
    repo.write("ab/notes.txt", "keep me");

    repo.safe("topic").unwrap();

    assert!(!repo.exists("ab/x.txt"));
    assert_eq!(repo.read("ab/notes.txt"), "keep me");
}

#[test]
fn a_file_can_become_a_directory() {
    let mut repo = TestRepo::with_head(&[("a", "file")]);
    repo.branch_with("topic", &[("a/b.txt", "nested")]);

    let report = repo.safe("topic").unwrap();

    assert_eq!(paths(&report.deleted), vec!["a"]);
    assert_eq!(paths(&report.created), vec!["a/b.txt"]);
    assert_eq!(repo.read("a/b.txt"), "nested");
    assert_eq!(repo.index_paths(), vec!["a/b.txt"]);
}

#[test]
fn a_directory_can_become_a_file() {
    let mut repo = TestRepo::with_head(&[("a/b.txt", "nested"), ("a/c/d.txt", "deeper")]);
    repo.branch_with("topic", &[("a", "file")]);

    let report = repo.safe("topic").unwrap();

    assert_eq!(paths(&report.updated), vec!["a"]);
    assert_eq!(repo.read("a"), "file");
    assert_eq!(repo.index_paths(), vec!["a"]);
}

#[test]
fn untracked_files_inside_a_directory_block_replacing_it() {
    let mut repo = TestRepo::with_head(&[("a/b.txt", "nested")]);
    repo.branch_with("topic", &[("a", "file")]);
    repo.write("a/untracked.txt", "precious");

    let result = repo.safe("topic");

    assert_eq!(
        expect_conflicts(result),
        vec![("a".to_string(), Reason::TypeChange, ConflictType::StaleDirectory)]
    );
    assert_eq!(repo.read("a/untracked.txt"), "precious");
    assert_eq!(repo.read("a/b.txt"), "nested");
}

#[test]
fn removing_untracked_files_lets_a_directory_become_a_file() {
    let mut repo = TestRepo::with_head(&[("a/b.txt", "nested")]);
    repo.branch_with("topic", &[("a", "file")]);
    repo.write("a/untracked.txt", "scratch");

    repo.checkout(
        "topic",
        CheckoutOptions::new()
            .strategy(CheckoutStrategy::SAFE | CheckoutStrategy::REMOVE_UNTRACKED),
    )
    .unwrap();

    assert_eq!(repo.read("a"), "file");
}

#[test]
fn modified_files_inside_a_directory_block_replacing_it() {
    let mut repo = TestRepo::with_head(&[("a/b.txt", "nested")]);
    repo.branch_with("topic", &[("a", "file")]);
    repo.write("a/b.txt", "edited");

    let conflicts = expect_conflicts(repo.safe("topic"));

    assert!(conflicts.iter().any(|(path, _, _)| path == "a"));
    assert_eq!(repo.read("a/b.txt"), "edited");
}
