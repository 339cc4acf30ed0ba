use crate::common::repo::{TestRepo, paths};
use bit_checkout::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy};
use bit_checkout::errors::ErrorKind;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

#[fixture]
fn repo() -> TestRepo {
    let repo = TestRepo::with_head(&[(".gitignore", "*.log\n"), ("a.txt", "a"), ("b.txt", "b")]);
    repo.branch_with(
        "topic",
        &[(".gitignore", "*.log\n"), ("a.txt", "a2"), ("b.txt", "b"), ("c.txt", "c")],
    );
    repo
}

fn with_strategy(strategy: CheckoutStrategy) -> CheckoutOptions<'static> {
    CheckoutOptions::new().strategy(strategy)
}

#[rstest]
fn an_empty_strategy_applies_the_safe_rules(mut repo: TestRepo) {
    let report = repo
        .checkout("topic", with_strategy(CheckoutStrategy::empty()))
        .unwrap();

    assert!(!report.dry_run);
    assert_eq!(paths(&report.updated), vec!["a.txt"]);
    assert_eq!(repo.read("a.txt"), "a2");
    assert_eq!(repo.read("c.txt"), "c");
}

#[rstest]
fn an_empty_strategy_still_protects_local_changes(mut repo: TestRepo) {
    repo.write("a.txt", "mine");

    let error = repo
        .checkout("topic", with_strategy(CheckoutStrategy::empty()))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert_eq!(repo.read("a.txt"), "mine");
}

#[rstest]
fn update_only_on_its_own_updates_existing_files(mut repo: TestRepo) {
    let report = repo
        .checkout("topic", with_strategy(CheckoutStrategy::UPDATE_ONLY))
        .unwrap();

    assert_eq!(paths(&report.updated), vec!["a.txt"]);
    assert_eq!(repo.read("a.txt"), "a2");
    assert!(!repo.exists("c.txt"));
}

#[rstest]
fn remove_untracked_on_its_own_removes_untracked_files(mut repo: TestRepo) {
    repo.write("notes.txt", "draft");
    repo.write("debug.log", "noise");

    let report = repo
        .repository
        .checkout_head(with_strategy(CheckoutStrategy::REMOVE_UNTRACKED))
        .unwrap();

    assert_eq!(paths(&report.deleted), vec!["notes.txt"]);
    assert!(!repo.exists("notes.txt"));
    assert!(repo.exists("debug.log"));
}

#[rstest]
fn remove_ignored_on_its_own_removes_ignored_files(mut repo: TestRepo) {
    repo.write("notes.txt", "draft");
    repo.write("debug.log", "noise");

    let report = repo
        .repository
        .checkout_head(with_strategy(CheckoutStrategy::REMOVE_IGNORED))
        .unwrap();

    assert_eq!(paths(&report.deleted), vec!["debug.log"]);
    assert!(!repo.exists("debug.log"));
    assert!(repo.exists("notes.txt"));
}

#[rstest]
fn recreate_missing_on_its_own_restores_deleted_files(mut repo: TestRepo) {
    repo.remove("b.txt");

    let report = repo
        .repository
        .checkout_head(with_strategy(CheckoutStrategy::RECREATE_MISSING))
        .unwrap();

    assert_eq!(paths(&report.updated), vec!["b.txt"]);
    assert_eq!(repo.read("b.txt"), "b");
}

#[rstest]
fn no_refresh_on_its_own_still_writes(mut repo: TestRepo) {
    let report = repo
        .checkout("topic", with_strategy(CheckoutStrategy::NO_REFRESH))
        .unwrap();

    assert_eq!(paths(&report.created), vec!["c.txt"]);
    assert_eq!(repo.read("a.txt"), "a2");
    assert_eq!(repo.index_oid("c.txt"), Some(repo.blob("c")));
}
