use crate::common::repo::{EXECUTABLE, REGULAR, TestRepo, paths};
use bit_checkout::artifacts::checkout::options::{
    CheckoutOptions, CheckoutStrategy, NotifyFlags, NotifyKind, PerfData,
};
use bit_checkout::errors::{CheckoutError, ErrorKind};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::path::PathBuf;

#[fixture]
fn nested() -> TestRepo {
    let repo = TestRepo::with_head(&[
        ("ab/de/2.txt", "2"),
        ("ab/de/fgh/1.txt", "1"),
        ("ab/4.txt", "4"),
        ("top.txt", "top"),
    ]);
    repo.branch_with(
        "topic",
        &[
            ("ab/de/2.txt", "2 changed"),
            ("ab/de/fgh/1.txt", "1 changed"),
            ("ab/4.txt", "4 changed"),
            ("top.txt", "top changed"),
        ],
    );
    repo
}

#[rstest]
fn a_directory_pathspec_limits_the_checkout(mut nested: TestRepo) {
    let report = nested
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE)
                .paths(["ab/de/"]),
        )
        .unwrap();

    assert_eq!(paths(&report.updated), vec!["ab/de/2.txt", "ab/de/fgh/1.txt"]);
    assert_eq!(nested.read("ab/de/fgh/1.txt"), "1 changed");
    assert_eq!(nested.read("ab/4.txt"), "4");
    assert_eq!(nested.read("top.txt"), "top");
    assert_eq!(nested.index_oid("ab/4.txt"), Some(nested.blob("4")));
}

#[rstest]
fn glob_pathspecs_match_across_directories(mut nested: TestRepo) {
    let report = nested
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE)
                .paths(["**/1.txt", "top.txt"]),
        )
        .unwrap();

    assert_eq!(paths(&report.updated), vec!["ab/de/fgh/1.txt", "top.txt"]);
}

#[rstest]
fn literal_pathspecs_only_match_exact_paths(mut nested: TestRepo) {
    let report = nested
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE | CheckoutStrategy::DISABLE_PATHSPEC_MATCH)
                .paths(["ab/*", "top.txt"]),
        )
        .unwrap();

    assert_eq!(paths(&report.updated), vec!["top.txt"]);
    assert_eq!(nested.read("ab/4.txt"), "4");
}

#[rstest]
fn conflicts_outside_the_pathspec_are_ignored(mut nested: TestRepo) {
    nested.write("top.txt", "mine");

    let report = nested
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE)
                .paths(["ab/"]),
        )
        .unwrap();

    assert_eq!(report.updated.len(), 3);
    assert_eq!(nested.read("top.txt"), "mine");
}

#[test]
fn every_classification_is_reported_to_the_callback() {
    let mut repo = TestRepo::with_head(&[("a.txt", "a"), ("b.txt", "b"), ("d.txt", "d")]);
    repo.branch_with("topic", &[("a.txt", "a"), ("c.txt", "c"), ("d.txt", "d2")]);
    repo.write("a.txt", "mine");
    repo.write("notes.txt", "draft");

    let mut seen = Vec::new();
    let report = repo
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE)
                .notify_flags(NotifyFlags::ALL)
                .notify_callback(|kind, path, _files| {
                    seen.push((kind, path.to_string_lossy().into_owned()));
                    0
                }),
        )
        .unwrap();

    assert_eq!(
        seen,
        vec![
            (NotifyKind::Dirty, "a.txt".to_string()),
            (NotifyKind::Updated, "b.txt".to_string()),
            (NotifyKind::Updated, "c.txt".to_string()),
            (NotifyKind::Updated, "d.txt".to_string()),
            (NotifyKind::Untracked, "notes.txt".to_string()),
        ]
    );
    assert_eq!(report.notified, 5);
}

#[test]
fn only_requested_classifications_are_reported() {
    let mut repo = TestRepo::with_head(&[("a.txt", "a")]);
    repo.branch_with("topic", &[("a.txt", "a2")]);
    repo.write("a.txt", "mine");

    let mut seen = Vec::new();
    let result = repo.checkout(
        "topic",
        CheckoutOptions::new()
            .strategy(CheckoutStrategy::SAFE)
            .notify_flags(NotifyFlags::CONFLICT)
            .notify_callback(|kind, path, files| {
                seen.push((kind, path.to_path_buf(), files.target.is_some()));
                0
            }),
    );

    assert!(matches!(result, Err(CheckoutError::Conflict { .. })));
    assert_eq!(seen, vec![(NotifyKind::Conflict, PathBuf::from("a.txt"), true)]);
}

#[test]
fn the_callback_can_cancel_before_anything_is_written() {
    let mut repo = TestRepo::with_head(&[("a.txt", "a"), ("b.txt", "b")]);
    repo.branch_with("topic", &[("a.txt", "a2"), ("b.txt", "b2")]);

    let mut calls = 0;
    let error = repo
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::FORCE)
                .notify_flags(NotifyFlags::UPDATED)
                .notify_callback(|_, _, _| {
                    calls += 1;
                    123
                }),
        )
        .unwrap_err();

    assert_eq!(calls, 1);
    assert_eq!(error.kind(), ErrorKind::Cancelled);
    assert_eq!(error.code(), 123);
    assert_eq!(repo.read("a.txt"), "a");
    assert_eq!(repo.read("b.txt"), "b");
}

#[rstest]
#[case::second_path("b.txt", 123, 2)]
#[case::last_path("d.txt", -5555, 4)]
fn cancelling_midway_reports_how_far_notification_got(
    #[case] stop_at: &str,
    #[case] code: i32,
    #[case] expected_calls: usize,
) {
    let mut repo = TestRepo::with_head(&[("a.txt", "a"), ("b.txt", "b"), ("d.txt", "d")]);
    repo.branch_with("topic", &[("a.txt", "a2"), ("b.txt", "b2"), ("c.txt", "c"), ("d.txt", "d2")]);

    let mut seen = Vec::new();
    let error = repo
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE)
                .notify_flags(NotifyFlags::UPDATED)
                .notify_callback(|_, path, _| {
                    seen.push(path.to_string_lossy().into_owned());
                    if path == std::path::Path::new(stop_at) { code } else { 0 }
                }),
        )
        .unwrap_err();

    assert_eq!(seen.len(), expected_calls);
    assert_eq!(seen.last().map(String::as_str), Some(stop_at));
    assert_eq!(error.code(), code);
    assert!(matches!(error, CheckoutError::Cancelled { .. }));
    assert_eq!(repo.read("a.txt"), "a");
    assert!(!repo.exists("c.txt"));
}

#[test]
fn progress_is_reported_for_every_applied_action() {
    let mut repo = TestRepo::with_head(&[("a.txt", "a"), ("b.txt", "b")]);
    repo.branch_with("topic", &[("a.txt", "a2"), ("c.txt", "c")]);

    let mut calls = Vec::new();
    repo.checkout(
        "topic",
        CheckoutOptions::new()
            .strategy(CheckoutStrategy::SAFE)
            .progress_callback(|path, completed, total| {
                calls.push((path.map(|path| path.to_path_buf()), completed, total));
            }),
    )
    .unwrap();

    assert_eq!(
        calls,
        vec![
            (None, 0, 3),
            (Some(PathBuf::from("b.txt")), 1, 3),
            (Some(PathBuf::from("a.txt")), 2, 3),
            (Some(PathBuf::from("c.txt")), 3, 3),
        ]
    );
}

#[test]
fn performance_counters_are_handed_to_the_callback() {
    let mut repo = TestRepo::with_head(&[("a.txt", "a")]);
    let tree = repo.tree_with_modes(&[
        ("a.txt", b"a", REGULAR),
        ("bin/run.sh", b"#!/bin/sh\n", EXECUTABLE),
        ("deep/er/file.txt", b"x", REGULAR),
    ]);
    let commit = repo.commit(tree, vec![]);
    repo.set_branch("topic", &commit);

    let mut received: Option<PerfData> = None;
    let report = repo
        .checkout(
            "topic",
            CheckoutOptions::new()
                .strategy(CheckoutStrategy::SAFE)
                .perfdata_callback(|perfdata| received = Some(*perfdata)),
        )
        .unwrap();

    let perfdata = received.expect("perfdata callback was not called");
    assert_eq!(perfdata, report.perfdata);
    assert_eq!(perfdata.mkdir_calls, 3);
    assert_eq!(perfdata.chmod_calls, 1);
    assert!(perfdata.stat_calls > 0);
    assert_eq!(perfdata.locked_skips, 0);
}
