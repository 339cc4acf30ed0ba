use crate::common::repo::{EXECUTABLE, REGULAR, SYMLINK, TestRepo, paths};
use bit_checkout::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy};
use bit_checkout::errors::ErrorKind;
use filetime::FileTime;
use pretty_assertions::assert_eq;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn write_attributes(repo: &TestRepo, rules: &str) {
    std::fs::write(
        repo.repository.git_dir().join("info").join("attributes"),
        rules,
    )
    .unwrap();
}

#[test]
fn eol_crlf_converts_line_endings_on_checkout() {
    let mut repo = TestRepo::with_head(&[("keep.md", "k")]);
    write_attributes(&repo, "*.txt eol=crlf\n");
    repo.branch_with("topic", &[("keep.md", "k"), ("a.txt", "one\ntwo\n")]);

    repo.safe("topic").unwrap();

    assert_eq!(repo.read_bytes("a.txt"), b"one\r\ntwo\r\n");
    assert_eq!(repo.read("keep.md"), "k");
}

#[test]
fn converted_files_count_as_clean() {
    let mut repo = TestRepo::with_head(&[("keep.md", "k")]);
    write_attributes(&repo, "*.txt eol=crlf\n");
    repo.branch_with("topic", &[("keep.md", "k"), ("a.txt", "one\ntwo\n")]);
    repo.safe("topic").unwrap();

    let report = repo.safe("topic").unwrap();

    assert_eq!(report.changed_count(), 0);
}

#[test]
fn gitattributes_in_the_working_tree_are_read() {
    let mut repo = TestRepo::with_head(&[(".gitattributes", "*.txt eol=crlf\n")]);
    repo.branch_with(
        "topic",
        &[(".gitattributes", "*.txt eol=crlf\n"), ("a.txt", "x\n")],
    );

    repo.safe("topic").unwrap();

    assert_eq!(repo.read_bytes("a.txt"), b"x\r\n");
}

#[test]
fn ident_expands_to_the_blob_id() {
    let mut repo = TestRepo::with_head(&[("keep.md", "k")]);
    write_attributes(&repo, "*.c ident\n");
    let content = "/* $Id$ */\nint main;\n";
    repo.branch_with("topic", &[("keep.md", "k"), ("main.c", content)]);

    repo.safe("topic").unwrap();

    let oid = repo.blob(content);
    assert_eq!(repo.read("main.c"), format!("/* $Id: {oid} $ */\nint main;\n"));
}

#[test]
fn binary_content_is_never_converted() {
    let mut repo = TestRepo::with_head(&[("keep.md", "k")]);
    write_attributes(&repo, "* eol=crlf\n*.dat -text\n");
    let tree = repo.tree_with_modes(&[
        ("keep.md", b"k", REGULAR),
        ("image.bin", b"a\nb\0c\n", REGULAR),
        ("table.dat", b"1\n2\n", REGULAR),
    ]);
    let commit = repo.commit(tree, vec![]);
    repo.set_branch("topic", &commit);

    repo.safe("topic").unwrap();

    assert_eq!(repo.read_bytes("image.bin"), b"a\nb\0c\n");
    assert_eq!(repo.read_bytes("table.dat"), b"1\n2\n");
}

#[test]
fn symlinks_are_written_as_links() {
    let mut repo = TestRepo::with_head(&[("a.txt", "a")]);
    let tree = repo.tree_with_modes(&[("a.txt", b"a", REGULAR), ("link", b"a.txt", SYMLINK)]);
    let commit = repo.commit(tree, vec![]);
    repo.set_branch("topic", &commit);

    repo.safe("topic").unwrap();

    let link = repo.path("link");
    assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(std::fs::read_link(&link).unwrap(), PathBuf::from("a.txt"));
    assert_eq!(repo.safe("topic").unwrap().changed_count(), 0);
}

#[test]
fn executable_files_get_the_executable_bit() {
    let mut repo = TestRepo::with_head(&[("run.sh", "#!/bin/sh\n")]);
    let tree = repo.tree_with_modes(&[("run.sh", b"#!/bin/sh\n", EXECUTABLE)]);
    let commit = repo.commit(tree, vec![]);
    repo.set_branch("topic", &commit);

    let report = repo.safe("topic").unwrap();

    assert_eq!(paths(&report.updated), vec!["run.sh"]);
    let mode = repo.path("run.sh").metadata().unwrap().permissions().mode();
    assert_ne!(mode & 0o111, 0);
    assert_eq!(
        repo.repository
            .index()
            .entry_by_path(Path::new("run.sh"))
            .unwrap()
            .mode(),
        EXECUTABLE
    );
}

#[test]
fn same_size_edits_with_restored_timestamps_are_still_detected() {
    let mut repo = TestRepo::with_head(&[("a.txt", "aaa")]);
    repo.branch_with("topic", &[("a.txt", "ccc")]);
    let (mtime, mtime_nsec) = repo
        .repository
        .index()
        .entry_by_path(Path::new("a.txt"))
        .unwrap()
        .metadata
        .mtime_pair();

    repo.write("a.txt", "bbb");
    filetime::set_file_mtime(
        repo.path("a.txt"),
        FileTime::from_unix_time(mtime, mtime_nsec as u32),
    )
    .unwrap();

    let error = repo.safe("topic").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert_eq!(repo.read("a.txt"), "bbb");
}

#[test]
fn attribute_rules_are_fixed_for_the_whole_checkout() {
    let mut repo = TestRepo::with_head(&[("keep.md", "k")]);
    repo.branch_with(
        "ident",
        &[("keep.md", "k"), ("ident1.txt", "# $Id$\n"), ("ident2.txt", "# $Id$\n")],
    );
    repo.branch_with(
        "ident-next",
        &[("keep.md", "k"), ("ident1.txt", "# $Id$\n1\n"), ("ident2.txt", "# $Id$\n2\n")],
    );
    let root = repo.root();
    let rewrite_attributes = move |path: Option<&Path>, _: usize, _: usize| {
        if path == Some(Path::new("ident1.txt")) {
            std::fs::write(root.join(".gitattributes"), "*.txt ident\n").unwrap();
        }
    };

    repo.checkout(
        "ident",
        CheckoutOptions::new()
            .strategy(CheckoutStrategy::FORCE)
            .progress_callback(rewrite_attributes.clone()),
    )
    .unwrap();

    assert_eq!(repo.read("ident1.txt"), "# $Id$\n");
    assert_eq!(repo.read("ident2.txt"), "# $Id$\n");

    repo.checkout(
        "ident-next",
        CheckoutOptions::new()
            .strategy(CheckoutStrategy::FORCE)
            .progress_callback(rewrite_attributes),
    )
    .unwrap();

    assert!(repo.read("ident1.txt").starts_with("# $Id: "));
    assert!(repo.read("ident2.txt").starts_with("# $Id: "));
}

#[test]
fn names_at_the_length_limit_are_written_and_removed() {
    // 83 three-byte characters plus the extension
    let name = format!("{}.txt", "受".repeat(83));
    let mut repo = TestRepo::with_head(&[("a.txt", "a")]);
    repo.branch_with("long-file-name", &[("a.txt", "a"), (&name, "long\n")]);

    repo.force("long-file-name").unwrap();
    assert_eq!(repo.read(&name), "long\n");

    repo.force("master").unwrap();
    assert!(!repo.exists(&name));
}
