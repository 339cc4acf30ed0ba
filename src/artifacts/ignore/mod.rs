//! Ignore rules
//!
//! Checkout only asks one question of ignore rules: is this path ignored?
//! `IgnoreOracle` is that question; `IgnoreRules` answers it with the
//! `ignore` crate's gitignore matcher, fed from `info/exclude`, patterns
//! registered on the repository handle and the root `.gitignore`, in that
//! order. Later sources take precedence, and a path inside an ignored
//! directory is ignored.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

pub const IGNORE_FILE: &str = ".gitignore";

pub trait IgnoreOracle {
    fn is_ignored(&self, path: &Path, is_dir: bool) -> bool;
}

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        IgnoreRules {
            matcher: Gitignore::empty(),
        }
    }
}

impl IgnoreRules {
    /// Gather rules for a checkout writing to `root`.
    pub fn load(git_dir: &Path, root: &Path, extra_rules: &[String]) -> anyhow::Result<Self> {
        let mut builder = GitignoreBuilder::new(root);

        add_file(&mut builder, &git_dir.join("info").join("exclude"))?;
        for rule in extra_rules {
            add_lines(&mut builder, None, rule)?;
        }
        add_file(&mut builder, &root.join(IGNORE_FILE))?;

        Ok(IgnoreRules {
            matcher: builder.build()?,
        })
    }

    /// Rules parsed from gitignore-formatted `text` alone.
    pub fn from_patterns(text: &str) -> anyhow::Result<Self> {
        let mut builder = GitignoreBuilder::new("");
        add_lines(&mut builder, None, text)?;

        Ok(IgnoreRules {
            matcher: builder.build()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }
}

fn add_file(builder: &mut GitignoreBuilder, path: &Path) -> anyhow::Result<()> {
    match std::fs::read(path) {
        Ok(content) => add_lines(
            builder,
            Some(path.to_path_buf()),
            &String::from_utf8_lossy(&content),
        ),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn add_lines(builder: &mut GitignoreBuilder, from: Option<PathBuf>, text: &str) -> anyhow::Result<()> {
    for line in text.lines() {
        builder.add_line(from.clone(), line)?;
    }
    Ok(())
}

impl IgnoreOracle for IgnoreRules {
    fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if self.matcher.is_empty() {
            return false;
        }

        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}
