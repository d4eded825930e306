//! Ignore/Discovery (C2): a tree-pruning walk over a project root that
//! never descends an ignored directory and yields only files the
//! language registry can at least detect a language for.

use crate::registry;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Built-in hard-skip directory names, independent of any `.gitignore`
/// content — build artifacts, VCS metadata, and dependency directories
/// that should never be descended into even in a repo with no ignore
/// file at all.
const HARD_SKIP_DIRS: &[&str] = &[
    ".git", ".hg", ".svn", "node_modules", "target", "dist", "build",
    ".venv", "venv", "__pycache__", ".mypy_cache", ".pytest_cache",
    "vendor", ".next", ".nuxt", "bin", "obj",
];

/// Compiled discovery configuration for one project root. Construction
/// reads `ignore_file` (default `.gitignore`) plus the hard-skip list
/// once; `walk` can be called repeatedly (e.g. for a full re-analysis)
/// without re-reading the ignore file unless `reload` is called.
#[derive(Clone)]
pub struct Discovery {
    root: PathBuf,
    ignore_file: String,
    /// Extra exclude globs beyond the ignore file and hard-skip list,
    /// e.g. operator-supplied overrides from configuration.
    extra_excludes: Option<GlobSet>,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Discovery {
            root: root.into(),
            ignore_file: ".gitignore".to_string(),
            extra_excludes: None,
        }
    }

    pub fn with_ignore_file(mut self, name: impl Into<String>) -> Self {
        self.ignore_file = name.into();
        self
    }

    /// Compile a set of additional glob patterns to exclude, on top of
    /// whatever the ignore file and hard-skip list already cover.
    pub fn with_excludes(mut self, patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        self.extra_excludes = builder.build().ok();
        self
    }

    /// Whether `path` (a directory or file) should be pruned/skipped,
    /// independent of the compiled `ignore::Walk` state — used by the
    /// file watcher to filter individual change events, which arrive
    /// outside of a walk.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if path.components().any(|c| {
            HARD_SKIP_DIRS.contains(&c.as_os_str().to_str().unwrap_or(""))
        }) {
            return true;
        }
        let mut builder = ignore::gitignore::GitignoreBuilder::new(&self.root);
        builder.add(self.root.join(&self.ignore_file));
        if let Ok(gi) = builder.build() {
            let is_dir = path.is_dir();
            return gi.matched(path, is_dir).is_ignore();
        }
        false
    }

    /// Tree-pruning walk: one ignore-file compile, many matches, and an
    /// ignored directory is never descended into (not merely filtered
    /// out after listing its contents).
    pub fn walk(&self) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(false)
            .add_custom_ignore_filename(&self.ignore_file)
            .filter_entry(|entry| {
                let name = entry.file_name().to_str().unwrap_or("");
                !HARD_SKIP_DIRS.contains(&name)
            });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue, // unreadable directory: skip, don't halt the walk
            };
            if entry.file_type().is_some_and(|ft| ft.is_file())
                && registry::is_supported(entry.path())
                && !self.extra_excludes.as_ref().is_some_and(|gs| gs.is_match(entry.path()))
            {
                files.push(entry.path().to_path_buf());
            }
        }
        files
    }
}
