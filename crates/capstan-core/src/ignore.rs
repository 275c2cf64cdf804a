//! Ignore-rule seam for the directory loader
//!
//! Pattern matching of ignore files is not implemented here; callers parse
//! the chart's ignore file into whatever matcher they like and hand it to
//! the loader through this trait. The loader always applies the built-in
//! defaults on top of any caller-supplied matcher.

use std::path::{Path, PathBuf};

/// Name of the ignore file probed at a chart root.
pub const IGNORE_FILE: &str = ".helmignore";

/// Matcher deciding whether a path is excluded from ingestion.
///
/// `path` is a forward-slash path relative to the chart root. When a
/// directory is ignored, the loader prunes its whole subtree.
pub trait IgnoreRules {
    fn ignore(&self, path: &str, is_dir: bool) -> bool;
}

impl<F> IgnoreRules for F
where
    F: Fn(&str, bool) -> bool,
{
    fn ignore(&self, path: &str, is_dir: bool) -> bool {
        self(path, is_dir)
    }
}

/// Built-in rules applied whether or not a caller supplies a matcher:
/// the ignore file itself is never ingested.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIgnore;

impl IgnoreRules for DefaultIgnore {
    fn ignore(&self, path: &str, is_dir: bool) -> bool {
        !is_dir && path == IGNORE_FILE
    }
}

/// Locate the ignore file under a chart root, if one exists.
///
/// Convenience for callers that parse the file into an [`IgnoreRules`]
/// matcher before loading.
pub fn ignore_file(root: &Path) -> Option<PathBuf> {
    let candidate = root.join(IGNORE_FILE);
    candidate.is_file().then_some(candidate)
}
