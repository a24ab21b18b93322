//! Per-directory ignore-pattern scope, inherited down the tree.
//!
//! Grounded on the teacher's `hash/wildcard.rs` choice of the `glob` crate
//! for whole-string shell-glob matching (`*`, `?`, `[seq]`). The teacher's
//! own `hash/ignore_handler.rs` reaches for the `ignore` crate's gitignore
//! matcher instead, but that crate's semantics (directory-relative,
//! substring-friendly, built-in parent-walk) don't map onto this scope's
//! anchoring rule (a leading `/` binds a pattern to one specific directory,
//! not to the whole subtree) — so scopes are matched by hand against `glob`
//! patterns instead, and chained through an explicit parent reference.

use std::fs;
use std::path::Path;
use std::sync::Arc;

/// One directory's view of the active ignore patterns, including those
/// inherited from ancestors. Immutable after construction and safely shared
/// across worker threads via `Arc`.
pub struct IgnoreScope {
    patterns: Vec<String>,
    parent: Option<Arc<IgnoreScope>>,
    /// Basename of this scope's directory, with a trailing `/`, used to
    /// build full relative paths when delegating a check to the parent.
    name: String,
}

impl IgnoreScope {
    /// Build a root scope (no parent) for `dir`, reading `<dir>/<ignore_filename>`
    /// if it exists.
    pub fn root(dir: &Path, ignore_filename: &str) -> Self {
        Self {
            patterns: load_patterns(dir, ignore_filename),
            parent: None,
            name: scope_name(dir),
        }
    }

    /// Build a child scope for `dir`, inheriting from `parent`.
    pub fn child(dir: &Path, ignore_filename: &str, parent: Arc<IgnoreScope>) -> Self {
        Self {
            patterns: load_patterns(dir, ignore_filename),
            parent: Some(parent),
            name: scope_name(dir),
        }
    }

    /// Does this scope (or one of its ancestors) ignore `name`?
    ///
    /// `full` is `None` when called directly by a worker for an entry in
    /// this scope's own directory; scopes recursing into their parent pass
    /// the composed relative path so an ancestor's anchored (`/`-prefixed)
    /// patterns only match entries in that ancestor's own directory, never
    /// a descendant reached through inheritance.
    pub fn should_ignore(&self, name: &str, full: Option<&str>) -> bool {
        for pattern in &self.patterns {
            if let Some(anchored) = pattern.strip_prefix('/') {
                // Anchored patterns only ever apply to this scope's own
                // directory: a `full` path means the check originated in a
                // descendant, so the anchor cannot apply here.
                if full.is_some() {
                    continue;
                }
                if glob_matches(anchored, name) {
                    return true;
                }
                continue;
            }

            if glob_matches(pattern, name) {
                return true;
            }
            if let Some(full) = full {
                if glob_matches(pattern, full) {
                    return true;
                }
            }
        }

        match &self.parent {
            Some(parent) => {
                let current = full.unwrap_or(name);
                let composed = format!("{}{}", self.name, current);
                parent.should_ignore(current, Some(&composed))
            }
            None => false,
        }
    }
}

fn scope_name(dir: &Path) -> String {
    let base = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    format!("{base}/")
}

fn load_patterns(dir: &Path, ignore_filename: &str) -> Vec<String> {
    let path = dir.join(ignore_filename);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => return Vec::new(),
    };

    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

fn glob_matches(pattern: &str, candidate: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(pattern) => pattern.matches(candidate),
        Err(_) => false,
    }
}
