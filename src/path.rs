//! Path algebra for the namespace
//! ------------------------------
//! Single source of truth for classifying and combining logical secret
//! paths. A path is a `/`-separated string; a trailing `/` marks a
//! directory, its absence marks a leaf. Paths are kept normalized (no
//! leading `/`, no duplicate separators). Everything here is pure: no I/O,
//! no backend knowledge.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NsError, NsResult};

/// Collapse duplicate separators and strip a single leading separator.
/// Trailing-separator semantics (directory vs leaf) are preserved.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_sep = false;
    for c in raw.chars() {
        if c == '/' {
            if prev_sep {
                continue;
            }
            prev_sep = true;
        } else {
            prev_sep = false;
        }
        out.push(c);
    }
    if out.starts_with('/') {
        out.remove(0);
    }
    out
}

/// A classified, normalized namespace path.
///
/// The directory/leaf distinction is decided once, at construction, and
/// carried in the type; callers never re-derive it from the raw string.
/// The root directory is the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum SecretPath {
    Directory(String),
    Leaf(String),
}

impl SecretPath {
    /// Normalize and classify a raw path. Total: any string maps to a valid
    /// path. Empty input (or `/`) is the root directory.
    pub fn parse(raw: &str) -> SecretPath {
        let n = normalize(raw);
        if n.is_empty() || n.ends_with('/') {
            SecretPath::Directory(n)
        } else {
            SecretPath::Leaf(n)
        }
    }

    /// The root directory (empty path).
    pub fn root() -> SecretPath {
        SecretPath::Directory(String::new())
    }

    pub fn as_str(&self) -> &str {
        match self {
            SecretPath::Directory(s) | SecretPath::Leaf(s) => s.as_str(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, SecretPath::Directory(_))
    }

    pub fn is_root(&self) -> bool {
        self.as_str().is_empty()
    }

    /// Append a relative name under a directory. The result's kind is
    /// inherited from whether `name` itself ends in `/`.
    ///
    /// Fails with `InvalidPath` when applied to a leaf or given an empty
    /// name; both indicate a caller bug, not bad user input.
    pub fn join(&self, name: &str) -> NsResult<SecretPath> {
        match self {
            SecretPath::Leaf(s) => Err(NsError::invalid_path(s.clone())),
            SecretPath::Directory(base) => {
                if name.is_empty() {
                    return Err(NsError::invalid_path(base.clone()));
                }
                Ok(SecretPath::parse(&format!("{}{}", base, name)))
            }
        }
    }

    /// This path with the `base` directory prefix removed.
    pub fn relative_to(&self, base: &SecretPath) -> NsResult<String> {
        let SecretPath::Directory(prefix) = base else {
            return Err(NsError::invalid_path(base.as_str().to_string()));
        };
        match self.as_str().strip_prefix(prefix.as_str()) {
            Some(rest) => Ok(rest.to_string()),
            None => Err(NsError::invalid_prefix(
                self.as_str().to_string(),
                prefix.clone(),
            )),
        }
    }

    /// The containing directory: everything up to and including the last
    /// separator before the final segment. The root's parent is itself.
    pub fn parent_dir(&self) -> SecretPath {
        let s = self.as_str();
        let trimmed = s.strip_suffix('/').unwrap_or(s);
        match trimmed.rfind('/') {
            Some(idx) => SecretPath::Directory(trimmed[..=idx].to_string()),
            None => SecretPath::root(),
        }
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Order by the underlying string so sorted collections of results come out
// lexicographic regardless of directory/leaf kind.
impl Ord for SecretPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for SecretPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod path_tests;
