//! Unified error model for the namespace core.
//! One enum covers every failure a component can surface to its caller; the
//! presentation layer receives these as explicit values (no ambient
//! notification channel anywhere in this crate).

use serde::{Deserialize, Serialize};

/// How loudly an error should be presented.
///
/// `Critical` is reserved for states that imply latent inconsistent data and
/// must never be rendered like a routine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Critical,
}

// `MovePartial` carries a plain-`String` field named `source`, which
// `#[derive(thiserror::Error)]` would unconditionally treat as the error's
// source (and reject, since `String: !Error`), so `Display`/`Error` are
// implemented by hand with the same messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NsError {
    /// A capability check failed; no backend call was attempted for the
    /// gated operation.
    PermissionDenied { path: String },

    /// A leaf read/delete addressed a path that holds no content. Unlike a
    /// directory listing, this is an error: "no such secret" and "no such
    /// directory" are different conditions.
    NotFound { path: String },

    /// Transport or server failure from the underlying store.
    Backend { path: String, message: String },

    /// `relative_to` was asked for a path outside the given base.
    InvalidPrefix { path: String, base: String },

    /// Malformed input to the path algebra or an operation applied to the
    /// wrong path kind. Well-formed UI input never produces this.
    InvalidPath { path: String },

    /// Client-side rejection of a create whose name already appears in the
    /// most recently fetched listing of the parent directory.
    DuplicateEntry { path: String },

    /// A move wrote the destination but failed to delete the source. The
    /// content now exists at both paths and the operator must resolve it.
    MovePartial {
        source: String,
        destination: String,
        message: String,
    },
}

impl std::fmt::Display for NsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NsError::PermissionDenied { path } => write!(f, "no permission for {path}"),
            NsError::NotFound { path } => write!(f, "not found: {path}"),
            NsError::Backend { path, message } => {
                write!(f, "backend error at {path}: {message}")
            }
            NsError::InvalidPrefix { path, base } => write!(f, "{path} is not under {base}"),
            NsError::InvalidPath { path } => write!(f, "invalid path: {path}"),
            NsError::DuplicateEntry { path } => write!(f, "entry already exists: {path}"),
            NsError::MovePartial { source, destination, message } => write!(
                f,
                "move left content at both {source} and {destination}: {message}"
            ),
        }
    }
}

impl std::error::Error for NsError {}

impl NsError {
    pub fn permission_denied<S: Into<String>>(path: S) -> Self {
        NsError::PermissionDenied { path: path.into() }
    }
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        NsError::NotFound { path: path.into() }
    }
    pub fn backend<S: Into<String>>(path: S, message: S) -> Self {
        NsError::Backend { path: path.into(), message: message.into() }
    }
    pub fn invalid_prefix<S: Into<String>>(path: S, base: S) -> Self {
        NsError::InvalidPrefix { path: path.into(), base: base.into() }
    }
    pub fn invalid_path<S: Into<String>>(path: S) -> Self {
        NsError::InvalidPath { path: path.into() }
    }
    pub fn duplicate_entry<S: Into<String>>(path: S) -> Self {
        NsError::DuplicateEntry { path: path.into() }
    }

    /// Severity used by presentation code when rendering the error.
    /// A partial move is the only condition that escalates: downgrading it
    /// to a generic error would hide a dangling duplicate from the operator.
    pub fn severity(&self) -> Severity {
        match self {
            NsError::MovePartial { .. } => Severity::Critical,
            _ => Severity::Error,
        }
    }

    /// Whether retrying the same call could plausibly succeed. Nothing in
    /// this crate retries automatically; this only informs the UI.
    pub fn retryable(&self) -> bool {
        matches!(self, NsError::Backend { .. })
    }
}

pub type NsResult<T> = Result<T, NsError>;
