//! Directory listing with not-found normalization
//! ----------------------------------------------
//! Fetches the immediate children of a directory. In a flat store a
//! directory only exists through its children, so the backend's
//! absent-key signal and "empty directory" are the same condition: a
//! `NotFound` from the store yields a normal empty listing here. Any other
//! backend failure propagates with the path attached.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{BackendError, SecretBackend};
use crate::error::{NsError, NsResult};
use crate::path::SecretPath;

/// Immediate children of one directory, with the query that produced them.
/// Names are relative, duplicate-free and kept in backend order; child
/// directories retain their trailing `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub path: String,
    pub filter: Option<String>,
    pub names: Vec<String>,
}

impl Listing {
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Clone)]
pub struct Lister {
    backend: Arc<dyn SecretBackend>,
}

impl Lister {
    pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
        Self { backend }
    }

    /// List the immediate children of `dir`.
    pub async fn list(&self, dir: &SecretPath) -> NsResult<Listing> {
        self.list_filtered(dir, None).await
    }

    /// List the immediate children of `dir`, keeping only names that
    /// contain `filter` as a substring when one is given.
    pub async fn list_filtered(&self, dir: &SecretPath, filter: Option<&str>) -> NsResult<Listing> {
        if !dir.is_directory() {
            return Err(NsError::invalid_path(dir.as_str().to_string()));
        }
        let names = match self.backend.list(dir.as_str()).await {
            Ok(names) => names,
            Err(BackendError::NotFound) => {
                debug!(target: "vaultns::lister", "no children at '{}', treating as empty", dir);
                Vec::new()
            }
            Err(e) => {
                return Err(NsError::backend(dir.as_str().to_string(), e.to_string()));
            }
        };
        let mut out: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if let Some(f) = filter {
                if !name.contains(f) {
                    continue;
                }
            }
            if !out.contains(&name) {
                out.push(name);
            }
        }
        Ok(Listing {
            path: dir.as_str().to_string(),
            filter: filter.map(str::to_string),
            names: out,
        })
    }
}
