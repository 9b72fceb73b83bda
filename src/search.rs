//! Capability-aware recursive search
//! ---------------------------------
//! Walks a subtree breadth-first and reports every leaf whose relative name
//! contains the filter substring. A directory the token may not list is
//! skipped as a whole and reported in the outcome rather than failing the
//! search; sibling subtrees are unaffected. Directories within one BFS
//! level are visited concurrently, and the final result order never depends
//! on completion order: results are deduplicated by absolute path and
//! returned lexicographically sorted.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future;
use tracing::debug;

use crate::capability::{Capability, CapabilityGate, Decision};
use crate::error::{NsError, NsResult};
use crate::lister::Lister;
use crate::path::SecretPath;

/// Matching leaves plus the subtrees the traversal could not enter.
/// `skipped` must reach the operator; partial coverage is not an error but
/// it is never silent either.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub results: Vec<SecretPath>,
    pub skipped: Vec<SecretPath>,
}

pub struct SearchEngine {
    gate: Arc<CapabilityGate>,
    lister: Lister,
}

enum Visit {
    Denied,
    Listed(Vec<String>),
    Failed(NsError),
}

impl SearchEngine {
    pub fn new(gate: Arc<CapabilityGate>, lister: Lister) -> Self {
        Self { gate, lister }
    }

    /// Find every leaf under `root` whose relative name contains `filter`.
    /// An empty filter matches everything reachable. Each call performs a
    /// fresh traversal; nothing is cached between searches.
    pub async fn search(&self, root: &SecretPath, filter: &str) -> NsResult<SearchOutcome> {
        if !root.is_directory() {
            return Err(NsError::invalid_path(root.as_str().to_string()));
        }
        let mut frontier: Vec<SecretPath> = vec![root.clone()];
        let mut results: BTreeSet<SecretPath> = BTreeSet::new();
        let mut skipped: Vec<SecretPath> = Vec::new();

        while !frontier.is_empty() {
            let visits = frontier.drain(..).map(|dir| {
                let gate = self.gate.clone();
                let lister = self.lister.clone();
                async move {
                    match gate.check(&dir, &[Capability::List]).await {
                        Decision::Denied => (dir, Visit::Denied),
                        Decision::Allowed => match lister.list(&dir).await {
                            Ok(listing) => (dir, Visit::Listed(listing.names)),
                            Err(e) => (dir, Visit::Failed(e)),
                        },
                    }
                }
            });
            let mut next: Vec<SecretPath> = Vec::new();
            for (dir, visit) in future::join_all(visits).await {
                match visit {
                    Visit::Denied => {
                        debug!(target: "vaultns::search", "skipping denied subtree '{}'", dir);
                        skipped.push(dir);
                    }
                    Visit::Failed(e) => return Err(e),
                    Visit::Listed(names) => {
                        for name in names {
                            let child = dir.join(&name)?;
                            if child.is_directory() {
                                // directories are traversed, never reported
                                next.push(child);
                            } else if name.contains(filter) {
                                results.insert(child);
                            }
                        }
                    }
                }
            }
            frontier = next;
        }

        Ok(SearchOutcome { results: results.into_iter().collect(), skipped })
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
