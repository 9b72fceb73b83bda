//! Capability model and per-path authorization gate
//! ------------------------------------------------
//! Every listing and mutating operation is gated on the current token's
//! capabilities for the target path. The gate issues one `capabilities`
//! query per distinct path and caches the full granted set so subsequent
//! checks on the same path within the same navigation context reuse it. The
//! cache is cleared on navigation; it never outlives the view that produced
//! it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::SecretBackend;
use crate::path::SecretPath;

/// One discrete permission, evaluated per path per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Capability {
    const ALL: [Capability; 5] = [
        Capability::List,
        Capability::Read,
        Capability::Create,
        Capability::Update,
        Capability::Delete,
    ];

    fn bit(self) -> u8 {
        match self {
            Capability::List => 1 << 0,
            Capability::Read => 1 << 1,
            Capability::Create => 1 << 2,
            Capability::Update => 1 << 3,
            Capability::Delete => 1 << 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::List => "list",
            Capability::Read => "read",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Delete => "delete",
        }
    }
}

/// The subset of capabilities granted for one path. Absence of a capability
/// means deny; there is no implicit allow anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub fn empty() -> Self {
        CapabilitySet(0)
    }

    pub fn all() -> Self {
        Capability::ALL.iter().copied().collect()
    }

    pub fn with(mut self, cap: Capability) -> Self {
        self.0 |= cap.bit();
        self
    }

    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_superset(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut set = CapabilitySet::empty();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

/// Outcome of a capability check. A denied check carries no cause: whether
/// the grant was missing or the query failed, the caller treats it the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

/// Gate in front of the authorization query, with a navigation-scoped cache
/// keyed by path.
pub struct CapabilityGate {
    backend: Arc<dyn SecretBackend>,
    cache: RwLock<HashMap<String, CapabilitySet>>,
}

impl CapabilityGate {
    pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
        Self { backend, cache: RwLock::new(HashMap::new()) }
    }

    /// Check that the token holds every capability in `required` for `path`.
    ///
    /// A failing backend query is `Denied`, never `Allowed`; no retry is
    /// attempted. The full granted set from a successful query is cached for
    /// later checks on the same path.
    pub async fn check(&self, path: &SecretPath, required: &[Capability]) -> Decision {
        let cached = self.cache.read().get(path.as_str()).copied();
        let granted = match cached {
            Some(set) => set,
            None => match self.backend.capabilities(path.as_str()).await {
                Ok(set) => {
                    self.cache.write().insert(path.as_str().to_string(), set);
                    set
                }
                Err(e) => {
                    warn!(target: "vaultns::capability", "capability query failed for '{}', denying: {}", path, e);
                    return Decision::Denied;
                }
            },
        };
        if granted.is_superset(required) {
            Decision::Allowed
        } else {
            let missing: Vec<&str> = required
                .iter()
                .filter(|c| !granted.contains(**c))
                .map(|c| c.as_str())
                .collect();
            debug!(target: "vaultns::capability", "denied at '{}': missing {:?}", path, missing);
            Decision::Denied
        }
    }

    /// Drop every cached grant. Called on navigation; the cache must not
    /// survive a path change.
    pub fn invalidate(&self) {
        self.cache.write().clear();
    }
}
