//! Secret-store backend abstraction
//! --------------------------------
//! The namespace core consumes a request/response secret store; it never
//! implements one. `SecretBackend` defines that seam and `MemoryBackend`
//! provides an in-process implementation used by tests and the demo binary.
//!
//! Protocol semantics at this boundary:
//! - `list` returns immediate child names; a child directory keeps its
//!   trailing `/`. An absent key is reported as `NotFound` (the lister maps
//!   it to an empty listing).
//! - `read` of an absent leaf is `NotFound`.
//! - `write` is create-or-overwrite; there is no create/update verb here.
//! - `delete` is idempotent: deleting an absent leaf succeeds.
//! - `capabilities` returns the full granted set for a path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

use crate::capability::CapabilitySet;

/// Content of a single leaf: a mapping from string keys to arbitrary JSON
/// values.
pub type LeafEntry = serde_json::Map<String, serde_json::Value>;

/// Failure reported by the store itself, before the namespace layer applies
/// its own semantics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Other(String),
}

/// Request verbs issued to the store. Also used by `MemoryBackend` for call
/// recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    List,
    Read,
    Write,
    Delete,
    Capabilities,
}

#[async_trait]
pub trait SecretBackend: Send + Sync {
    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError>;
    async fn read(&self, path: &str) -> Result<LeafEntry, BackendError>;
    async fn write(&self, path: &str, content: LeafEntry) -> Result<(), BackendError>;
    async fn delete(&self, path: &str) -> Result<(), BackendError>;
    async fn capabilities(&self, path: &str) -> Result<CapabilitySet, BackendError>;
}

/// A single recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub verb: Verb,
    pub path: String,
}

#[derive(Default)]
struct MemoryState {
    /// Leaf path -> content. BTreeMap keeps children enumeration stable.
    entries: BTreeMap<String, LeafEntry>,
    /// Path-prefix capability grants; longest matching prefix wins.
    grants: Vec<(String, CapabilitySet)>,
    /// Calls issued so far, in order.
    calls: Vec<BackendCall>,
    /// Verb -> error message consumed by the next call of that verb.
    fail_next: HashMap<Verb, String>,
}

/// In-memory secret store for tests and demos.
///
/// Beyond plain storage it supports per-prefix capability grants, call
/// recording (to assert a verb was never issued) and one-shot failure
/// injection (to exercise the move operation's failure windows). `hold_list`
/// parks the next `list` for a path until released, which lets tests create
/// a stale in-flight response deterministically.
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            holds: Mutex::new(HashMap::new()),
        }
    }

    /// Store a leaf directly, bypassing call recording.
    pub fn put(&self, path: &str, content: LeafEntry) {
        self.state.write().entries.insert(path.to_string(), content);
    }

    /// Convenience seeding helper: a leaf with a single "value" key.
    pub fn put_value(&self, path: &str, value: &str) {
        let mut m = LeafEntry::new();
        m.insert("value".to_string(), serde_json::Value::String(value.to_string()));
        self.put(path, m);
    }

    /// Grant a capability set to every path at or under `prefix`. The most
    /// specific (longest) matching grant wins; paths with no matching grant
    /// get the full set.
    pub fn grant(&self, prefix: &str, caps: CapabilitySet) {
        self.state.write().grants.push((prefix.to_string(), caps));
    }

    /// Make the next call of `verb` fail with `message`.
    pub fn fail_once(&self, verb: Verb, message: &str) {
        self.state.write().fail_next.insert(verb, message.to_string());
    }

    /// Park the next `list` for `path` until the returned handle is
    /// notified.
    pub fn hold_list(&self, path: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds.lock().insert(path.to_string(), notify.clone());
        notify
    }

    /// All calls issued so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.read().calls.clone()
    }

    /// Number of recorded calls for a verb, optionally restricted to a path.
    pub fn call_count(&self, verb: Verb, path: Option<&str>) -> usize {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| c.verb == verb && path.map_or(true, |p| c.path == p))
            .count()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.read().entries.contains_key(path)
    }

    /// Record a call and consume any injected failure for the verb.
    fn begin(&self, verb: Verb, path: &str) -> Result<(), BackendError> {
        let mut st = self.state.write();
        st.calls.push(BackendCall { verb, path: path.to_string() });
        if let Some(msg) = st.fail_next.remove(&verb) {
            debug!(target: "vaultns::backend", "injected {:?} failure at '{}': {}", verb, path, msg);
            return Err(BackendError::Other(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretBackend for MemoryBackend {
    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        let hold = self.holds.lock().remove(path);
        if let Some(notify) = hold {
            notify.notified().await;
        }
        self.begin(Verb::List, path)?;
        let st = self.state.read();
        let mut names: Vec<String> = Vec::new();
        for key in st.entries.keys() {
            let Some(rest) = key.strip_prefix(path) else { continue };
            if rest.is_empty() {
                continue;
            }
            let child = match rest.find('/') {
                Some(idx) => rest[..=idx].to_string(),
                None => rest.to_string(),
            };
            if !names.contains(&child) {
                names.push(child);
            }
        }
        if names.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(names)
    }

    async fn read(&self, path: &str) -> Result<LeafEntry, BackendError> {
        self.begin(Verb::Read, path)?;
        self.state
            .read()
            .entries
            .get(path)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn write(&self, path: &str, content: LeafEntry) -> Result<(), BackendError> {
        self.begin(Verb::Write, path)?;
        self.state.write().entries.insert(path.to_string(), content);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        self.begin(Verb::Delete, path)?;
        // Idempotent: removing an absent leaf is not an error.
        self.state.write().entries.remove(path);
        Ok(())
    }

    async fn capabilities(&self, path: &str) -> Result<CapabilitySet, BackendError> {
        self.begin(Verb::Capabilities, path)?;
        let st = self.state.read();
        let mut best: Option<(&str, CapabilitySet)> = None;
        for (prefix, caps) in &st.grants {
            if path.starts_with(prefix.as_str()) {
                match best {
                    Some((b, _)) if b.len() >= prefix.len() => {}
                    _ => best = Some((prefix.as_str(), *caps)),
                }
            }
        }
        Ok(best.map(|(_, caps)| caps).unwrap_or_else(CapabilitySet::all))
    }
}
