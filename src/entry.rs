//! Leaf CRUD against the backend
//! -----------------------------
//! Read, write and delete a single leaf, each gated on the capability it
//! requires. The wire protocol has one create-or-overwrite write verb; the
//! create/update distinction exists only client-side, in which capability
//! is demanded. The duplicate-name guard for creates lives with the caller
//! (it owns the last fetched listing of the parent directory) and is
//! optimistic: a true race with another writer can still overwrite, which
//! is an accepted limitation of the non-transactional store.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{BackendError, LeafEntry, SecretBackend};
use crate::capability::{Capability, CapabilityGate, Decision};
use crate::error::{NsError, NsResult};
use crate::path::SecretPath;

pub struct EntryStore {
    backend: Arc<dyn SecretBackend>,
    gate: Arc<CapabilityGate>,
}

impl EntryStore {
    pub fn new(backend: Arc<dyn SecretBackend>, gate: Arc<CapabilityGate>) -> Self {
        Self { backend, gate }
    }

    fn require_leaf(path: &SecretPath) -> NsResult<()> {
        if path.is_directory() {
            return Err(NsError::invalid_path(path.as_str().to_string()));
        }
        Ok(())
    }

    async fn authorize(&self, path: &SecretPath, cap: Capability) -> NsResult<()> {
        match self.gate.check(path, &[cap]).await {
            Decision::Allowed => Ok(()),
            Decision::Denied => Err(NsError::permission_denied(path.as_str().to_string())),
        }
    }

    /// Read the content of a leaf. A missing leaf is `NotFound`: a direct
    /// read of an absent secret is an error, not an empty success.
    pub async fn read(&self, path: &SecretPath) -> NsResult<LeafEntry> {
        Self::require_leaf(path)?;
        self.authorize(path, Capability::Read).await?;
        match self.backend.read(path.as_str()).await {
            Ok(content) => Ok(content),
            Err(BackendError::NotFound) => Err(NsError::not_found(path.as_str().to_string())),
            Err(e) => Err(NsError::backend(path.as_str().to_string(), e.to_string())),
        }
    }

    /// Write a leaf. `is_create` selects which capability is demanded; the
    /// backend call is the same either way.
    pub async fn write(&self, path: &SecretPath, content: LeafEntry, is_create: bool) -> NsResult<()> {
        Self::require_leaf(path)?;
        let cap = if is_create { Capability::Create } else { Capability::Update };
        self.authorize(path, cap).await?;
        debug!(target: "vaultns::entry", "write '{}' (create={})", path, is_create);
        self.backend
            .write(path.as_str(), content)
            .await
            .map_err(|e| NsError::backend(path.as_str().to_string(), e.to_string()))
    }

    /// Delete a leaf. Deleting an already-absent leaf succeeds; the store's
    /// delete is idempotent and we keep that semantics.
    pub async fn delete(&self, path: &SecretPath) -> NsResult<()> {
        Self::require_leaf(path)?;
        self.authorize(path, Capability::Delete).await?;
        debug!(target: "vaultns::entry", "delete '{}'", path);
        match self.backend.delete(path.as_str()).await {
            Ok(()) | Err(BackendError::NotFound) => Ok(()),
            Err(e) => Err(NsError::backend(path.as_str().to_string(), e.to_string())),
        }
    }
}
