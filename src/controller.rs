//! Namespace controller
//! --------------------
//! Owns the current view of the namespace and orchestrates the other
//! components in response to navigation and CRUD intents from a
//! presentation layer. The controller is the only holder of mutable view
//! state; everything else in the crate is stateless apart from the
//! capability cache it invalidates on navigation.
//!
//! View state machine:
//! `Listing(path)` -(select leaf)-> `Viewing(path)` -(edit)->
//! `Editing(path, draft)` -(submit)-> `Committing(path)` -> back to
//! `Viewing` on success or `Editing` (draft preserved) on failure.
//! `Listing` is reachable from any state via navigation; the initial state
//! is `Listing(root)`; there is no terminal state.
//!
//! Stale-response suppression: every navigation bumps a generation counter
//! and every backend round-trip carries the generation it was issued under.
//! A response is applied only while its generation is still current, so a
//! slow reply for an abandoned path can never clobber the view the user is
//! actually looking at. Errors are delivered as values on `ViewState`; the
//! core never talks to a notification mechanism.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::backend::{LeafEntry, SecretBackend};
use crate::capability::{Capability, CapabilityGate, Decision};
use crate::entry::EntryStore;
use crate::error::{NsError, NsResult};
use crate::lister::{Lister, Listing};
use crate::mover::{MoveIntent, MoveOperation};
use crate::path::SecretPath;
use crate::search::{SearchEngine, SearchOutcome};

/// Where the view currently is.
// serde_json values are PartialEq only, so no Eq here.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Listing { path: SecretPath },
    Viewing { path: SecretPath, content: LeafEntry },
    Editing { path: SecretPath, draft: LeafEntry },
    Committing { path: SecretPath },
}

impl Phase {
    pub fn path(&self) -> &SecretPath {
        match self {
            Phase::Listing { path }
            | Phase::Committing { path }
            | Phase::Viewing { path, .. }
            | Phase::Editing { path, .. } => path,
        }
    }
}

/// Snapshot of the controller's state, cloned out for the presentation
/// layer on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    /// Children of the most recently listed directory.
    pub listing: Option<Listing>,
    /// Results of the most recent search, if a filter is active.
    pub search: Option<SearchOutcome>,
    /// Whether the token may create entries under the current directory;
    /// drives the enabled state of a "new entry" affordance.
    pub can_create: bool,
    pub last_error: Option<NsError>,
}

pub struct NamespaceController {
    gate: Arc<CapabilityGate>,
    lister: Lister,
    entries: EntryStore,
    search: SearchEngine,
    mover: MoveOperation,
    state: RwLock<ViewState>,
    /// Bumped on every navigation; in-flight responses carry the value they
    /// were issued under and are discarded on mismatch.
    generation: AtomicU64,
    /// Distinguishes overlapping searches within one navigation context.
    search_seq: AtomicU64,
}

impl NamespaceController {
    pub fn new(backend: Arc<dyn SecretBackend>, root: SecretPath) -> NsResult<Self> {
        if !root.is_directory() {
            return Err(NsError::invalid_path(root.as_str().to_string()));
        }
        let gate = Arc::new(CapabilityGate::new(backend.clone()));
        let lister = Lister::new(backend.clone());
        Ok(Self {
            gate: gate.clone(),
            lister: lister.clone(),
            entries: EntryStore::new(backend.clone(), gate.clone()),
            search: SearchEngine::new(gate.clone(), lister),
            mover: MoveOperation::new(EntryStore::new(backend, gate)),
            state: RwLock::new(ViewState {
                phase: Phase::Listing { path: root },
                listing: None,
                search: None,
                can_create: false,
                last_error: None,
            }),
            generation: AtomicU64::new(0),
            search_seq: AtomicU64::new(0),
        })
    }

    /// Current view, cloned.
    pub fn view(&self) -> ViewState {
        self.state.read().clone()
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new navigation context: later responses from the previous
    /// one must not apply, and cached capability grants must not carry
    /// over.
    fn bump_generation(&self) -> u64 {
        self.gate.invalidate();
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a state mutation only if `gen` is still the current
    /// navigation context. Returns whether it applied.
    fn apply_if_current<F: FnOnce(&mut ViewState)>(&self, gen: u64, f: F) -> bool {
        let mut st = self.state.write();
        if self.generation.load(Ordering::SeqCst) != gen {
            debug!(target: "vaultns::controller", "discarding stale response issued under generation {}", gen);
            return false;
        }
        f(&mut st);
        true
    }

    fn fail(&self, gen: u64, err: NsError) -> NsError {
        self.apply_if_current(gen, |st| st.last_error = Some(err.clone()));
        err
    }

    /// Navigate to a path: a directory opens as a listing, a leaf opens as
    /// a view of its content.
    pub async fn open(&self, raw: &str) -> NsResult<()> {
        let path = SecretPath::parse(raw);
        let gen = self.bump_generation();
        if path.is_directory() {
            if self.gate.check(&path, &[Capability::List]).await == Decision::Denied {
                return Err(self.fail(gen, NsError::permission_denied(path.as_str().to_string())));
            }
            let listing = match self.lister.list(&path).await {
                Ok(listing) => listing,
                Err(e) => return Err(self.fail(gen, e)),
            };
            // Probe whether a create would be allowed here so the UI can
            // disable its affordance up front. Reuses the cached grant.
            let can_create =
                self.gate.check(&path, &[Capability::Create]).await == Decision::Allowed;
            self.apply_if_current(gen, |st| {
                st.phase = Phase::Listing { path: path.clone() };
                st.listing = Some(listing.clone());
                st.search = None;
                st.can_create = can_create;
                st.last_error = None;
            });
            Ok(())
        } else {
            let content = match self.entries.read(&path).await {
                Ok(content) => content,
                Err(e) => return Err(self.fail(gen, e)),
            };
            self.apply_if_current(gen, |st| {
                st.phase = Phase::Viewing { path: path.clone(), content: content.clone() };
                st.last_error = None;
            });
            Ok(())
        }
    }

    /// Navigate to the parent directory of wherever the view currently is.
    pub async fn back(&self) -> NsResult<()> {
        let parent = self.state.read().phase.path().parent_dir();
        self.open(parent.as_str()).await
    }

    /// Move from `Viewing` into `Editing`, seeding the draft with the
    /// current content. No-op in any other phase.
    pub fn begin_edit(&self) -> bool {
        let mut st = self.state.write();
        if let Phase::Viewing { path, content } = &st.phase {
            st.phase = Phase::Editing { path: path.clone(), draft: content.clone() };
            true
        } else {
            false
        }
    }

    /// Create a new leaf named `name` under the current directory.
    ///
    /// The name is rejected client-side, before any backend write, when it
    /// already appears in the last fetched listing. This check is
    /// optimistic: a concurrent writer may still race it, and that race is
    /// an accepted property of the non-transactional store.
    pub async fn create_entry(&self, name: &str, content: LeafEntry) -> NsResult<()> {
        let (dir, gen, duplicate) = {
            let st = self.state.read();
            let Phase::Listing { path } = &st.phase else {
                return Err(NsError::invalid_path(st.phase.path().as_str().to_string()));
            };
            let duplicate = st.listing.as_ref().map(|l| l.contains(name)).unwrap_or(false);
            (path.clone(), self.current_generation(), duplicate)
        };
        let full = dir.join(name)?;
        if full.is_directory() {
            return Err(self.fail(gen, NsError::invalid_path(full.as_str().to_string())));
        }
        if duplicate {
            return Err(self.fail(gen, NsError::duplicate_entry(full.as_str().to_string())));
        }
        if let Err(e) = self.entries.write(&full, content, true).await {
            return Err(self.fail(gen, e));
        }
        info!(target: "vaultns::controller", "created '{}'", full);
        self.refresh_listing(&dir, gen).await
    }

    /// Submit an edited draft for the leaf currently being edited.
    pub async fn update_entry(&self, content: LeafEntry) -> NsResult<()> {
        let (path, gen) = {
            let mut st = self.state.write();
            let Phase::Editing { path, .. } = &st.phase else {
                return Err(NsError::invalid_path(st.phase.path().as_str().to_string()));
            };
            let path = path.clone();
            st.phase = Phase::Committing { path: path.clone() };
            (path, self.current_generation())
        };
        match self.entries.write(&path, content.clone(), false).await {
            Ok(()) => {
                info!(target: "vaultns::controller", "updated '{}'", path);
                self.apply_if_current(gen, |st| {
                    if matches!(st.phase, Phase::Committing { .. }) {
                        st.phase = Phase::Viewing { path: path.clone(), content: content.clone() };
                        st.last_error = None;
                    }
                });
                Ok(())
            }
            Err(e) => {
                // The draft survives the failure so the operator's edits
                // are not lost.
                self.apply_if_current(gen, |st| {
                    if matches!(st.phase, Phase::Committing { .. }) {
                        st.phase = Phase::Editing { path: path.clone(), draft: content.clone() };
                    }
                    st.last_error = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    /// Delete the leaf named `name` under the current directory and
    /// refresh the listing.
    pub async fn delete_entry(&self, name: &str) -> NsResult<()> {
        let (dir, gen) = {
            let st = self.state.read();
            let Phase::Listing { path } = &st.phase else {
                return Err(NsError::invalid_path(st.phase.path().as_str().to_string()));
            };
            (path.clone(), self.current_generation())
        };
        let leaf = dir.join(name)?;
        if leaf.is_directory() {
            return Err(self.fail(gen, NsError::invalid_path(leaf.as_str().to_string())));
        }
        if let Err(e) = self.entries.delete(&leaf).await {
            return Err(self.fail(gen, e));
        }
        info!(target: "vaultns::controller", "deleted '{}'", leaf);
        self.refresh_listing(&dir, gen).await
    }

    /// Move the currently viewed leaf to `destination`, then navigate to
    /// the destination's directory. A partial failure (destination written,
    /// source delete failed) surfaces as `MovePartial` and is never
    /// downgraded.
    pub async fn move_entry(&self, destination: &str) -> NsResult<()> {
        let (source, gen) = {
            let st = self.state.read();
            let path = match &st.phase {
                Phase::Viewing { path, .. } | Phase::Editing { path, .. } => path.clone(),
                other => {
                    return Err(NsError::invalid_path(other.path().as_str().to_string()));
                }
            };
            (path, self.current_generation())
        };
        let dest = SecretPath::parse(destination);
        if dest.is_directory() {
            return Err(self.fail(gen, NsError::invalid_path(dest.as_str().to_string())));
        }
        let intent = MoveIntent { source, destination: dest.clone() };
        match self.mover.execute(&intent).await.into_result() {
            Ok(()) => self.open(dest.parent_dir().as_str()).await,
            Err(e) => Err(self.fail(gen, e)),
        }
    }

    /// Run a recursive search for `filter` under `scope_root` (default: the
    /// current directory) and publish the outcome on the view. An empty
    /// filter with no explicit scope clears the active search instead.
    pub async fn set_filter(&self, filter: &str, scope_root: Option<&str>) -> NsResult<()> {
        let gen = self.current_generation();
        let seq = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        if filter.is_empty() && scope_root.is_none() {
            self.apply_if_current(gen, |st| st.search = None);
            return Ok(());
        }
        let root = match scope_root {
            Some(raw) => SecretPath::parse(raw),
            None => {
                let st = self.state.read();
                let p = st.phase.path();
                if p.is_directory() { p.clone() } else { p.parent_dir() }
            }
        };
        match self.search.search(&root, filter).await {
            Ok(outcome) => {
                let mut st = self.state.write();
                if self.generation.load(Ordering::SeqCst) == gen
                    && self.search_seq.load(Ordering::SeqCst) == seq
                {
                    st.search = Some(outcome);
                    st.last_error = None;
                } else {
                    debug!(target: "vaultns::controller", "discarding superseded search results");
                }
                Ok(())
            }
            Err(e) => Err(self.fail(gen, e)),
        }
    }

    async fn refresh_listing(&self, dir: &SecretPath, gen: u64) -> NsResult<()> {
        let listing = self.lister.list(dir).await?;
        self.apply_if_current(gen, |st| {
            st.listing = Some(listing.clone());
            st.last_error = None;
        });
        Ok(())
    }
}
