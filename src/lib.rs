//!
//! vaultns: hierarchical namespace core for path-addressed secret stores
//! ---------------------------------------------------------------------
//! A flat key/value secret store becomes a navigable tree by convention: a
//! trailing `/` on a path marks a directory, its absence marks a leaf that
//! holds content. This crate implements the logic that interprets that
//! convention and drives it against an asynchronous backend:
//!
//! - `path`: pure path algebra (classify, normalize, join, relativize)
//! - `capability`: per-path capability queries with a navigation-scoped cache
//! - `lister`: immediate-children listing with not-found-as-empty semantics
//! - `search`: capability-aware recursive search across a subtree
//! - `entry`: leaf CRUD with client-side create/update distinction
//! - `mover`: move/rename as copy-then-delete with explicit partial failure
//! - `controller`: the view state machine and facade consumed by a UI layer
//!
//! The secret store itself is external; it is consumed through the
//! `SecretBackend` trait. An in-memory implementation is provided for tests
//! and demos.

pub mod backend;
pub mod capability;
pub mod controller;
pub mod entry;
pub mod error;
pub mod lister;
pub mod mover;
pub mod path;
pub mod search;

pub use backend::{BackendError, LeafEntry, MemoryBackend, SecretBackend};
pub use capability::{Capability, CapabilityGate, CapabilitySet, Decision};
pub use controller::{NamespaceController, Phase, ViewState};
pub use entry::EntryStore;
pub use error::{NsError, NsResult, Severity};
pub use lister::{Lister, Listing};
pub use mover::{MoveIntent, MoveOperation, MoveOutcome, MoveStep};
pub use path::SecretPath;
pub use search::{SearchEngine, SearchOutcome};
