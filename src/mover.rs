//! Move/rename as copy-then-delete
//! -------------------------------
//! The store has no rename primitive, so a move is three sequenced calls:
//! read the source, write the destination as a create, delete the source.
//! This is not atomic and the outcome type refuses to pretend otherwise:
//! a delete failure after a successful write leaves the content at both
//! paths, and that state is reported distinctly so it cannot be mistaken
//! for a clean failure. No rollback is attempted; exposing the
//! inconsistency beats a best-effort cleanup that could itself fail.
//!
//! The destination's create capability is not pre-flighted; the write leg's
//! own check is what authorizes it.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::entry::EntryStore;
use crate::error::NsError;
use crate::path::SecretPath;

/// Source and destination of one move. Ephemeral: lives only for the
/// duration of the operation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub source: SecretPath,
    pub destination: SecretPath,
}

/// Which non-destructive leg failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStep {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// All three legs completed: source gone, destination holds the content.
    Success,
    /// Write succeeded, delete failed: the content exists at both paths.
    PartialFailure {
        source: SecretPath,
        destination: SecretPath,
        cause: NsError,
    },
    /// Failure before anything destructive happened; the source is intact
    /// and the destination was never written.
    Failed { step: MoveStep, cause: NsError },
}

impl MoveOutcome {
    /// Collapse into a result for callers that only carry errors forward.
    /// The partial-failure case keeps its own variant so it is never
    /// downgraded to a generic backend error.
    pub fn into_result(self) -> Result<(), NsError> {
        match self {
            MoveOutcome::Success => Ok(()),
            MoveOutcome::Failed { cause, .. } => Err(cause),
            MoveOutcome::PartialFailure { source, destination, cause } => {
                Err(NsError::MovePartial {
                    source: source.as_str().to_string(),
                    destination: destination.as_str().to_string(),
                    message: cause.to_string(),
                })
            }
        }
    }
}

pub struct MoveOperation {
    entries: EntryStore,
}

impl MoveOperation {
    pub fn new(entries: EntryStore) -> Self {
        Self { entries }
    }

    /// Execute the move, each leg strictly after the previous one
    /// succeeded.
    pub async fn execute(&self, intent: &MoveIntent) -> MoveOutcome {
        let content = match self.entries.read(&intent.source).await {
            Ok(content) => content,
            Err(cause) => return MoveOutcome::Failed { step: MoveStep::Read, cause },
        };
        if let Err(cause) = self.entries.write(&intent.destination, content, true).await {
            return MoveOutcome::Failed { step: MoveStep::Write, cause };
        }
        match self.entries.delete(&intent.source).await {
            Ok(()) => {
                info!(target: "vaultns::mover", "moved '{}' -> '{}'", intent.source, intent.destination);
                MoveOutcome::Success
            }
            Err(cause) => {
                // Loud on purpose: the content is now duplicated and only
                // the operator can resolve it.
                error!(
                    target: "vaultns::mover",
                    "delete of '{}' failed after writing '{}'; content exists at both paths: {}",
                    intent.source, intent.destination, cause
                );
                MoveOutcome::PartialFailure {
                    source: intent.source.clone(),
                    destination: intent.destination.clone(),
                    cause,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::{MemoryBackend, Verb};
    use crate::capability::{CapabilityGate, CapabilitySet};
    use crate::error::Severity;

    fn mover(backend: Arc<MemoryBackend>) -> MoveOperation {
        let gate = Arc::new(CapabilityGate::new(backend.clone()));
        MoveOperation::new(EntryStore::new(backend, gate))
    }

    fn intent(source: &str, destination: &str) -> MoveIntent {
        MoveIntent {
            source: SecretPath::parse(source),
            destination: SecretPath::parse(destination),
        }
    }

    #[tokio::test]
    async fn successful_move_relocates_content() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_value("secret/a", "payload");
        let outcome = mover(backend.clone()).execute(&intent("secret/a", "secret/b")).await;
        assert_eq!(outcome, MoveOutcome::Success);
        assert!(!backend.contains("secret/a"));
        assert!(backend.contains("secret/b"));
        // the legs ran strictly in read, write, delete order
        let verbs: Vec<Verb> = backend
            .calls()
            .into_iter()
            .map(|c| c.verb)
            .filter(|v| *v != Verb::Capabilities)
            .collect();
        assert_eq!(verbs, vec![Verb::Read, Verb::Write, Verb::Delete]);
    }

    #[tokio::test]
    async fn delete_failure_after_write_is_partial_and_both_paths_remain() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_value("secret/a", "payload");
        backend.fail_once(Verb::Delete, "disk full");
        let outcome = mover(backend.clone()).execute(&intent("secret/a", "secret/b")).await;
        match &outcome {
            MoveOutcome::PartialFailure { source, destination, .. } => {
                assert_eq!(source.as_str(), "secret/a");
                assert_eq!(destination.as_str(), "secret/b");
            }
            o => panic!("expected PartialFailure, got {:?}", o),
        }
        assert!(backend.contains("secret/a"));
        assert!(backend.contains("secret/b"));
        // and the collapsed error keeps its elevated severity
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.severity(), Severity::Critical);
    }

    #[tokio::test]
    async fn read_failure_never_writes_the_destination() {
        let backend = Arc::new(MemoryBackend::new());
        let outcome = mover(backend.clone()).execute(&intent("secret/a", "secret/b")).await;
        assert!(matches!(
            outcome,
            MoveOutcome::Failed { step: MoveStep::Read, cause: NsError::NotFound { .. } }
        ));
        assert_eq!(backend.call_count(Verb::Write, None), 0);
        assert!(!backend.contains("secret/b"));
    }

    #[tokio::test]
    async fn write_failure_leaves_source_untouched() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_value("secret/a", "payload");
        backend.fail_once(Verb::Write, "quota exceeded");
        let outcome = mover(backend.clone()).execute(&intent("secret/a", "secret/b")).await;
        assert!(matches!(outcome, MoveOutcome::Failed { step: MoveStep::Write, .. }));
        assert!(backend.contains("secret/a"));
        assert!(!backend.contains("secret/b"));
        assert_eq!(backend.call_count(Verb::Delete, None), 0);
    }

    #[tokio::test]
    async fn denied_source_read_stops_before_any_call() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put_value("secret/a", "payload");
        backend.grant("secret/a", CapabilitySet::empty());
        let outcome = mover(backend.clone()).execute(&intent("secret/a", "secret/b")).await;
        assert!(matches!(
            outcome,
            MoveOutcome::Failed { step: MoveStep::Read, cause: NsError::PermissionDenied { .. } }
        ));
        assert_eq!(backend.call_count(Verb::Read, None), 0);
        assert_eq!(backend.call_count(Verb::Write, None), 0);
    }
}
