//! Controller integration tests: the view state machine, capability
//! gating at the facade, and stale-response suppression.

use std::sync::Arc;
use std::time::Duration;

use vaultns::backend::Verb;
use vaultns::{
    CapabilitySet, LeafEntry, MemoryBackend, NamespaceController, NsError, Phase, SecretBackend,
    SecretPath,
};

fn controller(backend: &Arc<MemoryBackend>) -> NamespaceController {
    NamespaceController::new(backend.clone(), SecretPath::root()).unwrap()
}

fn content(v: &str) -> LeafEntry {
    let mut m = LeafEntry::new();
    m.insert("value".into(), serde_json::Value::String(v.into()));
    m
}

#[tokio::test]
async fn initial_state_is_listing_at_root() {
    let backend = Arc::new(MemoryBackend::new());
    let ctl = controller(&backend);
    let view = ctl.view();
    assert_eq!(view.phase, Phase::Listing { path: SecretPath::root() });
    assert!(view.listing.is_none());
    assert!(view.last_error.is_none());
}

#[tokio::test]
async fn opening_a_directory_loads_its_listing() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/x", "1");
    backend.put_value("secret/y/z", "2");
    let ctl = controller(&backend);
    ctl.open("secret/").await.unwrap();
    let view = ctl.view();
    assert_eq!(view.phase, Phase::Listing { path: SecretPath::parse("secret/") });
    assert_eq!(view.listing.unwrap().names, vec!["x".to_string(), "y/".to_string()]);
    assert!(view.can_create);
}

#[tokio::test]
async fn opening_an_empty_directory_is_not_an_error() {
    let backend = Arc::new(MemoryBackend::new());
    let ctl = controller(&backend);
    ctl.open("nothing/here/").await.unwrap();
    let view = ctl.view();
    assert!(view.listing.unwrap().is_empty());
    assert!(view.last_error.is_none());
}

#[tokio::test]
async fn opening_a_locked_directory_is_denied_without_a_list_call() {
    // Scenario: CAPABILITIES("secret/locked/") -> {}; open must fail with
    // PermissionDenied and never issue a LIST.
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/locked/a", "1");
    backend.grant("secret/locked/", CapabilitySet::empty());
    let ctl = controller(&backend);
    let res = ctl.open("secret/locked/").await;
    assert!(matches!(res, Err(NsError::PermissionDenied { .. })));
    assert_eq!(backend.call_count(Verb::List, Some("secret/locked/")), 0);
    let view = ctl.view();
    assert!(matches!(view.last_error, Some(NsError::PermissionDenied { .. })));
}

#[tokio::test]
async fn opening_a_leaf_views_its_content() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a", "payload");
    let ctl = controller(&backend);
    ctl.open("secret/a").await.unwrap();
    match ctl.view().phase {
        Phase::Viewing { path, content } => {
            assert_eq!(path.as_str(), "secret/a");
            assert_eq!(content, self::content("payload"));
        }
        p => panic!("expected Viewing, got {:?}", p),
    }
}

#[tokio::test]
async fn can_create_reflects_the_create_grant() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a", "1");
    backend.grant(
        "secret/",
        CapabilitySet::empty()
            .with(vaultns::Capability::List)
            .with(vaultns::Capability::Read),
    );
    let ctl = controller(&backend);
    ctl.open("secret/").await.unwrap();
    assert!(!ctl.view().can_create);
    // and the probe reused the cached capability query
    assert_eq!(backend.call_count(Verb::Capabilities, Some("secret/")), 1);
}

#[tokio::test]
async fn back_walks_up_to_the_parent_directory() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/y/z", "1");
    let ctl = controller(&backend);
    ctl.open("secret/y/z").await.unwrap();
    ctl.back().await.unwrap();
    assert_eq!(ctl.view().phase, Phase::Listing { path: SecretPath::parse("secret/y/") });
    ctl.back().await.unwrap();
    assert_eq!(ctl.view().phase, Phase::Listing { path: SecretPath::parse("secret/") });
}

#[tokio::test]
async fn create_entry_writes_and_refreshes_the_listing() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/existing", "1");
    let ctl = controller(&backend);
    ctl.open("secret/").await.unwrap();
    ctl.create_entry("fresh", content("v")).await.unwrap();
    assert!(backend.contains("secret/fresh"));
    let listing = ctl.view().listing.unwrap();
    assert!(listing.contains("fresh"));
    assert!(listing.contains("existing"));
}

#[tokio::test]
async fn duplicate_create_is_rejected_before_any_write() {
    // Scenario: "new" already appears in the last fetched listing of
    // "secret/a/"; the create must fail client-side with no WRITE issued.
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a/new", "1");
    let ctl = controller(&backend);
    ctl.open("secret/a/").await.unwrap();
    let res = ctl.create_entry("new", content("v")).await;
    match res {
        Err(NsError::DuplicateEntry { path }) => assert_eq!(path, "secret/a/new"),
        r => panic!("expected DuplicateEntry, got {:?}", r),
    }
    assert_eq!(backend.call_count(Verb::Write, None), 0);
}

#[tokio::test]
async fn edit_commit_returns_to_viewing() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a", "old");
    let ctl = controller(&backend);
    ctl.open("secret/a").await.unwrap();
    assert!(ctl.begin_edit());
    ctl.update_entry(content("new")).await.unwrap();
    match ctl.view().phase {
        Phase::Viewing { path, content } => {
            assert_eq!(path.as_str(), "secret/a");
            assert_eq!(content, self::content("new"));
        }
        p => panic!("expected Viewing, got {:?}", p),
    }
    assert_eq!(backend.read("secret/a").await.unwrap(), content("new"));
}

#[tokio::test]
async fn failed_commit_preserves_the_draft() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a", "old");
    let ctl = controller(&backend);
    ctl.open("secret/a").await.unwrap();
    assert!(ctl.begin_edit());
    backend.fail_once(Verb::Write, "transport down");
    let res = ctl.update_entry(content("new")).await;
    assert!(matches!(res, Err(NsError::Backend { .. })));
    let view = ctl.view();
    match view.phase {
        Phase::Editing { path, draft } => {
            assert_eq!(path.as_str(), "secret/a");
            assert_eq!(draft, content("new"));
        }
        p => panic!("expected Editing, got {:?}", p),
    }
    assert!(matches!(view.last_error, Some(NsError::Backend { .. })));
    // backend still holds the old content
    assert_eq!(backend.read("secret/a").await.unwrap(), content("old"));
}

#[tokio::test]
async fn begin_edit_outside_viewing_is_a_no_op() {
    let backend = Arc::new(MemoryBackend::new());
    let ctl = controller(&backend);
    ctl.open("secret/").await.unwrap();
    assert!(!ctl.begin_edit());
    assert!(matches!(ctl.view().phase, Phase::Listing { .. }));
}

#[tokio::test]
async fn delete_entry_removes_and_refreshes() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a", "1");
    backend.put_value("secret/b", "2");
    let ctl = controller(&backend);
    ctl.open("secret/").await.unwrap();
    ctl.delete_entry("a").await.unwrap();
    assert!(!backend.contains("secret/a"));
    let listing = ctl.view().listing.unwrap();
    assert_eq!(listing.names, vec!["b".to_string()]);
}

#[tokio::test]
async fn move_entry_navigates_to_the_destination_directory() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a", "payload");
    let ctl = controller(&backend);
    ctl.open("secret/a").await.unwrap();
    ctl.move_entry("archive/a").await.unwrap();
    assert!(!backend.contains("secret/a"));
    assert!(backend.contains("archive/a"));
    assert_eq!(ctl.view().phase, Phase::Listing { path: SecretPath::parse("archive/") });
}

#[tokio::test]
async fn partial_move_failure_surfaces_as_move_partial() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/a", "payload");
    let ctl = controller(&backend);
    ctl.open("secret/a").await.unwrap();
    backend.fail_once(Verb::Delete, "disk full");
    let res = ctl.move_entry("secret/b").await;
    match &res {
        Err(NsError::MovePartial { source, destination, .. }) => {
            assert_eq!(source, "secret/a");
            assert_eq!(destination, "secret/b");
        }
        r => panic!("expected MovePartial, got {:?}", r),
    }
    // both paths hold the content until the operator intervenes
    assert!(backend.contains("secret/a"));
    assert!(backend.contains("secret/b"));
    assert!(matches!(ctl.view().last_error, Some(NsError::MovePartial { .. })));
}

#[tokio::test]
async fn set_filter_publishes_search_results() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/x", "1");
    backend.put_value("secret/y/z", "2");
    let ctl = controller(&backend);
    ctl.open("secret/").await.unwrap();
    ctl.set_filter("z", None).await.unwrap();
    let search = ctl.view().search.unwrap();
    let results: Vec<&str> = search.results.iter().map(|p| p.as_str()).collect();
    assert_eq!(results, vec!["secret/y/z"]);
    // clearing the filter drops the search view
    ctl.set_filter("", None).await.unwrap();
    assert!(ctl.view().search.is_none());
}

#[tokio::test]
async fn stale_listing_response_is_discarded() {
    // Scenario: a LIST for P1 is still in flight when the user navigates
    // to P2; when the P1 response finally arrives it must not clobber the
    // P2 view.
    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("p1/a", "1");
    backend.put_value("p2/b", "2");
    let release = backend.hold_list("p1/");

    let ctl = Arc::new(controller(&backend));
    let slow = {
        let ctl = ctl.clone();
        tokio::spawn(async move { ctl.open("p1/").await })
    };

    // wait until the P1 navigation has passed its capability check and is
    // parked inside the backend list call
    for _ in 0..200 {
        if backend.call_count(Verb::Capabilities, Some("p1/")) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert!(backend.call_count(Verb::Capabilities, Some("p1/")) > 0);

    ctl.open("p2/").await.unwrap();
    release.notify_one();
    slow.await.unwrap().unwrap();

    let view = ctl.view();
    assert_eq!(view.phase, Phase::Listing { path: SecretPath::parse("p2/") });
    assert_eq!(view.listing.unwrap().names, vec!["b".to_string()]);
}
