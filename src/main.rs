use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use vaultns::{
    CapabilitySet, MemoryBackend, NamespaceController, SecretPath,
};

/// Small walkthrough of the namespace core over the in-memory backend:
/// seed a few secrets, browse, search, create and move, logging the view
/// after each step. Useful for eyeballing log output and as a living usage
/// example; the real consumer is a presentation layer.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let backend = Arc::new(MemoryBackend::new());
    backend.put_value("secret/app/db-password", "hunter2");
    backend.put_value("secret/app/api-token", "t0ken");
    backend.put_value("secret/infra/ssh-key", "ed25519");
    backend.grant("secret/infra/", CapabilitySet::empty());

    let controller = NamespaceController::new(backend.clone(), SecretPath::root())?;

    controller.open("secret/").await?;
    info!(target: "vaultns", "listing at secret/: {:?}", controller.view().listing);

    controller.open("secret/app/").await?;
    info!(target: "vaultns", "listing at secret/app/: {:?}", controller.view().listing);

    controller.set_filter("token", Some("secret/")).await?;
    let view = controller.view();
    if let Some(search) = &view.search {
        info!(
            target: "vaultns",
            "search for 'token': {} result(s), {} subtree(s) skipped",
            search.results.len(),
            search.skipped.len()
        );
    }

    let mut content = vaultns::LeafEntry::new();
    content.insert("value".into(), serde_json::Value::String("s3cret".into()));
    controller.set_filter("", None).await?;
    controller.create_entry("new-credential", content).await?;
    info!(target: "vaultns", "after create: {:?}", controller.view().listing);

    controller.open("secret/app/new-credential").await?;
    controller.move_entry("secret/app/renamed-credential").await?;
    info!(target: "vaultns", "after move: {:?}", controller.view().listing);

    Ok(())
}
