//! Example consumer: a separate Rust project that uses appcatalog-sdk as a dependency.
//!
//! Saves a compute resource, reads it back, removes it and checks it is gone. Runs against
//! PostgreSQL when `DATABASE_URL` is set, otherwise against the in-memory store.
//!
//! Run from repo root: `cargo run -p example-consumer`

use appcatalog_sdk::{
    apply_catalog_schema, ensure_database_exists, CrudGateway, EntityKind, Identifier, MemoryStore, PgStore,
    ResourceRecord, Settings, Store,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("appcatalog_sdk=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let catalog = Arc::new(settings.load_catalog().await?);

    if std::env::var("DATABASE_URL").is_ok() {
        ensure_database_exists(&settings.database_url).await?;
        let store = PgStore::connect(&settings.database_url, settings.max_connections).await?;
        apply_catalog_schema(store.pool(), &catalog).await?;
        let gateway = CrudGateway::new(store, catalog).with_statement_timeout(settings.statement_timeout);
        round_trip(&gateway).await
    } else {
        tracing::info!("DATABASE_URL not set, using the in-memory store");
        let gateway = CrudGateway::new(MemoryStore::new(), catalog);
        round_trip(&gateway).await
    }
}

async fn round_trip<S: Store>(gateway: &CrudGateway<S>) -> Result<(), Box<dyn std::error::Error>> {
    let host = ResourceRecord::new(EntityKind::ComputeResource)
        .with("resourceID", "host-1")
        .with("hostName", "cluster.example.edu")
        .with("description", "test")
        .with("preferredJobSubmissionProtocol", "SSH");
    gateway.save(EntityKind::ComputeResource, &host).await?;

    let id = Identifier::scalar("host-1");
    let stored = gateway.get_one(EntityKind::ComputeResource, &id).await?;
    tracing::info!(host_name = ?stored.get_str("hostName"), "read back");

    gateway.remove(EntityKind::ComputeResource, &id).await?;
    let still_there = gateway.exists(EntityKind::ComputeResource, &id).await?;
    tracing::info!(still_there, "removed");
    if still_there {
        return Err("host-1 still present after remove".into());
    }
    Ok(())
}
