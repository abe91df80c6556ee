//! Demo server: loads settings and the catalog, bootstraps the schema, and serves the
//! catalog REST routes over PostgreSQL.
//!
//! Run with: `cargo run --example server`

use appcatalog_sdk::{app, apply_catalog_schema, ensure_database_exists, AppState, CrudGateway, PgStore, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("appcatalog_sdk=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let store = PgStore::connect(&settings.database_url, settings.max_connections).await?;

    let catalog = Arc::new(settings.load_catalog().await?);
    apply_catalog_schema(store.pool(), &catalog).await?;

    let gateway = CrudGateway::new(store, catalog).with_statement_timeout(settings.statement_timeout);
    let router = app(AppState::new(gateway));

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
