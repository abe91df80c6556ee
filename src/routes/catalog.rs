//! Catalog record routes. Scalar-key kinds are addressed by path id, composite-key kinds
//! by one query parameter per key field under `/keys`.

use crate::handlers::catalog::{
    delete, delete_by_key, exists, exists_by_key, ids, list, read, read_by_key, save,
};
use crate::state::AppState;
use crate::store::Store;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Request bodies are single records; anything larger is rejected before parsing.
const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn catalog_routes<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route("/entities/:kind", get(list::<S>).put(save::<S>))
        .route("/entities/:kind/:id", get(read::<S>).delete(delete::<S>))
        .route("/entities/:kind/:id/exists", get(exists::<S>))
        .route("/ids/:kind", get(ids::<S>))
        .route("/keys/:kind", get(read_by_key::<S>).delete(delete_by_key::<S>))
        .route("/keys/:kind/exists", get(exists_by_key::<S>))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
