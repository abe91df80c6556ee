//! Router builders.

mod catalog;
mod common;

pub use catalog::catalog_routes;
pub use common::common_routes;

use crate::state::AppState;
use crate::store::Store;
use axum::Router;

/// Common routes at the root and catalog routes under `/api/v1`.
pub fn app<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api/v1", catalog_routes(state))
}
