//! Shared application state for all routes.

use crate::gateway::CrudGateway;
use crate::store::Store;
use std::sync::Arc;

pub struct AppState<S: Store> {
    pub gateway: Arc<CrudGateway<S>>,
}

impl<S: Store> AppState<S> {
    pub fn new(gateway: CrudGateway<S>) -> Self {
        AppState {
            gateway: Arc::new(gateway),
        }
    }
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            gateway: self.gateway.clone(),
        }
    }
}
