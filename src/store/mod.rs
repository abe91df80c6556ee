//! Storage boundary consumed by the gateway: a store hands out transactions, a transaction
//! runs statements. Two backends: PostgreSQL via sqlx, and an in-process memory store.

use crate::error::CatalogError;
use crate::record::RawEntity;
use crate::sql::Statement;
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, MemoryTransaction, TxStats};
pub use postgres::{ensure_database_exists, PgStore, PgTransaction};

#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: Transaction;

    async fn begin(&self) -> Result<Self::Tx, CatalogError>;

    /// Cheap liveness check for readiness probes.
    async fn ping(&self) -> Result<(), CatalogError>;
}

/// One open unit of work. Dropping it without `commit` or `rollback` must roll it back.
#[async_trait]
pub trait Transaction: Send {
    async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<RawEntity>, CatalogError>;

    /// Rows affected.
    async fn execute(&mut self, stmt: &Statement) -> Result<u64, CatalogError>;

    async fn commit(self) -> Result<(), CatalogError>;

    async fn rollback(self) -> Result<(), CatalogError>;
}
