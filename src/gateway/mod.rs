//! CRUD gateway: the public persistence surface. Every operation runs inside exactly one
//! [`TransactionScope`] and either commits fully or rolls back fully.

mod scope;

pub use scope::{ScopeState, TransactionScope};

use crate::config::{ResolvedCatalog, ResolvedEntity};
use crate::error::CatalogError;
use crate::kind::EntityKind;
use crate::record::{Identifier, RawEntity, ResourceRecord};
use crate::sql::{self, QueryOp};
use crate::store::Store;
use crate::translator::Translator;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct CrudGateway<S: Store> {
    store: S,
    translator: Translator,
    statement_timeout: Option<Duration>,
}

impl<S: Store> CrudGateway<S> {
    pub fn new(store: S, catalog: Arc<ResolvedCatalog>) -> Self {
        CrudGateway {
            store,
            translator: Translator::new(catalog),
            statement_timeout: None,
        }
    }

    /// Deadline applied to each storage call. Expiry fails the operation with a storage error.
    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &ResolvedCatalog {
        self.translator.catalog()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    fn entity(&self, kind: EntityKind) -> Result<&ResolvedEntity, CatalogError> {
        Ok(self.catalog().entity(kind)?)
    }

    async fn scope(&self, operation: &'static str, kind: EntityKind) -> Result<TransactionScope<S::Tx>, CatalogError> {
        TransactionScope::begin(&self.store, operation, kind, self.statement_timeout).await
    }

    /// Delete the record with this natural key. `NotFound` when nothing was deleted.
    pub async fn remove(&self, kind: EntityKind, id: &Identifier) -> Result<(), CatalogError> {
        let entity = self.entity(kind)?;
        let mut scope = self.scope("remove", kind).await?;
        let outcome: Result<(), CatalogError> = async {
            let stmt = sql::delete_by_key(entity, id)?;
            let affected = scope.execute(&stmt).await?;
            if affected == 0 {
                return Err(not_found(kind, id));
            }
            tracing::debug!(%kind, %id, affected, "removed");
            Ok(())
        }
        .await;
        scope.finish(outcome).await
    }

    /// Strict single lookup: zero rows is `NotFound`, more than one is `AmbiguousResult`.
    pub async fn get_one(&self, kind: EntityKind, id: &Identifier) -> Result<ResourceRecord, CatalogError> {
        let entity = self.entity(kind)?;
        let mut scope = self.scope("get_one", kind).await?;
        let outcome: Result<ResourceRecord, CatalogError> = async {
            let stmt = sql::select_by_key(entity, id, false)?;
            let rows = scope.fetch(&stmt).await?;
            let row = single(kind, id, rows)?.ok_or_else(|| not_found(kind, id))?;
            self.translator.to_resource(kind, &row)
        }
        .await;
        scope.finish(outcome).await
    }

    /// Records whose `field` equals `value`. No match is an empty list.
    pub async fn get_many(
        &self,
        kind: EntityKind,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<ResourceRecord>, CatalogError> {
        let entity = self.entity(kind)?;
        let predicate = [(field.to_string(), value.into())];
        let mut scope = self.scope("get_many", kind).await?;
        let outcome: Result<Vec<ResourceRecord>, CatalogError> = async {
            let stmt = sql::build(entity, QueryOp::Select, &predicate)?;
            let rows = scope.fetch(&stmt).await?;
            rows.iter().map(|r| self.translator.to_resource(kind, r)).collect()
        }
        .await;
        scope.finish(outcome).await
    }

    /// Natural keys of the records whose `field` equals `value`.
    pub async fn get_ids(
        &self,
        kind: EntityKind,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<Identifier>, CatalogError> {
        let entity = self.entity(kind)?;
        let predicate = [(field.to_string(), value.into())];
        let mut scope = self.scope("get_ids", kind).await?;
        let outcome: Result<Vec<Identifier>, CatalogError> = async {
            let stmt = sql::build(entity, QueryOp::Select, &predicate)?;
            let rows = scope.fetch(&stmt).await?;
            rows.iter().map(|r| self.translator.identifier_of(kind, r)).collect()
        }
        .await;
        scope.finish(outcome).await
    }

    pub async fn get_all(&self, kind: EntityKind) -> Result<Vec<ResourceRecord>, CatalogError> {
        let entity = self.entity(kind)?;
        let mut scope = self.scope("get_all", kind).await?;
        let outcome: Result<Vec<ResourceRecord>, CatalogError> = async {
            let rows = scope.fetch(&sql::select_all(entity)).await?;
            rows.iter().map(|r| self.translator.to_resource(kind, r)).collect()
        }
        .await;
        scope.finish(outcome).await
    }

    pub async fn get_all_ids(&self, kind: EntityKind) -> Result<Vec<Identifier>, CatalogError> {
        let entity = self.entity(kind)?;
        let mut scope = self.scope("get_all_ids", kind).await?;
        let outcome: Result<Vec<Identifier>, CatalogError> = async {
            let rows = scope.fetch(&sql::select_all(entity)).await?;
            rows.iter().map(|r| self.translator.identifier_of(kind, r)).collect()
        }
        .await;
        scope.finish(outcome).await
    }

    /// Upsert by natural key. The lookup locks the row (`FOR UPDATE`) and the write happens in
    /// the same scope; a found row is updated in place, otherwise a new row is inserted.
    /// Returns the record as stored.
    pub async fn save(&self, kind: EntityKind, record: &ResourceRecord) -> Result<ResourceRecord, CatalogError> {
        let entity = self.entity(kind)?;
        let mut scope = self.scope("save", kind).await?;
        let outcome: Result<ResourceRecord, CatalogError> = async {
            if record.kind != kind {
                return Err(CatalogError::mapping(
                    kind,
                    format!("record of kind {} passed as {}", record.kind, kind),
                ));
            }
            let id = self.translator.natural_key(kind, record)?;
            let rows = scope.fetch(&sql::select_by_key(entity, &id, true)?).await?;
            let existing = single(kind, &id, rows)?;
            let updating = existing.is_some();
            let row = self.translator.to_entity(kind, record, existing)?;
            let stmt = if updating {
                sql::update(entity, &row)?
            } else {
                sql::insert(entity, &row)?
            };
            scope.execute(&stmt).await?;
            tracing::debug!(%kind, %id, updating, "saved");
            self.translator.to_resource(kind, &row)
        }
        .await;
        scope.finish(outcome).await
    }

    /// True iff a row with this natural key exists. Never fails with `NotFound`.
    pub async fn exists(&self, kind: EntityKind, id: &Identifier) -> Result<bool, CatalogError> {
        let entity = self.entity(kind)?;
        let mut scope = self.scope("exists", kind).await?;
        let outcome: Result<bool, CatalogError> = async {
            let rows = scope.fetch(&sql::select_by_key(entity, id, false)?).await?;
            Ok(!rows.is_empty())
        }
        .await;
        scope.finish(outcome).await
    }
}

fn not_found(kind: EntityKind, id: &Identifier) -> CatalogError {
    CatalogError::NotFound {
        kind,
        identifier: id.to_string(),
    }
}

/// At most one row, or `AmbiguousResult`.
fn single(kind: EntityKind, id: &Identifier, rows: Vec<RawEntity>) -> Result<Option<RawEntity>, CatalogError> {
    if rows.len() > 1 {
        return Err(CatalogError::AmbiguousResult {
            kind,
            identifier: id.to_string(),
            count: rows.len(),
        });
    }
    Ok(rows.into_iter().next())
}
