//! Transaction scope: one begin, then exactly one commit or rollback, then release.

use crate::error::CatalogError;
use crate::kind::EntityKind;
use crate::record::RawEntity;
use crate::sql::Statement;
use crate::store::{Store, Transaction};
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeState {
    Created,
    Active,
    Committed,
    RolledBack,
    Released,
}

impl ScopeState {
    /// `Created -> Released` covers a begin that failed before anything was opened.
    pub fn can_transition(self, next: ScopeState) -> bool {
        use ScopeState::*;
        matches!(
            (self, next),
            (Created, Active)
                | (Created, Released)
                | (Active, Committed)
                | (Active, RolledBack)
                | (Committed, Released)
                | (RolledBack, Released)
        )
    }
}

pub struct TransactionScope<T: Transaction> {
    tx: Option<T>,
    state: ScopeState,
    operation: &'static str,
    kind: EntityKind,
    timeout: Option<Duration>,
}

impl<T: Transaction> TransactionScope<T> {
    pub async fn begin<S>(
        store: &S,
        operation: &'static str,
        kind: EntityKind,
        timeout: Option<Duration>,
    ) -> Result<Self, CatalogError>
    where
        S: Store<Tx = T>,
    {
        let mut scope = TransactionScope {
            tx: None,
            state: ScopeState::Created,
            operation,
            kind,
            timeout,
        };
        match with_deadline(timeout, "begin", store.begin()).await {
            Ok(tx) => {
                scope.tx = Some(tx);
                scope.transition(ScopeState::Active);
                Ok(scope)
            }
            Err(e) => {
                scope.transition(ScopeState::Released);
                tracing::error!(operation, %kind, error = %e, "could not open transaction");
                Err(e)
            }
        }
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    fn transition(&mut self, next: ScopeState) {
        debug_assert!(
            self.state.can_transition(next),
            "illegal scope transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(operation = self.operation, kind = %self.kind, from = ?self.state, to = ?next, "scope");
        self.state = next;
    }

    fn tx(&mut self) -> Result<&mut T, CatalogError> {
        self.tx
            .as_mut()
            .ok_or_else(|| CatalogError::storage(self.operation, "transaction scope is not active"))
    }

    pub async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<RawEntity>, CatalogError> {
        let timeout = self.timeout;
        let tx = self.tx()?;
        with_deadline(timeout, stmt.verb(), tx.fetch(stmt)).await
    }

    pub async fn execute(&mut self, stmt: &Statement) -> Result<u64, CatalogError> {
        let timeout = self.timeout;
        let tx = self.tx()?;
        with_deadline(timeout, stmt.verb(), tx.execute(stmt)).await
    }

    /// Commit on `Ok`, roll back on `Err`, release either way, and hand the outcome back.
    /// A failed commit turns the outcome into that error.
    pub async fn finish<R>(mut self, outcome: Result<R, CatalogError>) -> Result<R, CatalogError> {
        let Some(tx) = self.tx.take() else {
            return outcome;
        };
        let result = match outcome {
            Ok(value) => match tx.commit().await {
                Ok(()) => {
                    self.transition(ScopeState::Committed);
                    Ok(value)
                }
                Err(e) => {
                    self.transition(ScopeState::RolledBack);
                    Err(e)
                }
            },
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(operation = self.operation, error = %rollback_err, "rollback failed");
                }
                self.transition(ScopeState::RolledBack);
                Err(e)
            }
        };
        self.transition(ScopeState::Released);
        if let Err(e) = &result {
            if matches!(e, CatalogError::Storage { .. }) {
                tracing::error!(operation = self.operation, kind = %self.kind, error = %e, "storage failure, rolled back");
            } else {
                tracing::warn!(operation = self.operation, kind = %self.kind, error = %e, "rolled back");
            }
        }
        result
    }
}

impl<T: Transaction> Drop for TransactionScope<T> {
    fn drop(&mut self) {
        if self.state == ScopeState::Active {
            // the transaction's own drop performs the rollback
            tracing::warn!(operation = self.operation, kind = %self.kind, "scope dropped while active, rolling back");
        }
    }
}

async fn with_deadline<R, F>(timeout: Option<Duration>, what: &str, fut: F) -> Result<R, CatalogError>
where
    F: Future<Output = Result<R, CatalogError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| CatalogError::storage(what, format!("statement timed out after {:?}", limit)))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use ScopeState::*;

    #[test]
    fn transition_table() {
        assert!(Created.can_transition(Active));
        assert!(Active.can_transition(Committed));
        assert!(Active.can_transition(RolledBack));
        assert!(Committed.can_transition(Released));
        assert!(RolledBack.can_transition(Released));

        assert!(!Active.can_transition(Released));
        assert!(!Committed.can_transition(RolledBack));
        assert!(!Released.can_transition(Active));
        assert!(!Created.can_transition(Committed));
    }

    #[tokio::test]
    async fn ok_commits_then_releases() {
        let store = MemoryStore::new();
        let scope = TransactionScope::begin(&store, "test", EntityKind::Workflow, None).await.unwrap();
        assert_eq!(scope.state(), Active);
        let v = scope.finish(Ok(7)).await.unwrap();
        assert_eq!(v, 7);
        assert_eq!(store.stats().committed, 1);
        assert_eq!(store.stats().active, 0);
    }

    #[tokio::test]
    async fn err_rolls_back_then_releases() {
        let store = MemoryStore::new();
        let scope = TransactionScope::begin(&store, "test", EntityKind::Workflow, None).await.unwrap();
        let err = scope
            .finish::<()>(Err(CatalogError::mapping(EntityKind::Workflow, "boom")))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Mapping { .. }));
        assert_eq!(store.stats().rolled_back, 1);
        assert_eq!(store.stats().active, 0);
    }

    #[tokio::test]
    async fn dropped_scope_still_releases() {
        let store = MemoryStore::new();
        {
            let _scope = TransactionScope::begin(&store, "test", EntityKind::Workflow, None).await.unwrap();
        }
        assert_eq!(store.stats().rolled_back, 1);
        assert_eq!(store.stats().active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_is_storage_error() {
        let store = MemoryStore::new();
        store.set_latency(Duration::from_secs(5));
        let mut scope = TransactionScope::begin(&store, "test", EntityKind::Workflow, Some(Duration::from_millis(50)))
            .await
            .unwrap();
        let stmt = Statement::Delete {
            target: crate::sql::Target::new("s", "t"),
            filter: vec![],
        };
        let outcome = scope.execute(&stmt).await;
        assert!(matches!(outcome, Err(CatalogError::Storage { ref source, .. }) if source.to_string().contains("timed out")));
        let _ = scope.finish(outcome).await;
        assert_eq!(store.stats().rolled_back, 1);
    }
}
