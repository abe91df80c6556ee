//! In-process store. Transactions are serialised: each holds the table lock from begin to
//! commit/rollback, and rollback (or drop) restores the snapshot taken at begin.

use crate::error::CatalogError;
use crate::record::RawEntity;
use crate::sql::{Binding, Statement, Target};
use crate::store::{Store, Transaction};
use async_trait::async_trait;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Row = BTreeMap<String, Value>;
type Tables = HashMap<Target, Vec<Row>>;

#[derive(Default)]
struct Counters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    released: AtomicU64,
}

#[derive(Default)]
struct Shared {
    tables: Arc<Mutex<Tables>>,
    counters: Counters,
    fail_next: StdMutex<Option<String>>,
    latency_ms: AtomicU64,
}

/// Snapshot of transaction counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub released: u64,
    pub active: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TxStats {
        let c = &self.shared.counters;
        let begun = c.begun.load(AtomicOrdering::SeqCst);
        let released = c.released.load(AtomicOrdering::SeqCst);
        TxStats {
            begun,
            committed: c.committed.load(AtomicOrdering::SeqCst),
            rolled_back: c.rolled_back.load(AtomicOrdering::SeqCst),
            released,
            active: begun.saturating_sub(released),
        }
    }

    /// Make the next statement run by any transaction fail with a storage error.
    pub fn fail_next_statement(&self, message: impl Into<String>) {
        *self
            .shared
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    /// Delay applied before every statement.
    pub fn set_latency(&self, latency: Duration) {
        self.shared
            .latency_ms
            .store(latency.as_millis() as u64, AtomicOrdering::SeqCst);
    }

    /// Load a row directly, skipping key checks. For fixtures only.
    pub async fn insert_raw(&self, target: &Target, columns: BTreeMap<String, Value>) {
        let mut tables = self.shared.tables.lock().await;
        tables.entry(target.clone()).or_default().push(columns);
    }

    pub async fn row_count(&self, target: &Target) -> usize {
        let tables = self.shared.tables.lock().await;
        tables.get(target).map_or(0, Vec::len)
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, CatalogError> {
        let guard = self.shared.tables.clone().lock_owned().await;
        let snapshot = guard.clone();
        self.shared.counters.begun.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(MemoryTransaction {
            guard: Some(guard),
            snapshot,
            shared: self.shared.clone(),
        })
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<Tables>>,
    snapshot: Tables,
    shared: Arc<Shared>,
}

impl MemoryTransaction {
    async fn before_statement(&mut self) -> Result<&mut Tables, CatalogError> {
        let latency = self.shared.latency_ms.load(AtomicOrdering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let injected = self
            .shared
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(message) = injected {
            return Err(CatalogError::storage("memory", message));
        }
        self.guard
            .as_deref_mut()
            .ok_or_else(|| CatalogError::storage("memory", "transaction already finished"))
    }

    fn finish(&mut self, commit: bool) {
        if let Some(mut guard) = self.guard.take() {
            let counters = &self.shared.counters;
            if commit {
                counters.committed.fetch_add(1, AtomicOrdering::SeqCst);
            } else {
                *guard = std::mem::take(&mut self.snapshot);
                counters.rolled_back.fetch_add(1, AtomicOrdering::SeqCst);
            }
            counters.released.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.finish(false);
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<RawEntity>, CatalogError> {
        let tables = self.before_statement().await?;
        let Statement::Select {
            target,
            columns,
            filter,
            order_by,
            ..
        } = stmt
        else {
            return Err(CatalogError::storage("memory", format!("{} does not return rows", stmt.verb())));
        };
        let mut rows: Vec<&Row> = tables
            .get(target)
            .map(|rows| rows.iter().filter(|r| matches(r, filter)).collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| {
            order_by
                .iter()
                .map(|c| compare(a.get(c), b.get(c)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(rows
            .into_iter()
            .map(|r| RawEntity {
                table: target.table.clone(),
                columns: columns
                    .iter()
                    .map(|c| (c.clone(), r.get(c).cloned().unwrap_or(Value::Null)))
                    .collect(),
            })
            .collect())
    }

    async fn execute(&mut self, stmt: &Statement) -> Result<u64, CatalogError> {
        let tables = self.before_statement().await?;
        match stmt {
            Statement::Select { .. } => Err(CatalogError::storage("memory", "select must be fetched")),
            Statement::Delete { target, filter } => {
                let Some(rows) = tables.get_mut(target) else { return Ok(0) };
                let before = rows.len();
                rows.retain(|r| !matches(r, filter));
                Ok((before - rows.len()) as u64)
            }
            Statement::Insert {
                target,
                primary_key,
                values,
            } => {
                let row: Row = values.iter().map(|b| (b.column.clone(), b.value.clone())).collect();
                let rows = tables.entry(target.clone()).or_default();
                let duplicate = rows.iter().any(|r| {
                    primary_key
                        .iter()
                        .all(|c| values_equal(r.get(c).unwrap_or(&Value::Null), row.get(c).unwrap_or(&Value::Null)))
                });
                if duplicate {
                    return Err(CatalogError::storage(
                        "memory",
                        format!("duplicate key value violates primary key of {}", target.table),
                    ));
                }
                rows.push(row);
                Ok(1)
            }
            Statement::Update { target, values, filter } => {
                let Some(rows) = tables.get_mut(target) else { return Ok(0) };
                let mut affected = 0;
                for row in rows.iter_mut().filter(|r| matches(r, filter)) {
                    for b in values {
                        row.insert(b.column.clone(), b.value.clone());
                    }
                    affected += 1;
                }
                Ok(affected)
            }
        }
    }

    async fn commit(mut self) -> Result<(), CatalogError> {
        self.finish(true);
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), CatalogError> {
        self.finish(false);
        Ok(())
    }
}

fn matches(row: &Row, filter: &[Binding]) -> bool {
    filter
        .iter()
        .all(|b| row.get(&b.column).is_some_and(|v| !v.is_null() && values_equal(v, &b.value)))
}

/// Integers compare exactly; `f64` only when either side has a fraction.
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    match (x.is_f64(), y.is_f64()) {
        // one side negative i64, the other a u64 above i64::MAX
        (false, false) => Some(if x.as_i64().is_some() { Ordering::Less } else { Ordering::Greater }),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => compare_numbers(x, y).unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
