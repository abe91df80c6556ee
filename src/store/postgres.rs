//! PostgreSQL backend: one sqlx transaction per unit of work, statements rendered to SQL.

use crate::error::{CatalogError, ConfigError};
use crate::record::RawEntity;
use crate::sql::{render, Statement};
use crate::store::{Store, Transaction};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, Postgres};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CatalogError::storage("connect", e))?;
        Ok(PgStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, CatalogError> {
        let tx = self.pool.begin().await.map_err(|e| CatalogError::storage("begin", e))?;
        Ok(PgTransaction { tx })
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::storage("ping", e))?;
        Ok(())
    }
}

/// sqlx rolls the transaction back when this is dropped unfinished.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn context(stmt: &Statement) -> String {
    format!("{} {}", stmt.verb(), stmt.target().table)
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<RawEntity>, CatalogError> {
        let q = render(stmt);
        let mut query = sqlx::query(&q.sql);
        for v in q.bind_values() {
            query = query.bind(v);
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| CatalogError::storage(context(stmt), e))?;
        let table = &stmt.target().table;
        Ok(rows.iter().map(|r| row_to_raw(r, table)).collect())
    }

    async fn execute(&mut self, stmt: &Statement) -> Result<u64, CatalogError> {
        let q = render(stmt);
        let mut query = sqlx::query(&q.sql);
        for v in q.bind_values() {
            query = query.bind(v);
        }
        let done = query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| CatalogError::storage(context(stmt), e))?;
        Ok(done.rows_affected())
    }

    async fn commit(self) -> Result<(), CatalogError> {
        self.tx.commit().await.map_err(|e| CatalogError::storage("commit", e))
    }

    async fn rollback(self) -> Result<(), CatalogError> {
        self.tx.rollback().await.map_err(|e| CatalogError::storage("rollback", e))
    }
}

fn row_to_raw(row: &PgRow, table: &str) -> RawEntity {
    use sqlx::{Column, Row};
    let columns: BTreeMap<String, Value> = row
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_to_value(row, col.name())))
        .collect();
    RawEntity {
        table: table.to_string(),
        columns,
    }
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(crate::value::format_timestamp(d));
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), CatalogError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ConfigError::Validation(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| ConfigError::Validation("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_swaps_database() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@localhost:5432/app_catalog?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "app_catalog");
    }

    #[test]
    fn database_name_is_quoted() {
        assert_eq!(quote_ident("my\"db"), "\"my\"\"db\"");
    }
}
