//! Schema bootstrap for the catalog: CREATE SCHEMA, then one table per kind with the natural
//! key as primary key and foreign keys to parents. Parents are created before children.

use crate::config::{KeyShape, ResolvedCatalog, ResolvedEntity};
use crate::error::CatalogError;
use sqlx::PgPool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn full_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}

fn table_ddl(catalog: &ResolvedCatalog, entity: &ResolvedEntity) -> String {
    let mut col_defs: Vec<String> = entity
        .fields
        .iter()
        .map(|f| {
            let mut def = format!("{} {}", quote(&f.column), f.field_type.pg_type().to_uppercase());
            if !f.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    let pk_cols: Vec<String> = entity.key_columns().iter().map(|c| quote(c)).collect();
    col_defs.push(format!("PRIMARY KEY ({})", pk_cols.join(", ")));

    for f in &entity.fields {
        let Some(parent_kind) = f.references else { continue };
        let Some(parent) = catalog.entities.get(&parent_kind) else { continue };
        let KeyShape::Scalar(_) = parent.key else { continue };
        let parent_cols = parent.key_columns();
        col_defs.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE CASCADE",
            quote(&format!("{}_{}_fkey", entity.table_name, f.column)),
            quote(&f.column),
            full_name(&parent.schema_name, &parent.table_name),
            quote(&parent_cols[0]),
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        full_name(&entity.schema_name, &entity.table_name),
        col_defs.join(",\n  ")
    )
}

/// DDL statements for the whole catalog, in execution order. Idempotent (IF NOT EXISTS).
pub fn catalog_ddl(catalog: &ResolvedCatalog) -> Vec<String> {
    let mut out = vec![format!("CREATE SCHEMA IF NOT EXISTS {}", quote(&catalog.schema_name))];
    for kind in catalog.kinds_parents_first() {
        if let Some(entity) = catalog.entities.get(&kind) {
            out.push(table_ddl(catalog, entity));
        }
    }
    out
}

/// Create the catalog schema and tables in one transaction.
pub async fn apply_catalog_schema(pool: &PgPool, catalog: &ResolvedCatalog) -> Result<(), CatalogError> {
    let mut tx = pool.begin().await?;
    for sql in catalog_ddl(catalog) {
        tracing::debug!(%sql, "applying ddl");
        sqlx::query(&sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(schema = %catalog.schema_name, tables = catalog.entities.len(), "catalog schema ready");
    Ok(())
}
