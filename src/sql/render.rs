//! Render statements to PostgreSQL with `$n` placeholders.

use crate::sql::{Binding, PgBindValue, Statement, Target};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(target: &Target) -> String {
    format!("{}.{}", quoted(&target.schema), quoted(&target.table))
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
    /// Placeholder cast per parameter, parallel to `params`.
    pub casts: Vec<Option<&'static str>>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
            casts: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value, cast: Option<&'static str>) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        self.casts.push(cast);
        n
    }

    /// Parameters ready to bind, in placeholder order.
    pub fn bind_values(&self) -> impl Iterator<Item = PgBindValue> + '_ {
        self.params
            .iter()
            .zip(&self.casts)
            .map(|(v, cast)| PgBindValue::for_cast(v, *cast))
    }

    fn placeholder(&mut self, b: &Binding) -> String {
        let n = self.push_param(b.value.clone(), b.cast);
        match b.cast {
            Some(cast) => format!("${}::{}", n, cast),
            None => format!("${}", n),
        }
    }

    fn where_clause(&mut self, filter: &[Binding]) -> String {
        if filter.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = filter
            .iter()
            .map(|b| format!("{} = {}", quoted(&b.column), self.placeholder(b)))
            .collect();
        format!(" WHERE {}", parts.join(" AND "))
    }
}

pub fn render(stmt: &Statement) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = match stmt {
        Statement::Select {
            target,
            columns,
            filter,
            order_by,
            for_update,
        } => {
            let cols = columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
            let mut sql = format!("SELECT {} FROM {}", cols, qualified_table(target));
            sql.push_str(&q.where_clause(filter));
            if !order_by.is_empty() {
                let order = order_by.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
                sql.push_str(&format!(" ORDER BY {}", order));
            }
            if *for_update {
                sql.push_str(" FOR UPDATE");
            }
            sql
        }
        Statement::Delete { target, filter } => {
            format!("DELETE FROM {}{}", qualified_table(target), q.where_clause(filter))
        }
        Statement::Insert { target, values, .. } => {
            let cols = values.iter().map(|b| quoted(&b.column)).collect::<Vec<_>>().join(", ");
            let placeholders = values.iter().map(|b| q.placeholder(b)).collect::<Vec<_>>().join(", ");
            format!("INSERT INTO {} ({}) VALUES ({})", qualified_table(target), cols, placeholders)
        }
        Statement::Update { target, values, filter } => {
            if values.is_empty() {
                // key-only rows: touch the key so the statement still reports rows affected
                let sets = filter
                    .iter()
                    .map(|b| format!("{} = {}", quoted(&b.column), quoted(&b.column)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("UPDATE {} SET {}{}", qualified_table(target), sets, q.where_clause(filter))
            } else {
                let sets = values
                    .iter()
                    .map(|b| format!("{} = {}", quoted(&b.column), q.placeholder(b)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("UPDATE {} SET {}{}", qualified_table(target), sets, q.where_clause(filter))
            }
        }
    };
    tracing::debug!(sql = %q.sql, params = ?q.params, "rendered {}", stmt.verb());
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> Target {
        Target::new("app_catalog", "compute_resource")
    }

    #[test]
    fn select_with_filter_order_and_lock() {
        let stmt = Statement::Select {
            target: target(),
            columns: vec!["resource_id".into(), "host_name".into()],
            filter: vec![Binding::new("resource_id", json!("host-1"), Some("text"))],
            order_by: vec!["resource_id".into()],
            for_update: true,
        };
        let q = render(&stmt);
        assert_eq!(
            q.sql,
            "SELECT \"resource_id\", \"host_name\" FROM \"app_catalog\".\"compute_resource\" \
             WHERE \"resource_id\" = $1::text ORDER BY \"resource_id\" FOR UPDATE"
        );
        assert_eq!(q.params, vec![json!("host-1")]);
    }

    #[test]
    fn delete_numbers_params_in_order() {
        let stmt = Statement::Delete {
            target: target(),
            filter: vec![
                Binding::new("a", json!("x"), Some("text")),
                Binding::new("b", json!(2), Some("bigint")),
            ],
        };
        let q = render(&stmt);
        assert_eq!(
            q.sql,
            "DELETE FROM \"app_catalog\".\"compute_resource\" WHERE \"a\" = $1::text AND \"b\" = $2::bigint"
        );
        assert_eq!(q.params, vec![json!("x"), json!(2)]);
    }

    #[test]
    fn update_binds_values_before_filter() {
        let stmt = Statement::Update {
            target: target(),
            values: vec![Binding::new("host_name", json!("h"), Some("text"))],
            filter: vec![Binding::new("resource_id", json!("host-1"), Some("text"))],
        };
        let q = render(&stmt);
        assert_eq!(
            q.sql,
            "UPDATE \"app_catalog\".\"compute_resource\" SET \"host_name\" = $1::text WHERE \"resource_id\" = $2::text"
        );
        assert_eq!(q.params, vec![json!("h"), json!("host-1")]);
    }

    #[test]
    fn key_only_update_sets_keys_to_themselves() {
        let stmt = Statement::Update {
            target: Target::new("app_catalog", "host_alias"),
            values: vec![],
            filter: vec![
                Binding::new("resource_id", json!("host-1"), Some("text")),
                Binding::new("alias", json!("login"), Some("text")),
            ],
        };
        let q = render(&stmt);
        assert_eq!(
            q.sql,
            "UPDATE \"app_catalog\".\"host_alias\" SET \"resource_id\" = \"resource_id\", \"alias\" = \"alias\" \
             WHERE \"resource_id\" = $1::text AND \"alias\" = $2::text"
        );
        assert_eq!(q.params, vec![json!("host-1"), json!("login")]);
    }

    #[test]
    fn bind_values_follow_placeholder_casts() {
        let stmt = Statement::Update {
            target: target(),
            values: vec![Binding::new("settings", json!("plain"), Some("jsonb"))],
            filter: vec![Binding::new("resource_id", json!("host-1"), Some("text"))],
        };
        let binds: Vec<PgBindValue> = render(&stmt).bind_values().collect();
        assert_eq!(
            binds,
            vec![PgBindValue::Jsonb(json!("plain")), PgBindValue::Text("host-1".into())]
        );
    }

    #[test]
    fn insert_and_identifier_quoting() {
        let stmt = Statement::Insert {
            target: Target::new("s", "we\"ird"),
            primary_key: vec!["id".into()],
            values: vec![Binding::new("id", json!(1), None)],
        };
        let q = render(&stmt);
        assert_eq!(q.sql, "INSERT INTO \"s\".\"we\"\"ird\" (\"id\") VALUES ($1)");
    }
}
