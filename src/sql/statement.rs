//! Backend-neutral statements. The Postgres store renders them to SQL; the memory store
//! evaluates them directly.

use serde_json::Value;

/// Schema-qualified table a statement runs against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    pub schema: String,
    pub table: String,
}

impl Target {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Target {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

/// Column bound to a value. `cast` is the column's SQL type, applied to the placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub column: String,
    pub value: Value,
    pub cast: Option<&'static str>,
}

impl Binding {
    pub fn new(column: impl Into<String>, value: Value, cast: Option<&'static str>) -> Self {
        Binding {
            column: column.into(),
            value,
            cast,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// Equality filters joined with AND. An empty filter selects every row.
    Select {
        target: Target,
        columns: Vec<String>,
        filter: Vec<Binding>,
        order_by: Vec<String>,
        for_update: bool,
    },
    Delete {
        target: Target,
        filter: Vec<Binding>,
    },
    /// `primary_key` lists the key columns; a duplicate key is a storage error.
    Insert {
        target: Target,
        primary_key: Vec<String>,
        values: Vec<Binding>,
    },
    Update {
        target: Target,
        values: Vec<Binding>,
        filter: Vec<Binding>,
    },
}

impl Statement {
    pub fn target(&self) -> &Target {
        match self {
            Statement::Select { target, .. }
            | Statement::Delete { target, .. }
            | Statement::Insert { target, .. }
            | Statement::Update { target, .. } => target,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Statement::Select { .. } => "select",
            Statement::Delete { .. } => "delete",
            Statement::Insert { .. } => "insert",
            Statement::Update { .. } => "update",
        }
    }
}
