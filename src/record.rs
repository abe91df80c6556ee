//! Identifiers, resource records and raw persisted rows.

use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Natural key of a record: a single value, or field name -> value for composite keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Composite(BTreeMap<String, Value>),
    Scalar(Value),
}

impl Identifier {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Identifier::Scalar(value.into())
    }

    pub fn composite<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Identifier::Composite(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Scalar(Value::String(s)) => f.write_str(s),
            Identifier::Scalar(v) => write!(f, "{}", v),
            Identifier::Composite(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => format!("{}={}", k, s),
                        other => format!("{}={}", k, other),
                    })
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

/// Back-reference to a parent record, by the parent's natural key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParentRef {
    pub kind: EntityKind,
    /// Field on the child holding the parent's key.
    pub field: String,
    pub id: Value,
}

/// Typed in-memory form of one persisted record. Created fresh on every read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub kind: EntityKind,
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ParentRef>,
}

impl ResourceRecord {
    pub fn new(kind: EntityKind) -> Self {
        ResourceRecord {
            kind,
            fields: BTreeMap::new(),
            parents: Vec::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn parent(&self, kind: EntityKind) -> Option<&ParentRef> {
        self.parents.iter().find(|p| p.kind == kind)
    }
}

/// One row as the store returns it, keyed by column name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEntity {
    pub table: String,
    pub columns: BTreeMap<String, Value>,
}

impl RawEntity {
    pub fn new(table: impl Into<String>) -> Self {
        RawEntity {
            table: table.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }
}
