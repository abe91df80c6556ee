//! Resolved catalog: config validated and flattened for runtime use.

use crate::config::{AutoStamp, FieldType};
use crate::error::ConfigError;
use crate::kind::EntityKind;
use std::collections::HashMap;

/// Shape of a kind's natural key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyShape {
    Scalar(String),
    Composite(Vec<String>),
}

impl KeyShape {
    pub fn fields(&self) -> Vec<&str> {
        match self {
            KeyShape::Scalar(f) => vec![f.as_str()],
            KeyShape::Composite(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, KeyShape::Composite(_))
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedField {
    pub name: String,
    pub column: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub references: Option<EntityKind>,
    pub auto: Option<AutoStamp>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub kind: EntityKind,
    pub schema_name: String,
    pub table_name: String,
    pub key: KeyShape,
    pub fields: Vec<ResolvedField>,
    /// Field name -> index into `fields`.
    pub field_index: HashMap<String, usize>,
    /// Column name -> index into `fields`.
    pub column_index: HashMap<String, usize>,
}

impl ResolvedEntity {
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_by_column(&self, column: &str) -> Option<&ResolvedField> {
        self.column_index.get(column).map(|&i| &self.fields[i])
    }

    pub fn key_fields(&self) -> Vec<&ResolvedField> {
        self.key
            .fields()
            .into_iter()
            .filter_map(|name| self.field(name))
            .collect()
    }

    pub fn key_columns(&self) -> Vec<String> {
        self.key_fields().iter().map(|f| f.column.clone()).collect()
    }

    pub fn columns(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.column.clone()).collect()
    }

    pub fn is_key_field(&self, name: &str) -> bool {
        self.key.fields().contains(&name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedCatalog {
    pub schema_name: String,
    pub entities: HashMap<EntityKind, ResolvedEntity>,
}

impl ResolvedCatalog {
    pub fn entity(&self, kind: EntityKind) -> Result<&ResolvedEntity, ConfigError> {
        self.entities.get(&kind).ok_or_else(|| ConfigError::MissingReference {
            kind: "entity",
            id: kind.to_string(),
        })
    }

    /// Point every entity at another schema (e.g. from `CATALOG_SCHEMA`).
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema_name = schema.to_string();
        for e in self.entities.values_mut() {
            e.schema_name = schema.to_string();
        }
        self
    }

    /// Kinds in a stable order: every referenced parent comes before its children.
    pub fn kinds_parents_first(&self) -> Vec<EntityKind> {
        let mut ordered: Vec<EntityKind> = Vec::with_capacity(self.entities.len());
        let mut pending: Vec<EntityKind> = self.entities.keys().copied().collect();
        pending.sort();
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|kind| {
                let ready = self.entities[kind]
                    .fields
                    .iter()
                    .filter_map(|f| f.references)
                    .all(|parent| parent == *kind || ordered.contains(&parent));
                if ready {
                    ordered.push(*kind);
                }
                !ready
            });
            if pending.len() == before {
                // reference cycle; keep the remaining kinds in name order
                ordered.append(&mut pending);
            }
        }
        ordered
    }
}
