//! Entity/resource translation: raw rows to typed records and back, dispatching on kind.

use crate::config::{AutoStamp, KeyShape, ResolvedCatalog, ResolvedEntity, ResolvedField};
use crate::error::CatalogError;
use crate::kind::EntityKind;
use crate::record::{Identifier, ParentRef, RawEntity, ResourceRecord};
use crate::value;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps rows of any catalog kind. Every result is checked against the kind's catalog entry;
/// nothing is cast blindly.
#[derive(Clone, Debug)]
pub struct Translator {
    catalog: Arc<ResolvedCatalog>,
}

impl Translator {
    pub fn new(catalog: Arc<ResolvedCatalog>) -> Self {
        Translator { catalog }
    }

    pub fn catalog(&self) -> &ResolvedCatalog {
        &self.catalog
    }

    pub fn to_resource(&self, kind: EntityKind, raw: &RawEntity) -> Result<ResourceRecord, CatalogError> {
        to_resource(self.catalog.entity(kind)?, raw)
    }

    pub fn to_entity(
        &self,
        kind: EntityKind,
        record: &ResourceRecord,
        existing: Option<RawEntity>,
    ) -> Result<RawEntity, CatalogError> {
        to_entity(self.catalog.entity(kind)?, record, existing)
    }

    pub fn natural_key(&self, kind: EntityKind, record: &ResourceRecord) -> Result<Identifier, CatalogError> {
        natural_key(self.catalog.entity(kind)?, record)
    }

    pub fn identifier_of(&self, kind: EntityKind, raw: &RawEntity) -> Result<Identifier, CatalogError> {
        identifier_of(self.catalog.entity(kind)?, raw)
    }
}

/// Raw row -> record. Fails with `Mapping` when the row does not have the kind's shape.
pub fn to_resource(entity: &ResolvedEntity, raw: &RawEntity) -> Result<ResourceRecord, CatalogError> {
    let kind = entity.kind;
    if raw.table != entity.table_name {
        return Err(CatalogError::mapping(
            kind,
            format!("row from table {} is not a {}", raw.table, kind),
        ));
    }
    if let Some(col) = raw.columns.keys().find(|c| entity.field_by_column(c).is_none()) {
        return Err(CatalogError::mapping(kind, format!("unexpected column {}", col)));
    }

    let mut record = ResourceRecord::new(kind);
    for field in &entity.fields {
        let raw_value = raw
            .get(&field.column)
            .ok_or_else(|| CatalogError::mapping(kind, format!("missing column {}", field.column)))?;
        let v = value::normalize(field.field_type, raw_value)
            .map_err(|reason| CatalogError::mapping(kind, format!("column {}: {}", field.column, reason)))?;
        if v.is_null() && !field.nullable {
            return Err(CatalogError::mapping(kind, format!("column {} is null", field.column)));
        }
        if let (Some(parent), false) = (field.references, v.is_null()) {
            record.parents.push(ParentRef {
                kind: parent,
                field: field.name.clone(),
                id: v.clone(),
            });
        }
        record.fields.insert(field.name.clone(), v);
    }
    Ok(record)
}

/// Record -> raw row. With `existing`, the found row is updated in place and fields the
/// record does not carry keep their stored values; without it a complete new row is built.
pub fn to_entity(
    entity: &ResolvedEntity,
    record: &ResourceRecord,
    existing: Option<RawEntity>,
) -> Result<RawEntity, CatalogError> {
    let kind = entity.kind;
    if record.kind != kind {
        return Err(CatalogError::mapping(
            kind,
            format!("record of kind {} passed as {}", record.kind, kind),
        ));
    }
    let mut incoming = BTreeMap::new();
    for (name, v) in &record.fields {
        let field = entity
            .field(name)
            .ok_or_else(|| CatalogError::unsupported_field(kind, name))?;
        let v = value::normalize(field.field_type, v)
            .map_err(|reason| CatalogError::mapping(kind, format!("{}: {}", name, reason)))?;
        incoming.insert(name.as_str(), v);
    }
    for key in entity.key.fields() {
        if incoming.get(key).map_or(true, Value::is_null) {
            return Err(CatalogError::invalid_identifier(kind, format!("missing key field {}", key)));
        }
    }

    let updating = existing.is_some();
    let mut row = match existing {
        Some(row) => {
            if row.table != entity.table_name {
                return Err(CatalogError::mapping(
                    kind,
                    format!("existing row from table {} is not a {}", row.table, kind),
                ));
            }
            for key in entity.key_fields() {
                if row.get(&key.column) != incoming.get(key.name.as_str()) {
                    return Err(CatalogError::mapping(
                        kind,
                        format!("{} does not match the existing row", key.name),
                    ));
                }
            }
            row
        }
        None => RawEntity::new(&entity.table_name),
    };

    for field in &entity.fields {
        let supplied = incoming.remove(field.name.as_str());
        let v = match (supplied, field.auto, updating) {
            (_, Some(AutoStamp::Updated), true) => value::now(),
            (_, Some(AutoStamp::Created), true) => continue,
            (Some(v), _, _) if !v.is_null() => v,
            (None | Some(Value::Null), Some(AutoStamp::Created), false) => value::now(),
            (Some(v), _, _) => v,
            (None, _, true) => continue,
            (None, _, false) => Value::Null,
        };
        if v.is_null() && !field.nullable {
            return Err(CatalogError::mapping(kind, format!("missing required field {}", field.name)));
        }
        row.columns.insert(field.column.clone(), v);
    }
    Ok(row)
}

/// Natural-key projection of a record.
pub fn natural_key(entity: &ResolvedEntity, record: &ResourceRecord) -> Result<Identifier, CatalogError> {
    key_from(entity, |f| record.get(&f.name).cloned())
        .ok_or_else(|| CatalogError::invalid_identifier(entity.kind, "record is missing key fields"))
}

/// Natural-key projection of a raw row.
pub fn identifier_of(entity: &ResolvedEntity, raw: &RawEntity) -> Result<Identifier, CatalogError> {
    key_from(entity, |f| raw.get(&f.column).cloned())
        .ok_or_else(|| CatalogError::mapping(entity.kind, "row is missing key columns"))
}

fn key_from(entity: &ResolvedEntity, lookup: impl Fn(&ResolvedField) -> Option<Value>) -> Option<Identifier> {
    let mut values = BTreeMap::new();
    for f in entity.key_fields() {
        let v = lookup(f).filter(|v| !v.is_null())?;
        values.insert(f.name.clone(), v);
    }
    match &entity.key {
        KeyShape::Scalar(name) => values.remove(name).map(Identifier::Scalar),
        KeyShape::Composite(_) => Some(Identifier::Composite(values)),
    }
}
