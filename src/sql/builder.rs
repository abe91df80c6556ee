//! Builds statements from a resolved entity and field-name predicates.

use crate::config::{KeyShape, ResolvedEntity, ResolvedField};
use crate::error::CatalogError;
use crate::record::{Identifier, RawEntity};
use crate::sql::{Binding, Statement, Target};
use crate::value;
use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryOp {
    Select,
    Delete,
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryOp::Select => "SELECT",
            QueryOp::Delete => "DELETE",
        })
    }
}

fn target(entity: &ResolvedEntity) -> Target {
    Target::new(&entity.schema_name, &entity.table_name)
}

fn bind(entity: &ResolvedEntity, field: &ResolvedField, v: &Value) -> Result<Binding, CatalogError> {
    let v = value::normalize(field.field_type, v)
        .map_err(|reason| CatalogError::invalid_identifier(entity.kind, format!("{}: {}", field.name, reason)))?;
    Ok(Binding::new(&field.column, v, Some(field.field_type.pg_type())))
}

fn filter(entity: &ResolvedEntity, predicate: &[(String, Value)]) -> Result<Vec<Binding>, CatalogError> {
    predicate
        .iter()
        .map(|(name, v)| {
            let field = entity
                .field(name)
                .ok_or_else(|| CatalogError::unsupported_field(entity.kind, name))?;
            bind(entity, field, v)
        })
        .collect()
}

fn select(entity: &ResolvedEntity, filter: Vec<Binding>, for_update: bool) -> Statement {
    Statement::Select {
        target: target(entity),
        columns: entity.columns(),
        filter,
        order_by: entity.key_columns(),
        for_update,
    }
}

/// Filtered SELECT or DELETE. Every field must be in the entity's catalog and at least
/// one predicate is required.
pub fn build(entity: &ResolvedEntity, op: QueryOp, predicate: &[(String, Value)]) -> Result<Statement, CatalogError> {
    let filter = filter(entity, predicate)?;
    if filter.is_empty() {
        return Err(CatalogError::invalid_identifier(
            entity.kind,
            format!("{} requires at least one predicate", op),
        ));
    }
    Ok(match op {
        QueryOp::Select => select(entity, filter, false),
        QueryOp::Delete => Statement::Delete {
            target: target(entity),
            filter,
        },
    })
}

/// Unfiltered SELECT of every row, ordered by natural key.
pub fn select_all(entity: &ResolvedEntity) -> Statement {
    select(entity, Vec::new(), false)
}

pub fn select_by_key(entity: &ResolvedEntity, id: &Identifier, for_update: bool) -> Result<Statement, CatalogError> {
    let predicate = key_predicate(entity, id)?;
    let filter = filter(entity, &predicate)?;
    Ok(select(entity, filter, for_update))
}

pub fn delete_by_key(entity: &ResolvedEntity, id: &Identifier) -> Result<Statement, CatalogError> {
    build(entity, QueryOp::Delete, &key_predicate(entity, id)?)
}

/// Turn an identifier into key-field predicates, rejecting the wrong shape for the kind.
pub fn key_predicate(entity: &ResolvedEntity, id: &Identifier) -> Result<Vec<(String, Value)>, CatalogError> {
    let kind = entity.kind;
    match (&entity.key, id) {
        (KeyShape::Scalar(field), Identifier::Scalar(v)) => {
            if v.is_null() {
                return Err(CatalogError::invalid_identifier(kind, "key value is null"));
            }
            Ok(vec![(field.clone(), v.clone())])
        }
        (KeyShape::Scalar(field), Identifier::Composite(_)) => Err(CatalogError::invalid_identifier(
            kind,
            format!("expected a single {} value, got a field map", field),
        )),
        (KeyShape::Composite(fields), Identifier::Scalar(_)) => Err(CatalogError::invalid_identifier(
            kind,
            format!("composite key ({}) requires a field map", fields.join(", ")),
        )),
        (KeyShape::Composite(fields), Identifier::Composite(map)) => {
            for name in map.keys() {
                if entity.field(name).is_none() {
                    return Err(CatalogError::unsupported_field(kind, name));
                }
                if !entity.is_key_field(name) {
                    return Err(CatalogError::invalid_identifier(kind, format!("{} is not a key field", name)));
                }
            }
            fields
                .iter()
                .map(|name| match map.get(name) {
                    Some(v) if !v.is_null() => Ok((name.clone(), v.clone())),
                    _ => Err(CatalogError::invalid_identifier(kind, format!("missing key field {}", name))),
                })
                .collect()
        }
    }
}

/// INSERT of every catalog column present on the row.
pub fn insert(entity: &ResolvedEntity, row: &RawEntity) -> Result<Statement, CatalogError> {
    let values = entity
        .fields
        .iter()
        .filter_map(|f| row.get(&f.column).map(|v| (f, v)))
        .map(|(f, v)| bind_column(entity, f, v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Statement::Insert {
        target: target(entity),
        primary_key: entity.key_columns(),
        values,
    })
}

/// UPDATE of every non-key column present on the row, filtered by the row's key columns.
pub fn update(entity: &ResolvedEntity, row: &RawEntity) -> Result<Statement, CatalogError> {
    let mut values = Vec::new();
    let mut filter = Vec::new();
    for f in &entity.fields {
        let Some(v) = row.get(&f.column) else { continue };
        let binding = bind_column(entity, f, v)?;
        if entity.is_key_field(&f.name) {
            filter.push(binding);
        } else {
            values.push(binding);
        }
    }
    if filter.len() != entity.key.fields().len() {
        return Err(CatalogError::invalid_identifier(entity.kind, "row is missing key columns"));
    }
    Ok(Statement::Update {
        target: target(entity),
        values,
        filter,
    })
}

fn bind_column(entity: &ResolvedEntity, field: &ResolvedField, v: &Value) -> Result<Binding, CatalogError> {
    let v = value::normalize(field.field_type, v)
        .map_err(|reason| CatalogError::mapping(entity.kind, format!("{}: {}", field.name, reason)))?;
    Ok(Binding::new(&field.column, v, Some(field.field_type.pg_type())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin;
    use crate::kind::EntityKind;
    use serde_json::json;

    fn entity(kind: EntityKind) -> ResolvedEntity {
        builtin().unwrap().entity(kind).unwrap().clone()
    }

    #[test]
    fn select_maps_fields_to_columns() {
        let e = entity(EntityKind::ComputeResource);
        let stmt = build(&e, QueryOp::Select, &[("hostName".into(), json!("cluster"))]).unwrap();
        match stmt {
            Statement::Select { filter, order_by, for_update, .. } => {
                assert_eq!(filter, vec![Binding::new("host_name", json!("cluster"), Some("text"))]);
                assert_eq!(order_by, vec!["resource_id".to_string()]);
                assert!(!for_update);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_field_is_unsupported() {
        let e = entity(EntityKind::ComputeResource);
        let err = build(&e, QueryOp::Select, &[("not_a_real_field".into(), json!(1))]).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedField { ref field, .. } if field == "not_a_real_field"));
    }

    #[test]
    fn empty_predicate_is_rejected() {
        let e = entity(EntityKind::ComputeResource);
        for op in [QueryOp::Select, QueryOp::Delete] {
            let err = build(&e, op, &[]).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidIdentifier { .. }));
        }
    }

    #[test]
    fn predicate_value_must_match_field_type() {
        let e = entity(EntityKind::ComputeResource);
        let err = build(&e, QueryOp::Select, &[("cpusPerNode".into(), json!("lots"))]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidIdentifier { .. }));
    }

    #[test]
    fn identifier_shape_is_checked() {
        let scalar = entity(EntityKind::ComputeResource);
        let composite = entity(EntityKind::DataMovementInterface);

        assert!(key_predicate(&scalar, &Identifier::scalar("host-1")).is_ok());
        assert!(matches!(
            key_predicate(&scalar, &Identifier::composite([("resourceID", "host-1")])),
            Err(CatalogError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            key_predicate(&composite, &Identifier::scalar("host-1")),
            Err(CatalogError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            key_predicate(&scalar, &Identifier::Scalar(Value::Null)),
            Err(CatalogError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn composite_identifier_needs_exactly_the_key_fields() {
        let e = entity(EntityKind::DataMovementInterface);
        let keys = e.key.fields();
        let full = Identifier::composite(keys.iter().map(|k| (*k, "x")));
        assert_eq!(key_predicate(&e, &full).unwrap().len(), keys.len());

        let partial = Identifier::composite([(keys[0], "x")]);
        assert!(matches!(key_predicate(&e, &partial), Err(CatalogError::InvalidIdentifier { .. })));

        let mut extra: Vec<(&str, &str)> = keys.iter().map(|k| (*k, "x")).collect();
        extra.push(("bogus", "y"));
        assert!(matches!(
            key_predicate(&e, &Identifier::composite(extra)),
            Err(CatalogError::UnsupportedField { .. })
        ));
    }

    #[test]
    fn update_splits_key_and_values() {
        let e = entity(EntityKind::ComputeResource);
        let mut row = RawEntity::new("compute_resource");
        row.columns.insert("resource_id".into(), json!("host-1"));
        row.columns.insert("host_name".into(), json!("h"));
        match update(&e, &row).unwrap() {
            Statement::Update { values, filter, .. } => {
                assert_eq!(filter.len(), 1);
                assert_eq!(filter[0].column, "resource_id");
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].column, "host_name");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn select_by_key_can_lock() {
        let e = entity(EntityKind::ComputeResource);
        let stmt = select_by_key(&e, &Identifier::scalar("host-1"), true).unwrap();
        assert!(matches!(stmt, Statement::Select { for_update: true, .. }));
    }
}
