//! Catalog validation: identifiers, keys and references.

use crate::config::CatalogConfig;
use crate::error::ConfigError;
use crate::kind::EntityKind;
use regex::Regex;
use std::collections::{HashMap, HashSet};

fn identifier_pattern() -> Result<Regex, ConfigError> {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| ConfigError::Validation(e.to_string()))
}

pub fn validate(config: &CatalogConfig) -> Result<(), ConfigError> {
    let ident = identifier_pattern()?;
    if config.entities.is_empty() {
        return Err(ConfigError::Validation("catalog defines no entities".into()));
    }
    if !ident.is_match(&config.schema) {
        return Err(ConfigError::Validation(format!("invalid schema name '{}'", config.schema)));
    }

    let mut kinds = HashSet::new();
    let mut tables = HashSet::new();
    let mut key_arity: HashMap<&str, usize> = HashMap::new();

    for e in &config.entities {
        let kind: EntityKind = e.kind.parse()?;
        if !kinds.insert(kind) {
            return Err(ConfigError::DuplicateKind(e.kind.clone()));
        }
        if !ident.is_match(&e.table) {
            return Err(ConfigError::Validation(format!("{}: invalid table name '{}'", e.kind, e.table)));
        }
        if !tables.insert(e.table.as_str()) {
            return Err(ConfigError::Validation(format!("{}: table '{}' already used", e.kind, e.table)));
        }
        key_arity.insert(e.kind.as_str(), e.key.len());

        let mut names = HashSet::new();
        let mut columns = HashSet::new();
        for f in &e.fields {
            if !names.insert(f.name.as_str()) {
                return Err(ConfigError::Validation(format!("{}: duplicate field '{}'", e.kind, f.name)));
            }
            let column = f.column.clone().unwrap_or_else(|| crate::case::to_snake_case(&f.name));
            if !ident.is_match(&column) {
                return Err(ConfigError::Validation(format!("{}: invalid column name '{}'", e.kind, column)));
            }
            if !columns.insert(column) {
                return Err(ConfigError::Validation(format!(
                    "{}: two fields map to the same column ({})",
                    e.kind, f.name
                )));
            }
        }

        if e.key.is_empty() {
            return Err(ConfigError::Validation(format!("{}: natural key is empty", e.kind)));
        }
        for k in &e.key {
            let field = e.fields.iter().find(|f| f.name == *k).ok_or_else(|| ConfigError::InvalidPrimaryKey {
                kind: e.kind.clone(),
                field: k.clone(),
            })?;
            if field.nullable || field.auto.is_some() {
                return Err(ConfigError::InvalidPrimaryKey {
                    kind: e.kind.clone(),
                    field: k.clone(),
                });
            }
        }
    }

    for e in &config.entities {
        for f in &e.fields {
            let Some(parent) = &f.references else { continue };
            let parent_kind: EntityKind = parent.parse()?;
            let arity = key_arity
                .get(parent_kind.as_str())
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "entity",
                    id: parent.clone(),
                })?;
            if *arity != 1 {
                return Err(ConfigError::Validation(format!(
                    "{}.{} references {} which has a composite key",
                    e.kind, f.name, parent
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EntityConfig, FieldConfig, FieldType};

    fn field(name: &str, nullable: bool) -> FieldConfig {
        FieldConfig {
            name: name.into(),
            column: None,
            type_: FieldType::Text,
            nullable,
            references: None,
            auto: None,
        }
    }

    fn config(entities: Vec<EntityConfig>) -> CatalogConfig {
        CatalogConfig {
            schema: "app_catalog".into(),
            entities,
        }
    }

    fn gateway_profile() -> EntityConfig {
        EntityConfig {
            kind: "GatewayProfile".into(),
            table: "gateway_profile".into(),
            key: vec!["gatewayID".into()],
            fields: vec![field("gatewayID", false), field("gatewayDesc", true)],
            comment: None,
        }
    }

    #[test]
    fn accepts_minimal_catalog() {
        validate(&config(vec![gateway_profile()])).unwrap();
    }

    #[test]
    fn rejects_duplicate_kind() {
        let mut second = gateway_profile();
        second.table = "gateway_profile_2".into();
        let err = validate(&config(vec![gateway_profile(), second])).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateKind(_)));
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut e = gateway_profile();
        e.kind = "Experiment".into();
        let err = validate(&config(vec![e])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKind(_)));
    }

    #[test]
    fn rejects_nullable_key_field() {
        let mut e = gateway_profile();
        e.fields[0].nullable = true;
        let err = validate(&config(vec![e])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrimaryKey { .. }));
    }

    #[test]
    fn rejects_key_field_not_in_fields() {
        let mut e = gateway_profile();
        e.key = vec!["gatewayName".into()];
        let err = validate(&config(vec![e])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrimaryKey { ref field, .. } if field == "gatewayName"));
    }

    #[test]
    fn rejects_reference_to_kind_outside_catalog() {
        let mut e = gateway_profile();
        let mut r = field("resourceId", true);
        r.references = Some("ComputeResource".into());
        e.fields.push(r);
        let err = validate(&config(vec![e])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { .. }));
    }

    #[test]
    fn rejects_bad_identifiers() {
        let mut e = gateway_profile();
        e.table = "gateway profile; drop".into();
        assert!(validate(&config(vec![e])).is_err());

        let mut e = gateway_profile();
        e.fields[1].column = Some("desc\"".into());
        assert!(validate(&config(vec![e])).is_err());
    }
}
